//! Deferred response bodies.

use std::future::Future;
use std::pin::Pin;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::server::error::Error;
use crate::server::stream::StreamAdapter;
use crate::server::writer::ResponseWriter;

/// Future returned by a deferred body producer.
pub type BodyFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>, Error>> + Send>>;

type SerializeFn = Box<dyn Fn() -> Result<Vec<u8>, serde_json::Error> + Send>;
type DeferredFn = Box<dyn FnMut() -> BodyFuture + Send>;

enum Producer {
    Binary(Vec<u8>),
    Text(String),
    Json(SerializeFn),
    Stream(StreamAdapter),
    Deferred(DeferredFn),
}

/// A response body that is not produced until the response is sent.
///
/// Nothing happens at construction; [`call`](ResponseDataFunc::call) does the
/// work and yields the bytes to write. The streaming variant writes its
/// chunks straight to the writer and always yields an empty buffer.
pub struct ResponseDataFunc {
    producer: Producer,
}

impl ResponseDataFunc {
    /// Always yields `data`.
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self { producer: Producer::Binary(data.into()) }
    }

    /// Always yields the UTF-8 bytes of `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self { producer: Producer::Text(text.into()) }
    }

    /// Serializes `value` as JSON on every call. A value that fails to
    /// serialize yields an error and no bytes.
    pub fn json<T>(value: T) -> Self
    where
        T: Serialize + Send + 'static,
    {
        Self { producer: Producer::Json(Box::new(move || serde_json::to_vec(&value))) }
    }

    /// Streams chunks from `rx` to the response writer until the channel
    /// closes or `cancel` fires. Cancellation is a normal end, not an error.
    pub fn stream(cancel: CancellationToken, rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { producer: Producer::Stream(StreamAdapter::new(cancel, rx)) }
    }

    /// Runs `producer` on every call.
    pub fn deferred<F, Fut>(mut producer: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<u8>, Error>> + Send + 'static,
    {
        Self { producer: Producer::Deferred(Box::new(move || -> BodyFuture { Box::pin(producer()) })) }
    }

    /// Produce the body.
    pub async fn call(&mut self, writer: &mut ResponseWriter) -> Result<Vec<u8>, Error> {
        match &mut self.producer {
            Producer::Binary(data) => Ok(data.clone()),
            Producer::Text(text) => Ok(text.clone().into_bytes()),
            Producer::Json(serialize) => Ok(serialize()?),
            Producer::Stream(adapter) => {
                adapter.drain(writer).await?;
                Ok(Vec::new())
            }
            Producer::Deferred(producer) => producer().await,
        }
    }
}

impl From<Vec<u8>> for ResponseDataFunc {
    fn from(data: Vec<u8>) -> Self {
        Self::binary(data)
    }
}

impl From<String> for ResponseDataFunc {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}
