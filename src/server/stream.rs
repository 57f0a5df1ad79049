//! Channel-to-writer streaming under cancellation.

use log::debug;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::server::error::Error;
use crate::server::writer::ResponseWriter;

/// Why a stream stopped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Every sender was dropped and the channel is empty.
    Closed,
    /// The request's cancellation token fired.
    Cancelled,
}

enum Next {
    Chunk(Vec<u8>),
    End(StreamEnd),
}

/// Drains a channel of byte chunks into a [`ResponseWriter`].
///
/// Chunks are written and flushed one at a time, in receive order. Waiting
/// for the next chunk races against the cancellation token, and cancellation
/// wins when both are ready. A chunk that is already being written always
/// completes. The receiver is closed when draining ends and when the adapter
/// is dropped.
pub struct StreamAdapter {
    rx: Option<mpsc::Receiver<Vec<u8>>>,
    cancel: CancellationToken,
}

impl StreamAdapter {
    pub fn new(cancel: CancellationToken, rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { rx: Some(rx), cancel }
    }

    /// Write chunks until the channel closes, the token is cancelled or a
    /// write fails. Only the last case is an error.
    ///
    /// A drained adapter has no receiver left, so draining again returns
    /// [`StreamEnd::Closed`] without writing.
    pub async fn drain(&mut self, writer: &mut ResponseWriter) -> Result<StreamEnd, Error> {
        let outcome = self.pump(writer).await;
        self.close();
        outcome
    }

    async fn pump(&mut self, writer: &mut ResponseWriter) -> Result<StreamEnd, Error> {
        loop {
            match self.next().await {
                Next::Chunk(chunk) => {
                    writer.write(&chunk).await.map_err(Error::WriteError)?;
                    writer.flush().await.map_err(Error::WriteError)?;
                }
                Next::End(end) => {
                    if end == StreamEnd::Cancelled {
                        debug!("Stream stopped: context cancelled");
                    }
                    return Ok(end);
                }
            }
        }
    }

    async fn next(&mut self) -> Next {
        let Some(rx) = self.rx.as_mut() else {
            return Next::End(StreamEnd::Closed);
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Next::End(StreamEnd::Cancelled),
            chunk = rx.recv() => match chunk {
                Some(chunk) => Next::Chunk(chunk),
                None => Next::End(StreamEnd::Closed),
            },
        }
    }

    fn close(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            rx.close();
        }
    }
}

impl Drop for StreamAdapter {
    fn drop(&mut self) {
        self.close();
    }
}
