//! Plain-text error responses.

use crate::server::context::RequestContext;
use crate::server::error::Error;
use crate::server::status::StatusCode;

impl RequestContext {
    /// Reply with `status` and `message` as a plain-text body.
    ///
    /// Clears any `Content-Length` set earlier, since the body is replaced.
    pub async fn error_response(&mut self, status: StatusCode, message: &str) -> Result<(), Error> {
        let writer = self.writer_mut();
        writer.remove_header("Content-Length");
        writer.set_header("Content-Type", "text/plain; charset=utf-8");
        writer.set_header("X-Content-Type-Options", "nosniff");
        self.response_builder()
            .with_status(status)
            .with_body(format!("{message}\n"))
            .send()
            .await
    }

    pub async fn bad_request(&mut self) -> Result<(), Error> {
        self.status_response(StatusCode::BadRequest).await
    }

    pub async fn unauthorized(&mut self) -> Result<(), Error> {
        self.status_response(StatusCode::Unauthorized).await
    }

    pub async fn forbidden(&mut self) -> Result<(), Error> {
        self.status_response(StatusCode::Forbidden).await
    }

    pub async fn not_found(&mut self) -> Result<(), Error> {
        self.status_response(StatusCode::NotFound).await
    }

    pub async fn method_not_allowed(&mut self) -> Result<(), Error> {
        self.status_response(StatusCode::MethodNotAllowed).await
    }

    pub async fn conflict(&mut self) -> Result<(), Error> {
        self.status_response(StatusCode::Conflict).await
    }

    pub async fn gone(&mut self) -> Result<(), Error> {
        self.status_response(StatusCode::Gone).await
    }

    pub async fn too_many_requests(&mut self) -> Result<(), Error> {
        self.status_response(StatusCode::TooManyRequests).await
    }

    pub async fn internal_server_error(&mut self) -> Result<(), Error> {
        self.status_response(StatusCode::InternalServerError).await
    }

    pub async fn not_implemented(&mut self) -> Result<(), Error> {
        self.status_response(StatusCode::NotImplemented).await
    }

    pub async fn service_unavailable(&mut self) -> Result<(), Error> {
        self.status_response(StatusCode::ServiceUnavailable).await
    }

    pub async fn gateway_timeout(&mut self) -> Result<(), Error> {
        self.status_response(StatusCode::GatewayTimeout).await
    }

    pub async fn insufficient_storage(&mut self) -> Result<(), Error> {
        self.status_response(StatusCode::InsufficientStorage).await
    }

    pub async fn loop_detected(&mut self) -> Result<(), Error> {
        self.status_response(StatusCode::LoopDetected).await
    }

    pub async fn not_extended(&mut self) -> Result<(), Error> {
        self.status_response(StatusCode::NotExtended).await
    }

    async fn status_response(&mut self, status: StatusCode) -> Result<(), Error> {
        self.error_response(status, status.reason_phrase()).await
    }
}
