//! HTTP error mapping
//!
//! Bodies carry only the canonical reason phrase. The underlying message is
//! logged and never sent to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ethereal_core::EtherealError;

#[derive(Debug)]
pub struct ApiError(pub EtherealError);

impl From<EtherealError> for ApiError {
    fn from(err: EtherealError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "request failed: {}", self.0);
        } else {
            tracing::debug!(status = status.as_u16(), "request rejected: {}", self.0);
        }
        let reason = status.canonical_reason().unwrap_or("Error");
        (status, reason).into_response()
    }
}
