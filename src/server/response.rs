//! Mapping from [`QuillError`] to HTTP responses.

use crate::error::QuillError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

impl IntoResponse for QuillError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(%status, error = %self, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
