//! HTTP error response handling for the API
//!
//! Converts domain errors into HTTP responses with the status from
//! [`ToHttpStatus`] and an [`ApiError`] JSON body.

use crate::error::{ApiError, Error, ErrorKind, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match self.kind() {
            ErrorKind::Internal => tracing::error!(error = %self, "request failed"),
            kind => tracing::info!(error = %self, ?kind, "request rejected"),
        }

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}
