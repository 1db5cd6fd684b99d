//! Mapping from triage errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::triage::TriageError;

use super::api::ErrorResponse;

/// HTTP-facing error wrapper.
#[derive(Debug)]
pub struct ApiError(pub TriageError);

impl ApiError {
    /// Status code this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TriageError::EmptyQuery | TriageError::EmptyAnswer => StatusCode::BAD_REQUEST,
            TriageError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            TriageError::SessionFinished(_) => StatusCode::CONFLICT,
            TriageError::Gateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Gateway details stay in the logs, not on the wire.
        let message = match &self.0 {
            TriageError::Gateway(e) => {
                tracing::error!(error = %e, "Gateway failure");
                "upstream unavailable".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
