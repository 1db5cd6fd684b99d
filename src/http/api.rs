//! Wire types for the triage HTTP endpoints.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for POST /start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Free-text description of the situation.
    #[serde(default)]
    pub user_query: String,
}

/// Request body for POST /answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    /// Identifier returned by /start.
    pub session_id: Uuid,
    /// Free-text answer to the pending question.
    #[serde(default)]
    pub answer: String,
}

/// Error body returned by all endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    /// Create an error body.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Response for GET /health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Number of live sessions in the store.
    pub sessions: usize,
}
