//! Triage error types.

use uuid::Uuid;

use crate::ai::AiError;

/// Errors that can occur during triage operations.
#[derive(thiserror::Error, Debug)]
pub enum TriageError {
    /// Start was called without a situation description.
    #[error("userQuery required")]
    EmptyQuery,

    /// Answer was called without answer text.
    #[error("sessionId and answer required")]
    EmptyAnswer,

    /// No session with this identifier exists.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// The session already reached a verdict and accepts no further input.
    #[error("session already finished: {0}")]
    SessionFinished(Uuid),

    /// The generative backend failed.
    #[error("gateway error: {0}")]
    Gateway(#[from] AiError),
}
