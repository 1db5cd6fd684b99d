//! HTTP surface for the triage service.

mod api;
mod error;
mod handlers;
mod server;

pub use api::{AnswerRequest, ErrorResponse, HealthResponse, StartRequest};
pub use error::ApiError;
pub use handlers::AppState;
pub use server::{TriageServer, DEFAULT_PORT};
