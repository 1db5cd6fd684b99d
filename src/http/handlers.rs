//! HTTP handlers for the triage API.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::triage::{TriageController, TurnOutcome};

use super::api::{AnswerRequest, HealthResponse, StartRequest};
use super::error::ApiError;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Controller driving the conversation loop.
    pub controller: Arc<TriageController>,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(controller: Arc<TriageController>) -> Self {
        Self { controller }
    }
}

/// POST /start - Open a triage session from a situation description.
pub async fn post_start(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
    let outcome = state.controller.start(&request.user_query).await?;
    Ok(Json(outcome))
}

/// POST /answer - Submit an answer to the session's pending question.
pub async fn post_answer(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<TurnOutcome>, ApiError> {
    let outcome = state
        .controller
        .answer(request.session_id, &request.answer)
        .await?;
    Ok(Json(outcome))
}

/// GET /health - Liveness probe with a session count.
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: state.controller.store().len(),
    })
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use crate::ai::{AiError, TextGenerator};
    use crate::triage::{EvictionPolicy, Reply, SessionStore, TriageOptions, Turn};

    use super::*;

    struct FixedGateway(String);

    #[async_trait]
    impl TextGenerator for FixedGateway {
        async fn generate(&self, _transcript: &[Turn]) -> Result<String, AiError> {
            Ok(self.0.clone())
        }
    }

    fn state(reply: &str) -> AppState {
        let controller = TriageController::new(
            Arc::new(SessionStore::new(EvictionPolicy::default())),
            Arc::new(FixedGateway(reply.to_string())),
            TriageOptions::default(),
        );
        AppState::new(Arc::new(controller))
    }

    #[tokio::test]
    async fn test_post_start_returns_question() {
        let state = state("Did you sign a lease?");
        let result = post_start(
            State(state),
            Json(StartRequest {
                user_query: "deposit dispute".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(
            result.0.reply,
            Reply::Question("Did you sign a lease?".to_string())
        );
    }

    #[tokio::test]
    async fn test_post_start_rejects_empty_query() {
        let state = state("unused");
        let result = post_start(
            State(state),
            Json(StartRequest {
                user_query: String::new(),
            }),
        )
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_answer_unknown_session() {
        let state = state("unused");
        let result = post_answer(
            State(state),
            Json(AnswerRequest {
                session_id: uuid::Uuid::new_v4(),
                answer: "yes".to_string(),
            }),
        )
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_health_counts_sessions() {
        let app = state("A question?");
        let response = get_health(State(app.clone())).await;
        assert_eq!(response.0.sessions, 0);
        assert_eq!(response.0.status, "ok");

        app.controller.start("a situation").await.unwrap();
        let response = get_health(State(app)).await;
        assert_eq!(response.0.sessions, 1);
    }
}
