//! The triage conversation loop: one gateway round trip per operation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ai::{format_answer_turn, format_opening_turn, TextGenerator, TRIAGE_SYSTEM_PROMPT};

use super::decision::{extract_decision, Decision, Extraction};
use super::error::TriageError;
use super::session::{Role, SessionStore, Turn};

/// Outward result of one triage turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub reply: Reply,
}

/// Either a follow-up question or the terminal verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum Reply {
    Question(String),
    Result(Decision),
}

/// Behavior knobs for the controller.
#[derive(Debug, Clone, Copy)]
pub struct TriageOptions {
    /// Lowercase answer text before embedding it in the transcript. This is
    /// a content transformation, not validation; free-text answers pass
    /// through either way.
    pub normalize_answers: bool,
}

impl Default for TriageOptions {
    fn default() -> Self {
        Self {
            normalize_answers: true,
        }
    }
}

/// Orchestrates triage turns against the session store and the gateway.
pub struct TriageController {
    store: Arc<SessionStore>,
    gateway: Arc<dyn TextGenerator>,
    options: TriageOptions,
}

impl TriageController {
    /// Create a controller over the given store and gateway.
    pub fn new(
        store: Arc<SessionStore>,
        gateway: Arc<dyn TextGenerator>,
        options: TriageOptions,
    ) -> Self {
        Self {
            store,
            gateway,
            options,
        }
    }

    /// Access the underlying session store.
    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Start a new triage session from a situation description.
    ///
    /// # Errors
    ///
    /// Returns `EmptyQuery` for blank input and `Gateway` if the backend
    /// call fails; neither leaves a session behind.
    pub async fn start(&self, user_query: &str) -> Result<TurnOutcome, TriageError> {
        if user_query.trim().is_empty() {
            return Err(TriageError::EmptyQuery);
        }

        let opening = vec![
            Turn::new(Role::System, TRIAGE_SYSTEM_PROMPT.to_string()),
            Turn::new(Role::User, format_opening_turn(user_query)),
        ];

        // Generate the first reply before the session becomes visible, so a
        // gateway failure leaves no half-built session behind.
        let reply_text = match self.gateway.generate(&opening).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Gateway call failed during start");
                return Err(e.into());
            }
        };

        let (session_id, handle) = self.store.create();
        let mut session = handle.lock().await;
        for turn in opening {
            session.push(turn);
        }

        let outcome = finish_turn(&mut session, session_id, reply_text);
        tracing::info!(
            session_id = %session_id,
            finished = session.finished,
            "Started triage session"
        );
        Ok(outcome)
    }

    /// Submit an answer to an active session's pending question.
    ///
    /// The session is mutated only after the gateway call succeeds; a
    /// failed call leaves the transcript and finished flag untouched.
    ///
    /// # Errors
    ///
    /// Returns `EmptyAnswer` for blank input, `SessionNotFound` for an
    /// unknown identifier, `SessionFinished` once a verdict has been
    /// reached, and `Gateway` if the backend call fails.
    pub async fn answer(&self, session_id: Uuid, answer: &str) -> Result<TurnOutcome, TriageError> {
        if answer.trim().is_empty() {
            return Err(TriageError::EmptyAnswer);
        }

        let handle = self
            .store
            .get(session_id)
            .ok_or(TriageError::SessionNotFound(session_id))?;

        // Holding the session lock across the gateway call serializes
        // concurrent answers for the same session.
        let mut session = handle.lock().await;
        if session.finished {
            return Err(TriageError::SessionFinished(session_id));
        }

        let text = if self.options.normalize_answers {
            answer.to_lowercase()
        } else {
            answer.to_string()
        };
        let user_turn = Turn::new(Role::User, format_answer_turn(&text));

        let mut prompt = session.transcript.clone();
        prompt.push(user_turn.clone());

        let reply_text = match self.gateway.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Gateway call failed");
                return Err(e.into());
            }
        };

        session.push(user_turn);
        let outcome = finish_turn(&mut session, session_id, reply_text);
        tracing::debug!(
            session_id = %session_id,
            turns = session.transcript.len(),
            finished = session.finished,
            "Processed answer"
        );
        Ok(outcome)
    }
}

/// Append the assistant reply, run extraction, and update session state.
fn finish_turn(
    session: &mut super::session::Session,
    session_id: Uuid,
    reply_text: String,
) -> TurnOutcome {
    session.push(Turn::new(Role::Assistant, reply_text.clone()));

    match extract_decision(&reply_text) {
        Extraction::Decision(decision) => {
            session.mark_finished();
            TurnOutcome {
                session_id,
                reply: Reply::Result(decision),
            }
        }
        Extraction::None(reason) => {
            tracing::trace!(session_id = %session_id, ?reason, "No decision in reply");
            TurnOutcome {
                session_id,
                reply: Reply::Question(reply_text.trim().to_string()),
            }
        }
    }
}
