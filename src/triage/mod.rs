//! Session state, decision extraction, and the triage conversation loop.

mod controller;
mod decision;
mod error;
mod session;

pub use controller::{Reply, TriageController, TriageOptions, TurnOutcome};
pub use decision::{extract_decision, Assessment, Decision, Extraction, NoDecisionReason};
pub use error::TriageError;
pub use session::{EvictionPolicy, Role, Session, SessionStore, Turn};
