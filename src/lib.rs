//! Legal Triage - conversational triage service driven by a generative AI backend.

pub mod ai;
pub mod config;
pub mod http;
pub mod triage;
