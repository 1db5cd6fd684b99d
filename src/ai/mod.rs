//! Gateway to the generative-language backend.

mod client;
mod prompts;

pub use client::{AiClient, AiError, ClaudeProvider, GeminiProvider, Provider, TextGenerator};
pub use prompts::{format_answer_turn, format_opening_turn, TRIAGE_SYSTEM_PROMPT};
