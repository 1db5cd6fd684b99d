//! Prompt text for the triage conversation.

/// System prompt that turns the model into a yes/no triage agent.
///
/// The decision delimiters here are a behavioral contract with the model;
/// the service only detects whether a reply honored it.
pub const TRIAGE_SYSTEM_PROMPT: &str = r#"You are a legal triage assistant. Rules:
1) Ask ONLY single yes/no questions to gather facts.
2) If you have enough facts, STOP asking questions and respond with ONLY a JSON object wrapped in <DECISION>...</DECISION>:
{
  "assessment": "likely_case" | "weak_case" | "no_case",
  "confidence": <number 0-100>,
  "reasoning": "<short explanation>",
  "next_steps": "<advice, reminder not legal advice>"
}
3) Keep questions short and clear.
"#;

/// Format the opening user turn from the caller's situation description.
#[must_use]
pub fn format_opening_turn(user_query: &str) -> String {
    format!("User described: {user_query}. Ask the first yes/no question.")
}

/// Format a follow-up answer as a user turn.
#[must_use]
pub fn format_answer_turn(answer: &str) -> String {
    format!("Answer: {answer}")
}
