//! Extraction of the terminal verdict from generated text.

use serde::{Deserialize, Serialize};

/// Opening delimiter the model wraps its verdict in.
pub const DECISION_OPEN: &str = "<DECISION>";

/// Closing delimiter.
pub const DECISION_CLOSE: &str = "</DECISION>";

/// Triage verdict for the described situation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Assessment {
    LikelyCase,
    WeakCase,
    NoCase,
}

/// Terminal structured verdict produced by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    /// Which of the three triage buckets the situation falls into.
    pub assessment: Assessment,
    /// Model-reported confidence, 0-100.
    pub confidence: f64,
    /// Short explanation of the verdict.
    pub reasoning: String,
    /// Suggested follow-up actions.
    pub next_steps: String,
}

/// Why a reply did not yield a decision.
///
/// Both reasons fall back to the same caller-visible behavior (the reply is
/// returned as a question), but they stay distinguishable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoDecisionReason {
    /// No well-ordered delimiter pair was found.
    MissingDelimiters,
    /// Delimiters were present but the payload did not parse as a decision.
    MalformedJson,
}

/// Outcome of scanning a reply for a verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Decision(Decision),
    None(NoDecisionReason),
}

impl Extraction {
    /// Convert to an `Option`, discarding the no-decision reason.
    #[must_use]
    pub fn into_decision(self) -> Option<Decision> {
        match self {
            Self::Decision(d) => Some(d),
            Self::None(_) => None,
        }
    }
}

/// Scan generated text for a delimited verdict.
///
/// Finds the first opening delimiter and the first closing delimiter after
/// it, trims the substring between, and parses it as a [`Decision`]. Parse
/// failure is not an error: the caller treats it exactly like a reply that
/// never contained delimiters.
#[must_use]
pub fn extract_decision(text: &str) -> Extraction {
    let Some(start) = text.find(DECISION_OPEN) else {
        return Extraction::None(NoDecisionReason::MissingDelimiters);
    };
    let payload_start = start + DECISION_OPEN.len();
    let Some(end) = text[payload_start..].find(DECISION_CLOSE) else {
        return Extraction::None(NoDecisionReason::MissingDelimiters);
    };

    let payload = text[payload_start..payload_start + end].trim();
    match serde_json::from_str::<Decision>(payload) {
        Ok(decision) => Extraction::Decision(decision),
        Err(_) => Extraction::None(NoDecisionReason::MalformedJson),
    }
}
