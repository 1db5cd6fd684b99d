//! Configuration types.

use serde::{Deserialize, Serialize};

/// AI provider kind.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    Claude,
}

/// Configuration for the gateway client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Provider to use (gemini or claude).
    #[serde(default)]
    pub provider: ProviderKind,
    /// Model to generate with.
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Base URL for the API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable name for the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// Configuration for the HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Whether to enable permissive CORS.
    #[serde(default = "default_true")]
    pub cors_permissive: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_permissive: true,
        }
    }
}

/// Configuration for triage behavior and session lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    /// Lowercase answer text before embedding it in the transcript.
    #[serde(default = "default_true")]
    pub normalize_answers: bool,
    /// Idle seconds before a session is pruned. Zero disables expiry.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// Maximum live sessions. Zero disables the bound.
    #[serde(default)]
    pub max_sessions: usize,
}

fn default_session_ttl_secs() -> u64 {
    // 30 minutes of inactivity
    1800
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            normalize_answers: true,
            session_ttl_secs: default_session_ttl_secs(),
            max_sessions: 0,
        }
    }
}

/// Top-level service settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub ai: AiConfig,
    pub server: ServerConfig,
    pub triage: TriageConfig,
}
