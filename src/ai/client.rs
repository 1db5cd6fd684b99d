//! Multi-provider client for the generative-text gateway.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::config::{AiConfig, ProviderKind};
use crate::triage::{Role, Turn};

/// Connection timeout for HTTP requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall request timeout for HTTP requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Build an HTTP client with proper timeout configuration.
fn build_http_client() -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("Failed to build HTTP client")
}

/// Determine if a request should be retried based on status code and attempt count.
fn should_retry(status_code: u16, attempt: u32) -> bool {
    if attempt >= MAX_RETRIES {
        return false;
    }
    // Retry on 5xx server errors
    (500..600).contains(&status_code)
}

/// Calculate exponential backoff duration for retry attempts.
fn calculate_backoff(attempt: u32) -> Duration {
    // Exponential backoff: 1s, 2s, 4s
    Duration::from_secs(1 << attempt)
}

/// Errors from gateway operations.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("API key not configured (env: {0})")]
    MissingApiKey(String),
    #[error("API request failed: {0}")]
    RequestFailed(String),
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("Gateway request timed out")]
    Timeout,
}

/// Trait for generative-text providers.
///
/// Implementations receive the full ordered transcript on every call and
/// return the raw generated text, question or verdict alike.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate the next assistant reply for the given transcript.
    async fn generate(&self, transcript: &[Turn]) -> Result<String, AiError>;
}

fn map_send_error(e: &reqwest::Error) -> AiError {
    if e.is_timeout() {
        AiError::Timeout
    } else {
        AiError::RequestFailed(e.to_string())
    }
}

/// Concatenate the content of all system-role turns.
fn system_text(transcript: &[Turn]) -> String {
    transcript
        .iter()
        .filter(|t| t.role == Role::System)
        .map(|t| t.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Gemini API provider.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    #[must_use]
    pub fn new(base_url: String, api_key: String, model: String, max_tokens: u32) -> Self {
        Self {
            client: build_http_client(),
            base_url,
            api_key,
            model,
            max_tokens,
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiProvider {
    async fn generate(&self, transcript: &[Turn]) -> Result<String, AiError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        // System turns go through systemInstruction; the rest become contents.
        let contents: Vec<serde_json::Value> = transcript
            .iter()
            .filter(|t| t.role != Role::System)
            .map(|t| {
                let role = match t.role {
                    Role::Assistant => "model",
                    _ => "user",
                };
                serde_json::json!({
                    "role": role,
                    "parts": [{ "text": t.content }]
                })
            })
            .collect();

        let body = serde_json::json!({
            "contents": contents,
            "systemInstruction": {
                "parts": [{ "text": system_text(transcript) }]
            },
            "generationConfig": {
                "maxOutputTokens": self.max_tokens
            }
        });

        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(|e| map_send_error(&e))?;

            let status = response.status();
            if status.is_success() {
                let json: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| AiError::ParseError(e.to_string()))?;

                return json["candidates"][0]["content"]["parts"][0]["text"]
                    .as_str()
                    .map(String::from)
                    .ok_or_else(|| AiError::ParseError("No text in Gemini response".to_string()));
            }

            let status_code = status.as_u16();
            if should_retry(status_code, attempt) {
                let backoff = calculate_backoff(attempt);
                tokio::time::sleep(backoff).await;
                attempt += 1;
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            return Err(AiError::RequestFailed(format!("HTTP {status}: {text}")));
        }
    }
}

/// Claude API provider.
#[derive(Debug, Clone)]
pub struct ClaudeProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeProvider {
    /// Create a new Claude provider.
    #[must_use]
    pub fn new(base_url: String, api_key: String, model: String, max_tokens: u32) -> Self {
        Self {
            client: build_http_client(),
            base_url,
            api_key,
            model,
            max_tokens,
        }
    }
}

#[async_trait]
impl TextGenerator for ClaudeProvider {
    async fn generate(&self, transcript: &[Turn]) -> Result<String, AiError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));

        let messages: Vec<serde_json::Value> = transcript
            .iter()
            .filter(|t| t.role != Role::System)
            .map(|t| {
                let role = match t.role {
                    Role::Assistant => "assistant",
                    _ => "user",
                };
                serde_json::json!({ "role": role, "content": t.content })
            })
            .collect();

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system_text(transcript),
            "messages": messages,
        });

        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(|e| map_send_error(&e))?;

            let status = response.status();
            if status.is_success() {
                let json: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| AiError::ParseError(e.to_string()))?;

                return json["content"][0]["text"]
                    .as_str()
                    .map(String::from)
                    .ok_or_else(|| AiError::ParseError("No text in Claude response".to_string()));
            }

            let status_code = status.as_u16();
            if should_retry(status_code, attempt) {
                let backoff = calculate_backoff(attempt);
                tokio::time::sleep(backoff).await;
                attempt += 1;
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            return Err(AiError::RequestFailed(format!("HTTP {status}: {text}")));
        }
    }
}

/// Provider enum for dispatch.
#[derive(Debug, Clone)]
pub enum Provider {
    Gemini(GeminiProvider),
    Claude(ClaudeProvider),
}

#[async_trait]
impl TextGenerator for Provider {
    async fn generate(&self, transcript: &[Turn]) -> Result<String, AiError> {
        match self {
            Self::Gemini(p) => p.generate(transcript).await,
            Self::Claude(p) => p.generate(transcript).await,
        }
    }
}

/// Configured gateway client.
#[derive(Debug, Clone)]
pub struct AiClient {
    provider: Provider,
    config: AiConfig,
}

impl AiClient {
    /// Create client from configuration, reading the API key from the
    /// configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns `AiError::MissingApiKey` if the configured API key environment
    /// variable is not set.
    pub fn from_config(config: AiConfig) -> Result<Self, AiError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| AiError::MissingApiKey(config.api_key_env.clone()))?;

        let provider = match config.provider {
            ProviderKind::Gemini => Provider::Gemini(GeminiProvider::new(
                config.base_url.clone(),
                api_key,
                config.model.clone(),
                config.max_tokens,
            )),
            ProviderKind::Claude => Provider::Claude(ClaudeProvider::new(
                config.base_url.clone(),
                api_key,
                config.model.clone(),
                config.max_tokens,
            )),
        };

        Ok(Self { provider, config })
    }

    /// Get the configured model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Get the provider kind.
    #[must_use]
    pub fn provider_kind(&self) -> &ProviderKind {
        &self.config.provider
    }
}

#[async_trait]
impl TextGenerator for AiClient {
    async fn generate(&self, transcript: &[Turn]) -> Result<String, AiError> {
        self.provider.generate(transcript).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: Role, content: &str) -> Turn {
        Turn::new(role, content.to_string())
    }

    #[test]
    fn test_should_retry_logic() {
        // 5xx errors should be retried
        assert!(should_retry(500, 0));
        assert!(should_retry(502, 1));
        assert!(should_retry(503, 2));
        assert!(should_retry(504, 0));

        // 4xx errors should NOT be retried
        assert!(!should_retry(400, 0));
        assert!(!should_retry(404, 0));
        assert!(!should_retry(429, 0));

        // Max retries should stop retry
        assert!(!should_retry(500, MAX_RETRIES));
        assert!(!should_retry(503, MAX_RETRIES + 1));
    }

    #[test]
    fn test_calculate_backoff() {
        assert_eq!(calculate_backoff(0).as_secs(), 1);
        assert_eq!(calculate_backoff(1).as_secs(), 2);
        assert_eq!(calculate_backoff(2).as_secs(), 4);
    }

    #[test]
    fn test_system_text_collects_system_turns_only() {
        let transcript = vec![
            turn(Role::System, "be a triage agent"),
            turn(Role::User, "hello"),
            turn(Role::Assistant, "Did it happen recently?"),
        ];
        assert_eq!(system_text(&transcript), "be a triage agent");
    }

    #[test]
    fn test_gemini_provider_construction() {
        let provider = GeminiProvider::new(
            "https://api.example.com".to_string(),
            "test-key".to_string(),
            "gemini-test".to_string(),
            1024,
        );
        assert_eq!(provider.model, "gemini-test");
        assert_eq!(provider.max_tokens, 1024);
    }

    #[test]
    fn test_claude_provider_construction() {
        let provider = ClaudeProvider::new(
            "https://api.example.com".to_string(),
            "test-key".to_string(),
            "claude-test".to_string(),
            2048,
        );
        assert_eq!(provider.model, "claude-test");
        assert_eq!(provider.max_tokens, 2048);
    }

    #[test]
    fn test_from_config_missing_key() {
        let config = AiConfig {
            api_key_env: "LEGAL_TRIAGE_TEST_MISSING_KEY".to_string(),
            ..AiConfig::default()
        };
        let result = AiClient::from_config(config);
        assert!(matches!(result, Err(AiError::MissingApiKey(_))));
    }

    #[test]
    fn test_from_config_gemini() {
        std::env::set_var("LEGAL_TRIAGE_TEST_GEMINI_KEY", "test-key");
        let config = AiConfig {
            provider: ProviderKind::Gemini,
            model: "gemini-2.0-flash".to_string(),
            max_tokens: 1024,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: "LEGAL_TRIAGE_TEST_GEMINI_KEY".to_string(),
        };
        let client = AiClient::from_config(config).unwrap();
        assert!(matches!(client.provider, Provider::Gemini(_)));
        assert_eq!(client.model(), "gemini-2.0-flash");
        std::env::remove_var("LEGAL_TRIAGE_TEST_GEMINI_KEY");
    }

    #[test]
    fn test_from_config_claude() {
        std::env::set_var("LEGAL_TRIAGE_TEST_CLAUDE_KEY", "test-key");
        let config = AiConfig {
            provider: ProviderKind::Claude,
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 2048,
            base_url: "https://api.anthropic.com".to_string(),
            api_key_env: "LEGAL_TRIAGE_TEST_CLAUDE_KEY".to_string(),
        };
        let client = AiClient::from_config(config).unwrap();
        assert!(matches!(client.provider, Provider::Claude(_)));
        assert_eq!(client.provider_kind(), &ProviderKind::Claude);
        std::env::remove_var("LEGAL_TRIAGE_TEST_CLAUDE_KEY");
    }
}
