//! Relevance oracles
//!
//! The oracle seam is free text in, free text out: the scorer renders a
//! prompt, the oracle replies, and the scorer parses a decimal out of the
//! reply. `LlmOracle` is the production implementation; `PopularityOracle`
//! is a deterministic offline fallback so the service can run without a
//! key.

use crate::config::OracleSettings;
use crate::error::{EuterpeError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Anthropic Messages API endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Oracle trait: free-text scoring question in, free-text reply out
#[async_trait]
pub trait RelevanceOracle: Send + Sync {
    /// Ask the oracle to rate one candidate; the reply should contain a
    /// decimal in [0, 1]
    async fn score_text(&self, prompt: &str) -> Result<String>;

    /// Short implementation name for logs and health reporting
    fn name(&self) -> &str;
}

/// LLM-backed oracle over the Anthropic Messages API
pub struct LlmOracle {
    settings: OracleSettings,
    client: Client,
}

/// Anthropic API message format
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    text: String,
}

impl LlmOracle {
    /// Create a new oracle from settings
    pub fn new(settings: OracleSettings) -> Result<Self> {
        if settings.api_key.is_empty() {
            return Err(EuterpeError::Config(config::ConfigError::Message(
                "ANTHROPIC_API_KEY not set".to_string(),
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| EuterpeError::OracleUnavailable(e.to_string()))?;

        Ok(Self { settings, client })
    }
}

#[async_trait]
impl RelevanceOracle for LlmOracle {
    async fn score_text(&self, prompt: &str) -> Result<String> {
        debug!("Calling Anthropic API for relevance score");

        let request = AnthropicRequest {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| EuterpeError::OracleUnavailable(e.to_string()))?;

        let status = response.status();
        match status {
            s if s.is_success() => {
                let api_response: AnthropicResponse = response.json().await.map_err(|e| {
                    EuterpeError::OracleApi(format!("Failed to parse response: {}", e))
                })?;

                api_response
                    .content
                    .first()
                    .map(|c| c.text.clone())
                    .ok_or_else(|| EuterpeError::OracleApi("Empty response from API".to_string()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(EuterpeError::OracleApi(
                "Invalid or missing API key".to_string(),
            )),
            StatusCode::TOO_MANY_REQUESTS => Err(EuterpeError::OracleUnavailable(
                "Anthropic rate limit exceeded".to_string(),
            )),
            s if s.is_server_error() => {
                let body = response.text().await.unwrap_or_default();
                Err(EuterpeError::OracleUnavailable(format!(
                    "API error (status {}): {}",
                    status, body
                )))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(EuterpeError::OracleApi(format!(
                    "API request failed with status {}: {}",
                    status, body
                )))
            }
        }
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

/// Offline fallback oracle rating by normalized popularity
///
/// Reads the popularity line out of the prompt and replies with
/// `popularity / 100`, capped at 1. Deterministic and free, so demos and
/// benches work with no key configured.
#[derive(Default)]
pub struct PopularityOracle;

impl PopularityOracle {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RelevanceOracle for PopularityOracle {
    async fn score_text(&self, prompt: &str) -> Result<String> {
        let popularity = prompt
            .lines()
            .find_map(|line| line.trim().strip_prefix("- Popularity score:"))
            .and_then(|rest| rest.trim().parse::<f32>().ok())
            .unwrap_or(0.0);

        let score = (popularity / 100.0).clamp(0.0, 1.0);
        Ok(format!("{:.2}", score))
    }

    fn name(&self) -> &str {
        "popularity"
    }
}
