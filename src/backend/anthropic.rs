//! Anthropic API backend implementation.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;

use super::GenerationBackend;
use crate::error::{Result, TrapwiseError};

/// Anthropic API base URL
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default model to use
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Default max tokens
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Configuration for the Anthropic backend
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(300),
        }
    }
}

/// Anthropic Messages API backend.
///
/// Sends one system + user prompt pair and expects a single JSON document
/// back in the text content, optionally wrapped in a code fence.
pub struct AnthropicBackend {
    client: Client,
    api_key: String,
    config: AnthropicConfig,
}

impl AnthropicBackend {
    /// Create a backend reading ANTHROPIC_API_KEY from the environment.
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| TrapwiseError::Backend("ANTHROPIC_API_KEY not set".to_string()))?;
        Self::with_api_key(api_key, config)
    }

    /// Create a backend with an explicit API key.
    pub fn with_api_key(api_key: String, config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TrapwiseError::Backend(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    fn build_request(&self, system_prompt: &str, user_prompt: &str) -> Value {
        json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "system": system_prompt,
            "messages": [{"role": "user", "content": user_prompt}],
        })
    }

    async fn send_request(&self, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| TrapwiseError::Backend(format!("request failed: {e}")))?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(TrapwiseError::Backend(format!(
                "rate limited, retry after {retry_after} seconds"
            )));
        }

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(TrapwiseError::Backend(format!(
                "API error {status}: {error_body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| TrapwiseError::Backend(format!("failed to parse response: {e}")))
    }

    /// Concatenate the text blocks of a messages response.
    fn extract_text(body: &Value) -> String {
        let mut text = String::new();
        if let Some(blocks) = body["content"].as_array() {
            for block in blocks {
                if block["type"].as_str() == Some("text")
                    && let Some(t) = block["text"].as_str()
                {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(t);
                }
            }
        }
        text
    }
}

#[async_trait]
impl GenerationBackend for AnthropicBackend {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<Value> {
        let body = self.build_request(system_prompt, user_prompt);
        let response = self.send_request(body).await?;
        let text = Self::extract_text(&response);
        extract_json(&text)
    }
}

/// Pull the JSON document out of model text, tolerating code fences and
/// prose around it.
pub(crate) fn extract_json(text: &str) -> Result<Value> {
    let start = text.find('{');
    let end = text.rfind('}');
    let (Some(start), Some(end)) = (start, end) else {
        return Err(TrapwiseError::Backend(
            "response contains no JSON object".to_string(),
        ));
    };
    if end < start {
        return Err(TrapwiseError::Backend(
            "response contains no JSON object".to_string(),
        ));
    }
    serde_json::from_str(&text[start..=end])
        .map_err(|e| TrapwiseError::Backend(format!("response is not valid JSON: {e}")))
}
