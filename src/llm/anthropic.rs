//! Anthropic API client implementation
//!
//! Implements the ChatClient trait against the Anthropic messages API.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::LlmConfig;
use crate::error::{AlimgenError, Result};
use crate::llm::client::ChatClient;

/// Anthropic API base URL
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic client
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-haiku-latest".to_string(),
            temperature: 0.3,
            max_tokens: 2000,
            timeout: Duration::from_secs(60),
        }
    }
}

impl From<&LlmConfig> for AnthropicConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Cumulative token usage across all calls on this client.
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    fn add(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Anthropic API client
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    config: AnthropicConfig,
    usage: Mutex<Usage>,
}

impl AnthropicClient {
    /// Create a new client, reading ANTHROPIC_API_KEY from the environment
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| AlimgenError::UpstreamUnavailable("ANTHROPIC_API_KEY not set".to_string()))?;

        Ok(Self::with_api_key(api_key, config))
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(api_key: String, config: AnthropicConfig) -> Self {
        Self {
            client: Client::new(),
            api_key,
            config,
            usage: Mutex::new(Usage::default()),
        }
    }

    /// Build the request body for the messages API
    fn build_request(&self, system: &str, user: &str) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "messages": [{ "role": "user", "content": user }],
        });

        if !system.is_empty() {
            body["system"] = json!(system);
        }

        body
    }

    /// Extract concatenated text content and track usage
    fn parse_response(&self, body: Value) -> Result<String> {
        if let Some(u) = body.get("usage") {
            let usage = Usage {
                input_tokens: u["input_tokens"].as_u64().unwrap_or(0),
                output_tokens: u["output_tokens"].as_u64().unwrap_or(0),
            };
            self.usage.lock().expect("usage lock poisoned").add(&usage);
        }

        let mut content = String::new();
        if let Some(blocks) = body["content"].as_array() {
            for block in blocks {
                if block["type"].as_str() == Some("text") {
                    if let Some(text) = block["text"].as_str() {
                        if !content.is_empty() {
                            content.push('\n');
                        }
                        content.push_str(text);
                    }
                }
            }
        }

        if content.is_empty() {
            return Err(AlimgenError::Parse("response contained no text blocks".to_string()));
        }

        Ok(content)
    }

    async fn send_request(&self, body: Value) -> Result<Value> {
        let request = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send();

        let response = tokio::time::timeout(self.config.timeout, request)
            .await
            .map_err(|_| AlimgenError::UpstreamTimeout(format!("LLM call exceeded {:?}", self.config.timeout)))?
            .map_err(|e| AlimgenError::UpstreamUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(AlimgenError::UpstreamUnavailable(format!("API error {}: {}", status, detail)));
        }

        response
            .json()
            .await
            .map_err(|e| AlimgenError::Parse(format!("response body not JSON: {}", e)))
    }

    /// Cumulative token usage
    pub fn total_usage(&self) -> Usage {
        *self.usage.lock().expect("usage lock poisoned")
    }
}

#[async_trait]
impl ChatClient for AnthropicClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = self.build_request(system, user);
        let response = self.send_request(body).await?;
        self.parse_response(response)
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("model", &self.config.model)
            .field("max_tokens", &self.config.max_tokens)
            .finish()
    }
}
