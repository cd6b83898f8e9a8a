//! LLM client for Spark — text completions over the Anthropic Messages API
//!
//! Provides an `LlmBackend` trait so the orchestrator can be exercised with a
//! canned backend in tests, and `AnthropicClient` as the production backend.
//! Calls are one-shot by default; `[llm] max_retries` opts into exponential
//! backoff.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

use crate::config::SparkConfig;

/// Anthropic API version header value
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

// ============================================================================
// LlmBackend trait
// ============================================================================

/// One completion request: a system prompt plus a single user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

/// Abstraction over LLM providers.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Run a completion and return the response text.
    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

/// LLM call errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("LLM returned no text")]
    EmptyResponse,

    #[error("Missing API key")]
    MissingApiKey,

    #[error("Unsupported LLM provider: {0}")]
    UnsupportedProvider(String),

    #[error("All {attempts} retry attempts failed")]
    RetryExhausted { attempts: usize },
}

// ============================================================================
// Config types
// ============================================================================

/// Anthropic client configuration
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_retries: usize,
    pub retry_delay_ms: u64,
}

impl AnthropicConfig {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        let api_key = api_key
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .unwrap_or_default();

        Self {
            api_key,
            model,
            timeout_seconds: 60,
            max_retries: 0,
            retry_delay_ms: 1000,
        }
    }
}

/// Create the configured backend from application config.
///
/// Reads `[llm] provider`; only `anthropic` is supported.
pub fn create_backend(config: &SparkConfig) -> Result<Box<dyn LlmBackend>, LlmError> {
    match config.llm.provider.as_str() {
        "anthropic" => {
            let mut client_config = AnthropicConfig::new(None, config.llm.model.clone());
            client_config.timeout_seconds = config.llm.timeout_seconds;
            client_config.max_retries = config.llm.max_retries;
            client_config.retry_delay_ms = config.llm.retry_delay_ms;
            Ok(Box::new(AnthropicClient::with_base_url(
                client_config,
                config.llm.api_base.clone(),
            )?))
        }
        other => Err(LlmError::UnsupportedProvider(other.to_string())),
    }
}

// ============================================================================
// Anthropic API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ============================================================================
// AnthropicClient
// ============================================================================

/// Anthropic client — calls the Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: Client,
    config: AnthropicConfig,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig) -> Result<Self, LlmError> {
        Self::with_base_url(config, "https://api.anthropic.com".to_string())
    }

    /// Create a client with a custom base URL (for testing / proxies)
    pub fn with_base_url(config: AnthropicConfig, base_url: String) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn complete_with_retry(&self, request: &LlmRequest) -> Result<String, LlmError> {
        if self.config.max_retries == 0 {
            return self.complete_once(request).await;
        }

        let retry_strategy = ExponentialBackoff::from_millis(self.config.retry_delay_ms)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.config.max_retries);

        let result = Retry::spawn(retry_strategy, || self.complete_once(request)).await;

        match result {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::error!(
                    attempts = self.config.max_retries,
                    error = %e,
                    "All LLM retry attempts failed"
                );
                Err(LlmError::RetryExhausted {
                    attempts: self.config.max_retries,
                })
            }
        }
    }

    async fn complete_once(&self, request: &LlmRequest) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);

        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: request.max_tokens,
            system: &request.system,
            messages: vec![Message {
                role: "user",
                content: &request.user,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Anthropic API error");

            return Err(LlmError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse = response.json().await?;

        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(text.to_string())
    }
}

#[async_trait]
impl LlmBackend for AnthropicClient {
    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        self.complete_with_retry(request).await
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_key: &str, max_retries: usize) -> AnthropicConfig {
        AnthropicConfig {
            api_key: api_key.to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            timeout_seconds: 5,
            max_retries,
            retry_delay_ms: 10,
        }
    }

    fn request() -> LlmRequest {
        LlmRequest {
            system: "You are Spark.".to_string(),
            user: "Challenge this.".to_string(),
            max_tokens: 600,
        }
    }

    fn text_response(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [{ "type": "text", "text": text }],
            "stop_reason": "end_turn"
        })
    }

    #[tokio::test]
    async fn test_complete_sends_messages_request_and_returns_text() {
        let mock_server = MockServer::start().await;
        let client = AnthropicClient::with_base_url(test_config("test-key", 0), mock_server.uri())
            .expect("Failed to create client");

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_json(serde_json::json!({
                "model": "claude-sonnet-4-20250514",
                "max_tokens": 600,
                "system": "You are Spark.",
                "messages": [{ "role": "user", "content": "Challenge this." }]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(text_response("What are you assuming?")),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client.complete(&request()).await;
        assert_eq!(result.unwrap(), "What are you assuming?");
    }

    #[tokio::test]
    async fn test_one_shot_surfaces_api_error() {
        let mock_server = MockServer::start().await;
        let client = AnthropicClient::with_base_url(test_config("test-key", 0), mock_server.uri())
            .unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(serde_json::json!({
                "type": "error",
                "error": { "type": "overloaded_error", "message": "Overloaded" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        match client.complete(&request()).await {
            Err(LlmError::Api { code, message }) => {
                assert_eq!(code, 529);
                assert_eq!(message, "Overloaded");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retries_when_configured_then_succeeds() {
        let mock_server = MockServer::start().await;
        let client = AnthropicClient::with_base_url(test_config("test-key", 2), mock_server.uri())
            .unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "type": "error",
                "error": { "type": "rate_limit_error", "message": "Slow down" }
            })))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("ok?")))
            .mount(&mock_server)
            .await;

        assert_eq!(client.complete(&request()).await.unwrap(), "ok?");
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let mock_server = MockServer::start().await;
        let client = AnthropicClient::with_base_url(test_config("test-key", 2), mock_server.uri())
            .unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        match client.complete(&request()).await {
            Err(LlmError::RetryExhausted { attempts }) => assert_eq!(attempts, 2),
            other => panic!("Expected RetryExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_content_is_an_error() {
        let mock_server = MockServer::start().await;
        let client = AnthropicClient::with_base_url(test_config("test-key", 0), mock_server.uri())
            .unwrap();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{ "type": "tool_use", "id": "x", "name": "y", "input": {} }]
            })))
            .mount(&mock_server)
            .await;

        assert!(matches!(
            client.complete(&request()).await,
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn test_missing_api_key() {
        match AnthropicClient::new(test_config("", 0)) {
            Err(LlmError::MissingApiKey) => {}
            other => panic!("Expected MissingApiKey, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unsupported_provider() {
        let config = SparkConfig::from_toml(
            r#"
            [service]
            log_level = "info"
            [database]
            url = "postgresql://localhost/spark"
            max_connections = 1
            [llm]
            provider = "carrier-pigeon"
            model = "coo"
            "#,
        )
        .unwrap();
        assert!(matches!(
            create_backend(&config),
            Err(LlmError::UnsupportedProvider(p)) if p == "carrier-pigeon"
        ));
    }
}
