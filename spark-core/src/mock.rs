//! Canned LLM backend for deterministic tests and offline development.
//!
//! ```rust
//! use spark_core::mock::MockLlmBackend;
//!
//! let backend = MockLlmBackend::new().with_response("What are you assuming?");
//! assert_eq!(backend.calls().len(), 0);
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::llm::{LlmBackend, LlmError, LlmRequest};

/// Records every request and answers with a fixed response (or a fixed error).
#[derive(Clone)]
pub struct MockLlmBackend {
    response: String,
    failure: Option<(u16, String)>,
    calls: Arc<Mutex<Vec<LlmRequest>>>,
}

impl Default for MockLlmBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmBackend {
    pub fn new() -> Self {
        Self {
            response: "Mock spark. What would change if this were true?".to_string(),
            failure: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = response.into();
        self
    }

    /// Make every call fail with an API error.
    pub fn failing(mut self, code: u16, message: impl Into<String>) -> Self {
        self.failure = Some((code, message.into()));
        self
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<LlmRequest> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmBackend for MockLlmBackend {
    async fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }
        match &self.failure {
            Some((code, message)) => Err(LlmError::Api {
                code: *code,
                message: message.clone(),
            }),
            None => Ok(self.response.clone()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> LlmRequest {
        LlmRequest {
            system: "sys".to_string(),
            user: "user".to_string(),
            max_tokens: 10,
        }
    }

    #[tokio::test]
    async fn test_records_calls_and_returns_response() {
        let backend = MockLlmBackend::new().with_response("hi?");
        assert_eq!(backend.complete(&request()).await.unwrap(), "hi?");
        assert_eq!(backend.calls(), vec![request()]);
    }

    #[tokio::test]
    async fn test_clones_share_call_log() {
        let backend = MockLlmBackend::new();
        let clone = backend.clone();
        clone.complete(&request()).await.unwrap();
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_backend() {
        let backend = MockLlmBackend::new().failing(500, "down");
        assert!(matches!(
            backend.complete(&request()).await,
            Err(LlmError::Api { code: 500, .. })
        ));
    }
}
