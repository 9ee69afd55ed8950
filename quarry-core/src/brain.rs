//! Text-model gateway.
//!
//! Every model call in the pipeline goes through the `LlmProvider` trait:
//! one prompt in, one completion out, fallible. Stages never bind to a
//! concrete provider, so tests drive them with `MockLlmProvider`.

use crate::error::LlmError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A conversational text-completion endpoint.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a single prompt and return the completion text.
    async fn invoke(&self, prompt: &str) -> Result<String, LlmError>;

    /// Return the model name.
    fn model_name(&self) -> &str;
}

/// The two model configurations the pipeline uses.
///
/// `primary` is the capable, more expensive model; `lightweight` is the
/// cheap, fast model used for query rewriting and relevancy scoring.
#[derive(Clone)]
pub struct ModelGateway {
    pub primary: Arc<dyn LlmProvider>,
    pub lightweight: Arc<dyn LlmProvider>,
}

impl ModelGateway {
    pub fn new(primary: Arc<dyn LlmProvider>, lightweight: Arc<dyn LlmProvider>) -> Self {
        Self {
            primary,
            lightweight,
        }
    }

    /// Use the same provider for both roles.
    pub fn single(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            primary: provider.clone(),
            lightweight: provider,
        }
    }
}

/// A scripted outcome for `MockLlmProvider`.
#[derive(Debug, Clone)]
enum MockOutcome {
    Text(String),
    Fail(String),
}

impl MockOutcome {
    fn resolve(&self) -> Result<String, LlmError> {
        match self {
            MockOutcome::Text(text) => Ok(text.clone()),
            MockOutcome::Fail(message) => Err(LlmError::ApiRequest {
                message: message.clone(),
            }),
        }
    }
}

/// A mock LLM provider for testing and development.
///
/// Resolution order for each call: the first rule whose needle occurs in the
/// prompt, then the next queued outcome, then the default outcome.
pub struct MockLlmProvider {
    model: String,
    rules: Mutex<Vec<(String, MockOutcome)>>,
    queue: Mutex<VecDeque<MockOutcome>>,
    default: MockOutcome,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            rules: Mutex::new(Vec::new()),
            queue: Mutex::new(VecDeque::new()),
            default: MockOutcome::Text("I'm a mock LLM. No queued responses available.".into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a MockLlmProvider that always returns the given text.
    pub fn with_response(text: &str) -> Self {
        Self {
            default: MockOutcome::Text(text.to_string()),
            ..Self::new()
        }
    }

    /// Create a MockLlmProvider whose every call fails.
    pub fn failing(message: &str) -> Self {
        Self {
            default: MockOutcome::Fail(message.to_string()),
            ..Self::new()
        }
    }

    /// Queue a response to be returned by the next unmatched call.
    pub fn queue_response(&self, text: &str) {
        self.queue
            .lock()
            .unwrap()
            .push_back(MockOutcome::Text(text.to_string()));
    }

    /// Queue a failure for the next unmatched call.
    pub fn queue_failure(&self, message: &str) {
        self.queue
            .lock()
            .unwrap()
            .push_back(MockOutcome::Fail(message.to_string()));
    }

    /// Answer every prompt containing `needle` with `text`.
    pub fn respond_when(self, needle: &str, text: &str) -> Self {
        self.rules
            .lock()
            .unwrap()
            .push((needle.to_string(), MockOutcome::Text(text.to_string())));
        self
    }

    /// Fail every prompt containing `needle`.
    pub fn fail_when(self, needle: &str, message: &str) -> Self {
        self.rules
            .lock()
            .unwrap()
            .push((needle.to_string(), MockOutcome::Fail(message.to_string())));
        self
    }

    /// Number of prompts received so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Every prompt received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn invoke(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let matched = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, outcome)| outcome.clone());
        if let Some(outcome) = matched {
            return outcome.resolve();
        }

        let queued = self.queue.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| self.default.clone()).resolve()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_default_response() {
        let provider = MockLlmProvider::with_response("hello");
        assert_eq!(provider.invoke("anything").await.unwrap(), "hello");
        assert_eq!(provider.invoke("again").await.unwrap(), "hello");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_queue_order() {
        let provider = MockLlmProvider::new();
        provider.queue_response("first");
        provider.queue_failure("boom");
        provider.queue_response("second");

        assert_eq!(provider.invoke("a").await.unwrap(), "first");
        assert!(provider.invoke("b").await.is_err());
        assert_eq!(provider.invoke("c").await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_mock_rules_take_precedence() {
        let provider = MockLlmProvider::new()
            .respond_when("planning", "{\"plan\": true}")
            .fail_when("validator", "quota exceeded");
        provider.queue_response("queued");

        assert_eq!(
            provider.invoke("You are a planning expert").await.unwrap(),
            "{\"plan\": true}"
        );
        let err = provider.invoke("quality validator").await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert_eq!(provider.invoke("other").await.unwrap(), "queued");
        assert_eq!(provider.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let provider = MockLlmProvider::failing("offline");
        let err = provider.invoke("x").await.unwrap_err();
        assert!(matches!(err, LlmError::ApiRequest { .. }));
    }

    #[tokio::test]
    async fn test_gateway_single_shares_provider() {
        let provider = Arc::new(MockLlmProvider::with_response("ok"));
        let gateway = ModelGateway::single(provider.clone());
        gateway.primary.invoke("p").await.unwrap();
        gateway.lightweight.invoke("l").await.unwrap();
        assert_eq!(provider.call_count(), 2);
    }
}
