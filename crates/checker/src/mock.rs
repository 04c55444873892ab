use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::provider::{InferenceError, InferenceProvider, InferenceRequest};

/// Canned inference backend for tests: answers with the first response whose
/// pattern appears in the prompt, or a fixed default.
pub struct MockProvider {
    responses: Vec<(String, String)>,
    default_response: String,
    call_count: AtomicUsize,
    should_fail: bool,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
            default_response: "No issues found.".to_string(),
            call_count: AtomicUsize::new(0),
            should_fail: false,
        }
    }

    pub fn failing() -> Self {
        let mut provider = Self::new();
        provider.should_fail = true;
        provider
    }

    pub fn with_response(mut self, pattern: &str, response: &str) -> Self {
        self.responses.push((pattern.to_string(), response.to_string()));
        self
    }

    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = response.to_string();
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceProvider for MockProvider {
    async fn generate(&self, request: InferenceRequest) -> Result<String, InferenceError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if self.should_fail {
            return Err(InferenceError::Transport(
                "Mock provider configured to fail".to_string(),
            ));
        }

        for (pattern, response) in &self.responses {
            if request.prompt.contains(pattern.as_str()) {
                return Ok(response.clone());
            }
        }

        Ok(self.default_response.clone())
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
