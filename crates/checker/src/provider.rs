use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Inference service returned no response body")]
    EmptyBody,

    #[error("Inference request cancelled")]
    Cancelled,

    #[error("Invalid response from inference service: {0}")]
    InvalidResponse(String),
}

/// Sampling knobs forwarded to the inference service verbatim. Fields that
/// are `None` are omitted from the request body so the service applies its
/// own defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SamplingOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

impl SamplingOptions {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.top_k.is_none()
            && self.top_p.is_none()
            && self.repeat_penalty.is_none()
            && self.num_predict.is_none()
    }
}

/// One fully composed inference call. Immutable once handed to a provider.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub model: String,
    pub prompt: String,
    pub options: SamplingOptions,
    pub stream: bool,
}

impl InferenceRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            options: SamplingOptions::default(),
            stream: true,
        }
    }

    pub fn with_options(mut self, options: SamplingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// Backend abstraction over the inference service. The returned string is the
/// full concatenated model output with no structural guarantee.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn generate(&self, request: InferenceRequest) -> Result<String, InferenceError>;

    fn model_name(&self) -> &str;

    fn estimate_tokens(&self, text: &str) -> usize {
        text.len() / 4
    }
}
