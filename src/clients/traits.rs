use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One prompt sent to the generative-language service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Ask the provider for JSON-only output when it supports it natively
    #[serde(default)]
    pub json_output: bool,
}

impl ModelRequest {
    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            seed: None,
            temperature: None,
            top_p: None,
            json_output: true,
        }
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_sampling(mut self, temperature: Option<f32>, top_p: Option<f32>) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub text: String,
    pub model: String,
    pub latency_ms: u64,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("model call cancelled")]
    Cancelled,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("provider returned no content")]
    Empty,
    #[error("missing API key for {0}")]
    MissingApiKey(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ModelError::Transport(format!("request timed out: {}", err))
        } else {
            ModelError::Transport(err.to_string())
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError>;

    /// Provider/model label for logs and the info endpoint
    fn name(&self) -> String;
}
