//! LLM provider abstractions for sysiq.
//!
//! A provider turns a prompt into the provider's raw response envelope and,
//! separately, knows how to pull the generated text out of that envelope.
//! Keeping the two steps apart lets the rest of the pipeline stay ignorant of
//! any one vendor's wire format.

pub mod gemini;
pub mod mock;

pub use gemini::GeminiProvider;
pub use mock::{MockProvider, MockReply};

use thiserror::Error;

/// Failures raised while talking to a remote model.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// No API key was configured for the provider.
    #[error("no API credential configured")]
    EmptyCredential,

    /// The request never produced an HTTP response (DNS, refused, reset...).
    #[error("could not reach the model endpoint: {0}")]
    ConnectFailed(String),

    /// The client-side request timeout elapsed.
    #[error("request to the model endpoint timed out")]
    Timeout,

    /// The endpoint answered with a non-success status code.
    #[error("model endpoint returned HTTP {0}")]
    HttpStatus(u16),

    /// The response body did not contain generated text where expected.
    #[error("unexpected response envelope: {0}")]
    MalformedEnvelope(String),
}

impl ProviderError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::HttpStatus(code) => Some(*code),
            _ => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if let Some(status) = e.status() {
            ProviderError::HttpStatus(status.as_u16())
        } else {
            ProviderError::ConnectFailed(e.to_string())
        }
    }
}

/// A single-prompt completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Ask the provider to constrain its output to JSON when it can.
    pub json_output: bool,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
            json_output: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.json_output = enabled;
        self
    }
}

/// The provider's outer response body, exactly as received.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEnvelope {
    pub body: String,
}

impl RawEnvelope {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
}

/// Trait for LLM providers
#[async_trait::async_trait]
pub trait LLMProvider: Send + Sync {
    /// Send the prompt and return the raw envelope. No retries happen here.
    async fn send(&self, request: CompletionRequest) -> Result<RawEnvelope, ProviderError>;

    /// Pull the generated text out of a raw envelope.
    fn extract_text(&self, envelope: &RawEnvelope) -> Result<String, ProviderError>;

    /// Send the prompt and return just the generated text.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let envelope = self.send(request).await?;
        let content = self.extract_text(&envelope)?;
        Ok(CompletionResponse {
            content,
            model: self.model().to_string(),
        })
    }

    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the model name
    fn model(&self) -> &str;

    /// Get the configured max_tokens for this provider
    fn max_tokens(&self) -> u32;
}
