//! Google Gemini provider implementation for the sysiq-providers crate.
//!
//! Sends a single-turn `generateContent` request and reads the generated text
//! from `candidates[0].content.parts`. When JSON output is requested the
//! provider sets `responseMimeType` so the model is constrained to JSON.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sysiq_providers::{CompletionRequest, GeminiProvider, LLMProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sysiq_providers::ProviderError> {
//!     let provider = GeminiProvider::new(
//!         "your-api-key".to_string(),
//!         Some("gemini-2.0-flash".to_string()),
//!         Some(1024),
//!         None,
//!     )?;
//!
//!     let request = CompletionRequest::new("Reply with {\"ok\": true}")
//!         .with_temperature(0.0)
//!         .with_json_output(true);
//!
//!     let response = provider.complete(request).await?;
//!     println!("Response: {}", response.content);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::{CompletionRequest, LLMProvider, ProviderError, RawEnvelope};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

// ============================================================================
// Provider Struct
// ============================================================================

#[derive(Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    name: String,
}

impl GeminiProvider {
    pub fn new(
        api_key: String,
        model: Option<String>,
        max_tokens: Option<u32>,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ProviderError::ConnectFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: max_tokens.unwrap_or(2048),
            name: "gemini".to_string(),
        })
    }

    /// Point the provider at a different endpoint root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Replace the underlying HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn api_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Build a GeminiRequest from a CompletionRequest.
    fn build_request(&self, request: &CompletionRequest) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: Some(request.prompt.clone()),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: request.max_tokens.or(Some(self.max_tokens)),
                temperature: request.temperature,
                response_mime_type: if request.json_output {
                    Some("application/json".to_string())
                } else {
                    None
                },
            },
        }
    }
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

/// Gemini API request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

/// Only text parts matter here; other part kinds deserialize with `text: None`.
#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

/// Gemini API response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

/// Extract text content from Gemini response parts
fn extract_text_from_parts(parts: &[GeminiPart]) -> String {
    parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect::<Vec<_>>()
        .join("")
}

/// Walk `candidates[0].content.parts` and return the concatenated text.
fn text_from_envelope(body: &str) -> Result<String, ProviderError> {
    let response: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedEnvelope(format!("response is not JSON: {}", e)))?;

    let candidate = match response.candidates.as_ref().and_then(|c| c.first()) {
        Some(candidate) => candidate,
        None => {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!("no candidates (blocked: {})", r))
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(ProviderError::MalformedEnvelope(reason));
        }
    };

    let content = candidate.content.as_ref().ok_or_else(|| {
        ProviderError::MalformedEnvelope(format!(
            "candidate has no content (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        ))
    })?;

    if !content.parts.iter().any(|p| p.text.is_some()) {
        return Err(ProviderError::MalformedEnvelope(
            "candidate content has no text parts".to_string(),
        ));
    }

    Ok(extract_text_from_parts(&content.parts))
}

// ============================================================================
// LLMProvider Implementation
// ============================================================================

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn send(&self, request: CompletionRequest) -> Result<RawEnvelope, ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::EmptyCredential);
        }

        let gemini_request = self.build_request(&request);

        let url = self.api_url();
        debug!("Gemini request URL: {}", url);
        debug!(
            "Gemini request body: {}",
            serde_json::to_string_pretty(&gemini_request).unwrap_or_default()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error ({}): {}", status, error_text);
            return Err(ProviderError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await?;
        debug!("Gemini raw response: {}", body);

        Ok(RawEnvelope::new(body))
    }

    fn extract_text(&self, envelope: &RawEnvelope) -> Result<String, ProviderError> {
        text_from_envelope(&envelope.body)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
