//! Mock LLM Provider for Testing
//!
//! Replays a scripted queue of replies and records every request it receives,
//! so pipeline tests can run end to end without a network.
//!
//! # Example
//!
//! ```rust,ignore
//! use sysiq_providers::mock::{MockProvider, MockReply};
//! use sysiq_providers::ProviderError;
//!
//! let provider = MockProvider::new()
//!     .with_text(r#"[{"package_name":"ncdu","command":"ncdu /"}]"#)
//!     .with_reply(MockReply::Error(ProviderError::HttpStatus(429)));
//! let handle = provider.clone(); // keep a handle to inspect requests later
//! ```

use crate::{CompletionRequest, LLMProvider, ProviderError, RawEnvelope};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Generated text returned as-is.
    Text(String),
    /// A transport or envelope failure.
    Error(ProviderError),
}

/// A mock LLM provider for testing
///
/// Replies are returned in FIFO order. Clones share the same queue and request
/// log, so a test can hand one clone to the pipeline and inspect the other.
#[derive(Clone)]
pub struct MockProvider {
    name: String,
    model: String,
    max_tokens: u32,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            model: "mock-model".to_string(),
            max_tokens: 1024,
            replies: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a reply to the queue
    pub fn with_reply(self, reply: MockReply) -> Self {
        self.lock_replies().push_back(reply);
        self
    }

    /// Add a text reply to the queue
    pub fn with_text(self, text: &str) -> Self {
        self.with_reply(MockReply::Text(text.to_string()))
    }

    /// Add an error reply to the queue
    pub fn with_error(self, error: ProviderError) -> Self {
        self.with_reply(MockReply::Error(error))
    }

    /// Get all requests that were made to this provider
    pub fn get_requests(&self) -> Vec<CompletionRequest> {
        self.lock_requests().clone()
    }

    /// Get the number of requests made
    pub fn request_count(&self) -> usize {
        self.lock_requests().len()
    }

    /// Number of scripted replies not yet consumed
    pub fn remaining_replies(&self) -> usize {
        self.lock_replies().len()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<MockReply>> {
        self.replies.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<CompletionRequest>> {
        self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LLMProvider for MockProvider {
    async fn send(&self, request: CompletionRequest) -> Result<RawEnvelope, ProviderError> {
        self.lock_requests().push(request);

        match self.lock_replies().pop_front() {
            Some(MockReply::Text(text)) => Ok(RawEnvelope::new(text)),
            Some(MockReply::Error(e)) => Err(e),
            None => Err(ProviderError::ConnectFailed(
                "mock provider has no scripted replies left".to_string(),
            )),
        }
    }

    fn extract_text(&self, envelope: &RawEnvelope) -> Result<String, ProviderError> {
        Ok(envelope.body.clone())
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
