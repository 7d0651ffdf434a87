use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

use crate::errors::ProviderError;
use crate::models::message::Message;
use crate::providers::base::{Provider, Usage};

/// A call the mock received
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: Option<String>,
    pub system: String,
    pub messages: Vec<Message>,
}

/// A mock provider that returns pre-configured responses for testing
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Result<Message, ProviderError>>>>,
    usage: Usage,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    /// Same as `new`, but individual turns may fail
    pub fn scripted(responses: Vec<Result<Message, ProviderError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            usage: Usage::default(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn default_model(&self) -> &str {
        "mock"
    }

    async fn complete(
        &self,
        model: Option<&str>,
        system: &str,
        messages: &[Message],
    ) -> Result<(Message, Usage), ProviderError> {
        self.calls.lock().unwrap().push(RecordedCall {
            model: model.map(str::to_string),
            system: system.to_string(),
            messages: messages.to_vec(),
        });

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Return empty response if no more pre-configured responses
            Ok((Message::assistant().with_text(""), self.usage.clone()))
        } else {
            responses
                .remove(0)
                .map(|message| (message, self.usage.clone()))
        }
    }
}
