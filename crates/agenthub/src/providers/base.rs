use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::models::message::Message;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }

    /// Total tokens as reported, falling back to zero when the endpoint reports nothing
    pub fn total(&self) -> u64 {
        self.total_tokens
            .or_else(|| match (self.input_tokens, self.output_tokens) {
                (Some(input), Some(output)) => Some(input + output),
                _ => None,
            })
            .map(|total| total.max(0) as u64)
            .unwrap_or(0)
    }
}

/// Base trait for chat-completion providers (OpenAI-compatible endpoints, Ollama)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Model used when the caller does not name one
    fn default_model(&self) -> &str;

    /// Generate the next message. `model` overrides the configured model for this call only.
    async fn complete(
        &self,
        model: Option<&str>,
        system: &str,
        messages: &[Message],
    ) -> Result<(Message, Usage), ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_usage_creation() {
        let usage = Usage::new(Some(10), Some(20), Some(30));
        assert_eq!(usage.input_tokens, Some(10));
        assert_eq!(usage.output_tokens, Some(20));
        assert_eq!(usage.total_tokens, Some(30));
        assert_eq!(usage.total(), 30);
    }

    #[test]
    fn test_usage_total_fallbacks() {
        assert_eq!(Usage::new(Some(7), Some(5), None).total(), 12);
        assert_eq!(Usage::new(Some(7), None, None).total(), 0);
        assert_eq!(Usage::default().total(), 0);
    }

    #[test]
    fn test_usage_serialization() -> anyhow::Result<()> {
        let usage = Usage::new(Some(10), Some(20), Some(30));
        let serialized = serde_json::to_string(&usage)?;
        let deserialized: Usage = serde_json::from_str(&serialized)?;
        assert_eq!(usage, deserialized);

        let json_value: serde_json::Value = serde_json::from_str(&serialized)?;
        assert_eq!(json_value["input_tokens"], json!(10));
        assert_eq!(json_value["output_tokens"], json!(20));
        assert_eq!(json_value["total_tokens"], json!(30));

        Ok(())
    }
}
