use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::agent::AgentAttribution;

/// The single answer returned for a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub session_id: String,
    #[serde(flatten)]
    pub outcome: AskOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AskOutcome {
    Success {
        content_markdown: String,
        meta: ResponseMeta,
        attachments: Vec<Attachment>,
    },
    Error {
        error_message: String,
        error_step: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub model: String,
    pub response_time_ms: u64,
    pub tokens_used: u64,
    /// Agents that contributed to the answer; empty when the language model answered directly
    pub agents: Vec<AgentAttribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_latency_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

impl Attachment {
    pub fn pdf(url: &Url) -> Self {
        Self {
            kind: "pdf".to_string(),
            url: url.to_string(),
        }
    }
}

impl AskResponse {
    pub fn success<S: Into<String>>(
        session_id: S,
        content_markdown: String,
        meta: ResponseMeta,
        attachments: Vec<Attachment>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            outcome: AskOutcome::Success {
                content_markdown,
                meta,
                attachments,
            },
        }
    }

    pub fn error<S: Into<String>>(
        session_id: S,
        error_message: String,
        error_step: &str,
        error_code: Option<&str>,
        details: Option<Value>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            outcome: AskOutcome::Error {
                error_message,
                error_step: error_step.to_string(),
                error_code: error_code.map(str::to_string),
                details,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, AskOutcome::Success { .. })
    }

    pub fn content_markdown(&self) -> Option<&str> {
        match &self.outcome {
            AskOutcome::Success {
                content_markdown, ..
            } => Some(content_markdown),
            AskOutcome::Error { .. } => None,
        }
    }

    pub fn meta(&self) -> Option<&ResponseMeta> {
        match &self.outcome {
            AskOutcome::Success { meta, .. } => Some(meta),
            AskOutcome::Error { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_wire_shape() {
        let url = Url::parse("https://files.example.com/a.pdf").unwrap();
        let response = AskResponse::success(
            "s1",
            "hello".to_string(),
            ResponseMeta {
                model: "gpt-4o".into(),
                response_time_ms: 12,
                tokens_used: 30,
                agents: vec![],
                fastest_agent: None,
                agent_latency_ms: None,
            },
            vec![Attachment::pdf(&url)],
        );

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "session_id": "s1",
                "status": "success",
                "content_markdown": "hello",
                "meta": {"model": "gpt-4o", "response_time_ms": 12, "tokens_used": 30, "agents": []},
                "attachments": [{"type": "pdf", "url": "https://files.example.com/a.pdf"}]
            })
        );
    }

    #[test]
    fn test_error_wire_shape() {
        let response = AskResponse::error(
            "s1",
            "prompt is required".into(),
            "request",
            Some("MISSING_PROMPT"),
            None,
        );
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "session_id": "s1",
                "status": "error",
                "error_message": "prompt is required",
                "error_step": "request",
                "error_code": "MISSING_PROMPT"
            })
        );
        assert!(!response.is_success());
    }
}
