use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use url::Url;

use super::role::Role;

/// A question sent to the hub
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    pub session_id: String,
    pub model_id: String,
    pub user: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<AskContext>,
}

/// Optional context attached to a request; unknown keys are kept so agents receive them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AskContext {
    /// Project url; any other value is kept but never read as a project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<ExtraData>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Turn>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtraData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub document: Vec<DocumentRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A document reference: either a bare url or an object carrying one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentRef {
    Url(String),
    Object { url: String },
    Other(Value),
}

impl DocumentRef {
    pub fn url(&self) -> Option<&str> {
        match self {
            DocumentRef::Url(url) | DocumentRef::Object { url } => Some(url.trim()),
            DocumentRef::Other(_) => None,
        }
    }
}

/// One prior turn of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(default)]
    pub role: Role,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub content: String,
}

/// Turns with null or non-string content deserialize as blank, so the clipper drops them
fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => text,
        _ => String::new(),
    })
}

impl Turn {
    pub fn new<S: Into<String>>(role: Role, content: S) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl AskRequest {
    pub fn new<S: Into<String>>(session_id: S, model_id: S, user: S, prompt: S) -> Self {
        Self {
            session_id: session_id.into(),
            model_id: model_id.into(),
            user: user.into(),
            prompt: prompt.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: AskContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn history(&self) -> &[Turn] {
        self.context
            .as_ref()
            .map(|context| context.history.as_slice())
            .unwrap_or_default()
    }

    /// Identifier of the project the request was made from, taken from the last path
    /// segment of the project url. Anything that is not an absolute url is ignored.
    pub fn project_id(&self) -> Option<String> {
        let project = self.context.as_ref()?.project.as_ref()?.as_str()?.trim();
        let url = Url::parse(project).ok()?;
        url.path_segments()?
            .filter(|segment| !segment.is_empty())
            .last()
            .map(|segment| {
                urlencoding::decode(segment)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| segment.to_string())
            })
    }

    /// Attached document urls: deduplicated, in order, syntactically valid only
    pub fn document_urls(&self) -> Vec<Url> {
        let refs = self
            .context
            .as_ref()
            .and_then(|context| context.extra_data.as_ref())
            .map(|extra| extra.document.as_slice())
            .unwrap_or_default();

        let mut seen = HashSet::new();
        refs.iter()
            .filter_map(DocumentRef::url)
            .filter_map(|raw| Url::parse(raw).ok())
            .filter(|url| seen.insert(url.as_str().to_string()))
            .collect()
    }

    /// Attached documents that are pdf files; these are linked from the answer as-is
    pub fn pdf_attachments(&self) -> Vec<Url> {
        self.document_urls()
            .into_iter()
            .filter(|url| url.path().to_ascii_lowercase().ends_with(".pdf"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request_with_context(context: Value) -> AskRequest {
        serde_json::from_value(json!({
            "session_id": "s1",
            "model_id": "gpt-4o",
            "user": "u1",
            "prompt": "hello",
            "context": context
        }))
        .unwrap()
    }

    #[test]
    fn test_document_urls_accepts_both_shapes_and_dedups() {
        let request = request_with_context(json!({
            "extra_data": {
                "document": [
                    "https://files.example.com/a.pdf",
                    {"url": "https://files.example.com/b.png"},
                    "https://files.example.com/a.pdf",
                    "not a url",
                    42
                ]
            }
        }));

        let urls: Vec<String> = request
            .document_urls()
            .iter()
            .map(|url| url.to_string())
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://files.example.com/a.pdf",
                "https://files.example.com/b.png"
            ]
        );
    }

    #[test]
    fn test_pdf_attachments() {
        let request = request_with_context(json!({
            "extra_data": {
                "document": [
                    "https://files.example.com/report.PDF?sig=1",
                    "https://files.example.com/notes.txt",
                    "https://files.example.com/report.PDF?sig=1"
                ]
            }
        }));

        let pdfs = request.pdf_attachments();
        assert_eq!(pdfs.len(), 1);
        assert_eq!(pdfs[0].as_str(), "https://files.example.com/report.PDF?sig=1");
    }

    #[test]
    fn test_project_id() {
        let request = request_with_context(json!({
            "project": "https://hub.example.com/projects/ai%20lab/"
        }));
        assert_eq!(request.project_id().as_deref(), Some("ai lab"));

        let request = request_with_context(json!({ "project": "projects/42" }));
        assert_eq!(request.project_id(), None);

        let request = AskRequest::new("s", "m", "u", "p");
        assert_eq!(request.project_id(), None);
    }

    #[test]
    fn test_non_string_project_is_ignored() {
        let request = request_with_context(json!({ "project": 42 }));
        assert_eq!(request.project_id(), None);

        let request = request_with_context(json!({ "project": {"id": 7} }));
        assert_eq!(request.project_id(), None);
    }

    #[test]
    fn test_malformed_turns_are_blank() {
        let request = request_with_context(json!({
            "history": [
                {"role": "user", "content": null},
                {"role": 3, "content": "numeric role"},
                {"role": "assistant", "content": {"text": "nested"}},
                {"content": "no role"}
            ]
        }));

        let history = request.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "");
        assert_eq!(history[1].role, Role::User);
        assert_eq!(history[1].content, "numeric role");
        assert_eq!(history[2].content, "");
        assert_eq!(history[3].role, Role::User);

        let clipped = crate::history::clip_history(history, 100);
        assert_eq!(clipped.len(), 2);
        assert_eq!(clipped[0].content, "numeric role");
    }

    #[test]
    fn test_unknown_context_keys_survive() {
        let request = request_with_context(json!({
            "project": "https://hub.example.com/projects/7",
            "locale": "vi",
            "history": [{"role": "robot", "content": "hi"}]
        }));

        let context = request.context.as_ref().unwrap();
        assert_eq!(context.extra.get("locale"), Some(&json!("vi")));
        assert_eq!(request.history()[0].role, Role::User);

        let round = serde_json::to_value(&request).unwrap();
        assert_eq!(round["context"]["locale"], json!("vi"));
    }
}
