use super::content::Content;
use super::role::Role;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
/// A message to or from an LLM
pub struct Message {
    pub role: Role,
    pub content: Vec<Content>,
    /// Always sent as a list of parts, even with a single text part
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub structured: bool,
}

impl Message {
    /// Create a new message with no content
    pub fn new(role: Role) -> Self {
        Message {
            role,
            content: Vec::new(),
            structured: false,
        }
    }

    /// Create a new user message
    pub fn user() -> Self {
        Message::new(Role::User)
    }

    /// Create a new assistant message
    pub fn assistant() -> Self {
        Message::new(Role::Assistant)
    }

    pub fn structured(mut self) -> Self {
        self.structured = true;
        self
    }

    /// Add any Content to the message
    pub fn with_content(mut self, content: Content) -> Self {
        self.content.push(content);
        self
    }

    /// Add text content to the message
    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_content(Content::text(text))
    }

    /// Add image content to the message
    pub fn with_image<S: Into<String>, T: Into<String>>(self, data: S, mime_type: T) -> Self {
        self.with_content(Content::image(data, mime_type))
    }

    /// Concatenated text of every text part
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(Content::as_text)
            .collect::<Vec<_>>()
            .join("")
    }

    /// True when the message is a single unstructured text part, which is sent as a plain string
    pub fn is_plain_text(&self) -> bool {
        !self.structured && matches!(self.content.as_slice(), [Content::Text(_)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_text() {
        let message = Message::user()
            .with_text("hello ")
            .with_image("abc", "image/png")
            .with_text("world");
        assert_eq!(message.role, Role::User);
        assert_eq!(message.content.len(), 3);
        assert_eq!(message.text(), "hello world");
        assert!(!message.is_plain_text());
        assert!(Message::assistant().with_text("hi").is_plain_text());
        assert!(!Message::user().structured().with_text("hi").is_plain_text());
    }
}
