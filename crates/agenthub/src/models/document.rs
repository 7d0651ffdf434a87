use serde::{Deserialize, Serialize};

/// The normalized outcome of fetching and interpreting one attached file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParsedDocument {
    Text {
        content: String,
        filename: Option<String>,
    },
    Image {
        base64: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
        filename: Option<String>,
    },
    Error {
        filename: Option<String>,
        message: String,
    },
}

impl ParsedDocument {
    pub fn error<S: Into<String>>(filename: Option<String>, message: S) -> Self {
        ParsedDocument::Error {
            filename,
            message: message.into(),
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match self {
            ParsedDocument::Text { filename, .. }
            | ParsedDocument::Image { filename, .. }
            | ParsedDocument::Error { filename, .. } => filename.as_deref(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ParsedDocument::Error { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub base64: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// Aggregated ingestion result; every input url lands in exactly one of the three lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentBatch {
    pub texts: Vec<String>,
    pub images: Vec<ImagePayload>,
    pub errors: Vec<String>,
}

impl DocumentBatch {
    /// Fold parsed documents into a batch, keeping input order. `label` names each input
    /// (filename, else url) for text headers and error entries.
    pub fn collect<I>(documents: I) -> Self
    where
        I: IntoIterator<Item = (String, ParsedDocument)>,
    {
        let mut batch = DocumentBatch::default();
        for (label, document) in documents {
            match document {
                ParsedDocument::Text { content, .. } => {
                    batch.texts.push(format!("[File: {}]\n{}", label, content));
                }
                ParsedDocument::Image {
                    base64, mime_type, ..
                } => batch.images.push(ImagePayload { base64, mime_type }),
                ParsedDocument::Error { message, .. } => {
                    batch.errors.push(format!("{}: {}", label, message));
                }
            }
        }
        batch
    }

    pub fn has_content(&self) -> bool {
        !self.texts.is_empty() || !self.images.is_empty()
    }

    pub fn len(&self) -> usize {
        self.texts.len() + self.images.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
