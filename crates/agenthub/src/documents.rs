//! Fetches remote attachments and turns them into text, image or error outcomes.
//!
//! One bad file never aborts a batch: every failure mode (fetch, status, size, format,
//! parser panic) resolves to `ParsedDocument::Error`.

pub mod parse;

use futures::future::join_all;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::models::document::{DocumentBatch, ParsedDocument};

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub fetch_timeout: Duration,
    pub max_bytes: usize,
    /// Hostname the documents are published under
    pub public_host: Option<String>,
    /// Hostname that reaches the same storage from inside our network
    pub internal_host: Option<String>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_bytes: DEFAULT_MAX_BYTES,
            public_host: None,
            internal_host: None,
        }
    }
}

pub struct DocumentIngestor {
    client: Client,
    settings: IngestSettings,
}

impl DocumentIngestor {
    pub fn new(settings: IngestSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.fetch_timeout).build()?;
        Ok(Self { client, settings })
    }

    /// Point public storage urls at the internal host; anything else is returned unchanged
    pub fn rewrite_host(&self, url: &Url) -> Url {
        let (Some(public), Some(internal)) =
            (&self.settings.public_host, &self.settings.internal_host)
        else {
            return url.clone();
        };
        let matches_public = url
            .host_str()
            .is_some_and(|host| host.eq_ignore_ascii_case(public));
        if public.eq_ignore_ascii_case(internal) || !matches_public {
            return url.clone();
        }

        let mut rewritten = url.clone();
        match rewritten.set_host(Some(internal)) {
            Ok(()) => rewritten,
            Err(err) => {
                warn!(host = %internal, error = %err, "invalid internal document host");
                url.clone()
            }
        }
    }

    /// Fetch and interpret one document
    pub async fn ingest(&self, url: &Url) -> ParsedDocument {
        let filename = parse::filename(url);

        let bytes = match self.fetch(&self.rewrite_host(url)).await {
            Ok(bytes) => bytes,
            Err(message) => return ParsedDocument::error(filename, message),
        };

        let kind = parse::classify(url);
        debug!(url = %url, ?kind, bytes = bytes.len(), "parsing document");

        let parse_filename = filename.clone();
        match tokio::task::spawn_blocking(move || parse::parse(&kind, &bytes, parse_filename)).await
        {
            Ok(parsed) => parsed,
            Err(err) => ParsedDocument::error(filename, format!("Parser crashed: {}", err)),
        }
    }

    /// Ingest every distinct url concurrently. Output lists follow input order.
    pub async fn ingest_all(&self, urls: &[Url]) -> DocumentBatch {
        let mut seen = HashSet::new();
        let unique: Vec<&Url> = urls
            .iter()
            .filter(|url| seen.insert(url.as_str().to_string()))
            .collect();

        let parsed = join_all(unique.iter().map(|url| self.ingest(url))).await;

        DocumentBatch::collect(unique.into_iter().zip(parsed).map(|(url, document)| {
            if let ParsedDocument::Error { message, .. } = &document {
                warn!(url = %url, error = %message, "document could not be used");
            }
            let label = document
                .filename()
                .map(str::to_string)
                .unwrap_or_else(|| url.to_string());
            (label, document)
        }))
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, String> {
        let timeout_secs = self.settings.fetch_timeout.as_secs();
        let describe = |err: reqwest::Error| {
            if err.is_timeout() {
                format!("Timed out after {}s while downloading", timeout_secs)
            } else {
                format!("Could not download: {}", err)
            }
        };

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(describe)?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let limit = self.settings.max_bytes;
        let too_large = || format!("File is larger than the {} byte limit", limit);
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(describe)? {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(server)
            .await;
    }

    fn ingestor(settings: IngestSettings) -> DocumentIngestor {
        DocumentIngestor::new(settings).unwrap()
    }

    fn url(server: &MockServer, route: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
    }

    #[tokio::test]
    async fn test_ingest_text_and_image() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/notes.txt",
            ResponseTemplate::new(200).set_body_string("meeting at noon"),
        )
        .await;
        serve(
            &server,
            "/chart.PNG",
            ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']),
        )
        .await;

        let ingestor = ingestor(IngestSettings::default());
        let batch = ingestor
            .ingest_all(&[url(&server, "/notes.txt"), url(&server, "/chart.PNG?v=1")])
            .await;

        assert_eq!(batch.texts, vec!["[File: notes.txt]\nmeeting at noon"]);
        assert_eq!(batch.images.len(), 1);
        assert_eq!(batch.images[0].mime_type, "image/png");
        assert_eq!(batch.images[0].base64, "iVBORw==");
        assert!(batch.errors.is_empty());
    }

    #[tokio::test]
    async fn test_every_url_gets_one_disposition() {
        let server = MockServer::start().await;
        serve(&server, "/a.md", ResponseTemplate::new(200).set_body_string("# A")).await;
        serve(&server, "/missing.pdf", ResponseTemplate::new(404)).await;
        serve(&server, "/tool.exe", ResponseTemplate::new(200).set_body_string("MZ")).await;
        serve(
            &server,
            "/broken.pdf",
            ResponseTemplate::new(200).set_body_string("definitely not a pdf"),
        )
        .await;

        let urls = vec![
            url(&server, "/a.md"),
            url(&server, "/missing.pdf"),
            url(&server, "/a.md"),
            url(&server, "/tool.exe"),
            url(&server, "/broken.pdf"),
        ];
        let batch = ingestor(IngestSettings::default()).ingest_all(&urls).await;

        assert_eq!(batch.len(), 4);
        assert_eq!(batch.texts, vec!["[File: a.md]\n# A"]);
        assert_eq!(batch.errors.len(), 3);
        assert_eq!(batch.errors[0], "missing.pdf: HTTP 404");
        assert_eq!(batch.errors[1], "tool.exe: Unsupported file type: .exe");
        assert!(batch.errors[2].starts_with("broken.pdf: "));
    }

    #[tokio::test]
    async fn test_size_guard() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/big.txt",
            ResponseTemplate::new(200).set_body_string("x".repeat(64)),
        )
        .await;

        let settings = IngestSettings {
            max_bytes: 32,
            ..Default::default()
        };
        let parsed = ingestor(settings).ingest(&url(&server, "/big.txt")).await;

        assert!(matches!(
            parsed,
            ParsedDocument::Error { ref message, .. } if message.contains("32 byte limit")
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_reported_as_timeout() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/slow.txt",
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_millis(500)),
        )
        .await;

        let settings = IngestSettings {
            fetch_timeout: Duration::from_millis(100),
            ..Default::default()
        };
        let parsed = ingestor(settings).ingest(&url(&server, "/slow.txt")).await;

        assert!(matches!(
            parsed,
            ParsedDocument::Error { ref message, .. } if message.starts_with("Timed out")
        ));
    }

    #[tokio::test]
    async fn test_connection_failure_is_not_a_timeout() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let dead = Url::parse(&format!("http://127.0.0.1:{}/gone.txt", port)).unwrap();

        let parsed = ingestor(IngestSettings::default()).ingest(&dead).await;
        assert!(matches!(
            parsed,
            ParsedDocument::Error { ref message, .. } if message.starts_with("Could not download")
        ));
    }

    #[tokio::test]
    async fn test_public_host_is_rewritten() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/bucket/readme.txt",
            ResponseTemplate::new(200).set_body_string("internal copy"),
        )
        .await;

        let settings = IngestSettings {
            public_host: Some("files.example.com".into()),
            internal_host: Some("127.0.0.1".into()),
            ..Default::default()
        };
        let ingestor = ingestor(settings);

        let port = server.address().port();
        let public = Url::parse(&format!(
            "http://files.example.com:{}/bucket/readme.txt",
            port
        ))
        .unwrap();
        assert_eq!(
            ingestor.rewrite_host(&public).as_str(),
            format!("http://127.0.0.1:{}/bucket/readme.txt", port)
        );

        let other = Url::parse("https://cdn.example.org/a.txt").unwrap();
        assert_eq!(ingestor.rewrite_host(&other), other);

        let parsed = ingestor.ingest(&public).await;
        assert_eq!(
            parsed,
            ParsedDocument::Text {
                content: "internal copy".into(),
                filename: Some("readme.txt".into())
            }
        );
    }
}
