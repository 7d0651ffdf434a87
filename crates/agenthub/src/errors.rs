use serde_json::{json, Value};
use thiserror::Error;

/// Failures talking to a language model
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("model endpoint returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("model endpoint did not respond within {0}s")]
    Timeout(u64),

    #[error("could not reach model endpoint: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed model response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// The upstream HTTP status, when the endpoint answered with one
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            ProviderError::Request(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

/// Per-agent failure reported when no selected agent could answer
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AgentFailure {
    pub alias: String,
    pub name: String,
    pub ok: bool,
    pub error: String,
}

const LLM_HINT: &str = "Common causes: the API key for the configured provider is missing or invalid, \
or a self-hosted endpoint (provider host) is unreachable or misconfigured.";

/// Request-level failures. Everything a single agent or a single document does wrong is a
/// value elsewhere; only whole-stage failures end up here.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HubError {
    #[error("{message}")]
    InvalidRequest { code: &'static str, message: String },

    #[error(
        "No language model is configured. Set AGENTHUB_PROVIDER__TYPE (openai or ollama) and its \
         credentials, or add a [provider] table to the agenthub config file."
    )]
    LlmNotConfigured,

    #[error("Could not load the agent catalog: {0}")]
    Catalog(String),

    #[error("Routing failed: {0}")]
    Routing(#[source] ProviderError),

    #[error("None of the selected agents answered: {}", summarize(.0))]
    AgentsUnavailable(Vec<AgentFailure>),

    #[error("Could not prepare the request: {0}")]
    Prepare(String),

    #[error("The language model call failed: {}. {}", .0, LLM_HINT)]
    Llm(#[source] ProviderError),
}

fn summarize(failures: &[AgentFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("{} ({}): {}", failure.name, failure.alias, failure.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl HubError {
    pub fn invalid<S: Into<String>>(code: &'static str, message: S) -> Self {
        HubError::InvalidRequest {
            code,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            HubError::InvalidRequest { .. } => 400,
            HubError::AgentsUnavailable(_) => 502,
            HubError::Routing(err) | HubError::Llm(err) => err
                .status()
                .filter(|status| (400..600).contains(status))
                .unwrap_or(500),
            HubError::LlmNotConfigured | HubError::Catalog(_) | HubError::Prepare(_) => 500,
        }
    }

    /// Coarse stage tag so callers can tell bad input from misconfiguration from an outage
    pub fn error_step(&self) -> &'static str {
        match self {
            HubError::InvalidRequest { .. } => "request",
            HubError::LlmNotConfigured => "central_llm_config",
            HubError::Catalog(_) | HubError::Routing(_) => "central_routing",
            HubError::AgentsUnavailable(_) => "agent",
            HubError::Prepare(_) => "central_prepare",
            HubError::Llm(_) => "central_llm",
        }
    }

    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            HubError::InvalidRequest { code, .. } => Some(code),
            HubError::LlmNotConfigured => Some("LLM_NOT_CONFIGURED"),
            HubError::AgentsUnavailable(_) => Some("AGENTS_UNAVAILABLE"),
            _ => None,
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            HubError::AgentsUnavailable(failures) => Some(json!(failures)),
            _ => None,
        }
    }
}

pub type HubResult<T> = Result<T, HubError>;
