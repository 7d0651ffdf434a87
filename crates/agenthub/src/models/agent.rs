use serde::{Deserialize, Serialize};

/// A specialist agent the hub can route requests to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Unique, case-sensitive canonical identifier
    pub alias: String,
    pub name: String,
    #[serde(rename = "baseUrl", alias = "base_url")]
    pub base_url: String,
    #[serde(default)]
    pub description: String,
    /// Comma or semicolon separated keywords used by the keyword matcher
    #[serde(default, alias = "routingHint")]
    pub routing_hint: Option<String>,
    #[serde(default, alias = "supportedModels")]
    pub supported_models: Vec<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl AgentDescriptor {
    pub fn new<A, N, U>(alias: A, name: N, base_url: U) -> Self
    where
        A: Into<String>,
        N: Into<String>,
        U: Into<String>,
    {
        Self {
            alias: alias.into(),
            name: name.into(),
            base_url: base_url.into(),
            description: String::new(),
            routing_hint: None,
            supported_models: Vec::new(),
            icon: None,
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_routing_hint<S: Into<String>>(mut self, hint: S) -> Self {
        self.routing_hint = Some(hint.into());
        self
    }

    pub fn with_supported_models(mut self, models: Vec<String>) -> Self {
        self.supported_models = models;
        self
    }

    pub fn with_icon<S: Into<String>>(mut self, icon: S) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// The model this agent should be asked to use: its first supported model, else the caller's
    pub fn preferred_model<'a>(&'a self, requested: &'a str) -> &'a str {
        self.supported_models
            .first()
            .map(String::as_str)
            .unwrap_or(requested)
    }

    /// The routing hint, if it has any non-whitespace content
    pub fn hint(&self) -> Option<&str> {
        self.routing_hint
            .as_deref()
            .map(str::trim)
            .filter(|hint| !hint.is_empty())
    }

    /// Build the endpoint url for a path under this agent's base url
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Agent identity shown next to an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAttribution {
    pub alias: String,
    pub name: String,
    pub icon: Option<String>,
}

impl From<&AgentDescriptor> for AgentAttribution {
    fn from(agent: &AgentDescriptor) -> Self {
        Self {
            alias: agent.alias.clone(),
            name: agent.name.clone(),
            icon: agent.icon.clone(),
        }
    }
}
