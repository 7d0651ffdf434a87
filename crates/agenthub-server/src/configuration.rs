use crate::error::{missing_field_key, to_env_var, ConfigError, ENV_PREFIX};
use agenthub::{
    documents::IngestSettings,
    fallback::FallbackSettings,
    history::DEFAULT_HISTORY_BUDGET,
    models::agent::AgentDescriptor,
    orchestrator::OrchestratorSettings,
    providers::{
        configs::{OllamaProviderConfig, OpenAiProviderConfig, ProviderConfig},
        factory::ProviderType,
        ollama,
    },
};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

/// Points at the TOML config file; `agenthub.toml` in the working directory otherwise
pub const CONFIG_PATH_VAR: &str = "AGENTHUB_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "agenthub.toml";

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let address = format!("{}:{}", self.host, self.port);
        address
            .parse()
            .map_err(|source| ConfigError::InvalidAddress { address, source })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    Ollama {
        #[serde(default = "default_ollama_host")]
        host: String,
        #[serde(default = "default_ollama_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
}

impl ProviderSettings {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderSettings::OpenAi { .. } => ProviderType::OpenAi,
            ProviderSettings::Ollama { .. } => ProviderType::Ollama,
        }
    }

    pub fn into_config(self) -> ProviderConfig {
        match self {
            ProviderSettings::OpenAi {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            }),
            ProviderSettings::Ollama {
                host,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::Ollama(OllamaProviderConfig {
                host,
                model,
                temperature,
                max_tokens,
            }),
        }
    }
}

/// Routing and fallback behaviour
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HubSettings {
    pub self_alias: Option<String>,
    pub routing_model: Option<String>,
    pub base_prompt: Option<String>,
    pub site_guidance: Option<String>,
    pub history_budget: usize,
    pub tools: Vec<String>,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            self_alias: None,
            routing_model: None,
            base_prompt: None,
            site_guidance: None,
            history_budget: DEFAULT_HISTORY_BUDGET,
            tools: Vec::new(),
        }
    }
}

impl HubSettings {
    pub fn into_config(self) -> OrchestratorSettings {
        OrchestratorSettings {
            self_alias: self.self_alias,
            routing_model: self.routing_model,
            history_budget: self.history_budget,
            fallback: FallbackSettings {
                base_prompt: self.base_prompt,
                site_guidance: self.site_guidance,
                tools: self.tools,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub timeout_secs: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: agenthub::dispatch::DEFAULT_DISPATCH_TIMEOUT_SECS,
        }
    }
}

impl DispatchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    pub fetch_timeout_secs: u64,
    pub max_bytes: usize,
    pub public_host: Option<String>,
    pub internal_host: Option<String>,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        let defaults = IngestSettings::default();
        Self {
            fetch_timeout_secs: defaults.fetch_timeout.as_secs(),
            max_bytes: defaults.max_bytes,
            public_host: None,
            internal_host: None,
        }
    }
}

impl DocumentSettings {
    pub fn into_config(self) -> IngestSettings {
        IngestSettings {
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            max_bytes: self.max_bytes,
            public_host: self.public_host,
            internal_host: self.internal_host,
        }
    }
}

/// Agents come from a registry when `registry_url` is set, from `agents` otherwise
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub registry_url: Option<String>,
    pub ttl_secs: u64,
    pub agents: Vec<AgentDescriptor>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            registry_url: None,
            ttl_secs: agenthub::catalog::DEFAULT_CATALOG_TTL.as_secs(),
            agents: Vec::new(),
        }
    }
}

impl CatalogSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    /// Without a provider the hub still serves its catalog but cannot answer
    #[serde(default)]
    pub provider: Option<ProviderSettings>,
    #[serde(default)]
    pub orchestrator: HubSettings,
    #[serde(default)]
    pub dispatch: DispatchSettings,
    #[serde(default)]
    pub documents: DocumentSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        // An explicitly named file must exist; the default one is optional
        let file = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => File::with_name(&path).required(true),
            Err(_) => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("orchestrator.tools"),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                if let Some(key) = missing_field_key(&err.to_string()) {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&key),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_openai_host() -> String {
    "https://api.openai.com".to_string()
}

fn default_ollama_host() -> String {
    ollama::OLLAMA_HOST.to_string()
}

fn default_ollama_model() -> String {
    ollama::OLLAMA_MODEL.to_string()
}
