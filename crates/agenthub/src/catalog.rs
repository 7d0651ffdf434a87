//! Where agent descriptors come from, and a read-through cache in front of them.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::models::agent::AgentDescriptor;

pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(300);

#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Every agent currently registered with the hub
    async fn list(&self) -> Result<Vec<AgentDescriptor>>;
}

/// A fixed set of agents, usually from configuration
pub struct StaticCatalog {
    agents: Vec<AgentDescriptor>,
}

impl StaticCatalog {
    pub fn new(agents: Vec<AgentDescriptor>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl CatalogProvider for StaticCatalog {
    async fn list(&self) -> Result<Vec<AgentDescriptor>> {
        Ok(self.agents.clone())
    }
}

/// Reads descriptors from an agent registry over HTTP.
///
/// The registry answers with an array of descriptors or `{"agents": [...]}`. Descriptors that
/// do not list their models are completed from the agent's own `/metadata` endpoint.
pub struct HttpCatalog {
    client: Client,
    registry_url: String,
}

impl HttpCatalog {
    pub fn new<S: Into<String>>(registry_url: S, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            registry_url: registry_url.into(),
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{} returned HTTP {}", url, status.as_u16()));
        }
        Ok(response.json().await?)
    }

    async fn supported_models(&self, agent: &AgentDescriptor) -> Result<Vec<String>> {
        let metadata = self.get_json(&agent.endpoint("metadata")).await?;
        Ok(metadata
            .get("supported_models")
            .and_then(Value::as_array)
            .map(|models| {
                models
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn enrich(&self, mut agent: AgentDescriptor) -> AgentDescriptor {
        if !agent.supported_models.is_empty() {
            return agent;
        }
        match self.supported_models(&agent).await {
            Ok(models) => agent.supported_models = models,
            Err(err) => warn!(agent = %agent.alias, error = %err, "could not read agent metadata"),
        }
        agent
    }
}

#[async_trait]
impl CatalogProvider for HttpCatalog {
    async fn list(&self) -> Result<Vec<AgentDescriptor>> {
        let body = self
            .get_json(&self.registry_url)
            .await
            .context("agent registry is unavailable")?;

        let entries = match body {
            Value::Array(entries) => entries,
            Value::Object(mut object) => match object.remove("agents") {
                Some(Value::Array(entries)) => entries,
                _ => return Err(anyhow!("agent registry reply has no agents list")),
            },
            _ => return Err(anyhow!("agent registry reply is not a list")),
        };

        let agents: Vec<AgentDescriptor> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(agent) => Some(agent),
                Err(err) => {
                    warn!(error = %err, "skipping malformed agent descriptor");
                    None
                }
            })
            .collect();

        Ok(join_all(agents.into_iter().map(|agent| self.enrich(agent))).await)
    }
}

/// Source of the current time for cache expiry
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry {
    fetched_at: Instant,
    agents: Vec<AgentDescriptor>,
}

/// Read-through cache with a fixed time to live.
///
/// Concurrent refreshes are not coalesced; the last one to finish wins. A failed refresh
/// leaves the previous entry in place but is still reported to the caller.
pub struct CachedCatalog {
    inner: Arc<dyn CatalogProvider>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entry: RwLock<Option<CacheEntry>>,
}

impl CachedCatalog {
    pub fn new(inner: Arc<dyn CatalogProvider>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            ttl,
            clock,
            entry: RwLock::new(None),
        }
    }

    /// Fetch from the inner provider now, regardless of the cached entry's age
    pub async fn refresh(&self) -> Result<Vec<AgentDescriptor>> {
        let agents = self.inner.list().await?;
        debug!(agents = agents.len(), "agent catalog refreshed");

        *self.entry.write().await = Some(CacheEntry {
            fetched_at: self.clock.now(),
            agents: agents.clone(),
        });
        Ok(agents)
    }

    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }
}

#[async_trait]
impl CatalogProvider for CachedCatalog {
    async fn list(&self) -> Result<Vec<AgentDescriptor>> {
        {
            let entry = self.entry.read().await;
            if let Some(entry) = entry.as_ref() {
                if self.clock.now().saturating_duration_since(entry.fetched_at) < self.ttl {
                    return Ok(entry.agents.clone());
                }
            }
        }
        self.refresh().await
    }
}
