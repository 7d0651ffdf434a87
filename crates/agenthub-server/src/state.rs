use agenthub::{
    catalog::{CachedCatalog, CatalogProvider, HttpCatalog, StaticCatalog, SystemClock},
    dispatch::Dispatcher,
    documents::DocumentIngestor,
    orchestrator::Orchestrator,
    providers::factory,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::configuration::Settings;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Wire the orchestrator together from loaded settings
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let provider = match settings.provider {
            Some(provider) => {
                info!(provider = ?provider.provider_type(), "language model configured");
                Some(factory::get_provider(provider.into_config())?)
            }
            None => {
                warn!("no language model configured; /ask will fail until one is set");
                None
            }
        };

        let source: Arc<dyn CatalogProvider> = match &settings.catalog.registry_url {
            Some(url) => {
                info!(registry = %url, "reading agents from registry");
                Arc::new(HttpCatalog::new(url.as_str(), settings.dispatch.timeout())?)
            }
            None => {
                info!(agents = settings.catalog.agents.len(), "using configured agents");
                Arc::new(StaticCatalog::new(settings.catalog.agents.clone()))
            }
        };
        let catalog = CachedCatalog::new(source, settings.catalog.ttl(), Arc::new(SystemClock));

        let orchestrator = Orchestrator::new(
            provider,
            Arc::new(catalog),
            Dispatcher::new(settings.dispatch.timeout())?,
            DocumentIngestor::new(settings.documents.into_config())?,
            settings.orchestrator.into_config(),
        );

        Ok(Self::new(orchestrator))
    }
}
