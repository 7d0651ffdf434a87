use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::catalog::CatalogProvider;
use crate::dispatch::Dispatcher;
use crate::documents::DocumentIngestor;
use crate::errors::{HubError, HubResult};
use crate::fallback::{FallbackResponder, FallbackSettings};
use crate::history::{clip_history, DEFAULT_HISTORY_BUDGET};
use crate::models::agent::AgentDescriptor;
use crate::models::request::AskRequest;
use crate::models::response::{AskResponse, Attachment, ResponseMeta};
use crate::providers::base::Provider;
use crate::routing::{merge_selection, Classifier};
use crate::synthesis::synthesize;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// The hub's own alias in the catalog; never routed to
    pub self_alias: Option<String>,
    /// Model used for routing calls instead of the provider default
    pub routing_model: Option<String>,
    pub history_budget: usize,
    pub fallback: FallbackSettings,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            self_alias: None,
            routing_model: None,
            history_budget: DEFAULT_HISTORY_BUDGET,
            fallback: FallbackSettings::default(),
        }
    }
}

/// The model-backed stages; absent when no provider is configured
struct LanguageModel {
    classifier: Classifier,
    responder: FallbackResponder,
}

/// Decides who answers a request and assembles the single response
pub struct Orchestrator {
    llm: Option<LanguageModel>,
    catalog: Arc<dyn CatalogProvider>,
    dispatcher: Dispatcher,
    ingestor: DocumentIngestor,
    self_alias: Option<String>,
    history_budget: usize,
}

impl Orchestrator {
    pub fn new(
        provider: Option<Arc<dyn Provider>>,
        catalog: Arc<dyn CatalogProvider>,
        dispatcher: Dispatcher,
        ingestor: DocumentIngestor,
        settings: OrchestratorSettings,
    ) -> Self {
        let llm = provider.map(|provider| LanguageModel {
            classifier: Classifier::new(provider.clone(), settings.routing_model),
            responder: FallbackResponder::new(provider, settings.fallback),
        });

        Self {
            llm,
            catalog,
            dispatcher,
            ingestor,
            self_alias: settings.self_alias,
            history_budget: settings.history_budget,
        }
    }

    /// Agents the hub may route to
    pub async fn agents(&self) -> HubResult<Vec<AgentDescriptor>> {
        let agents = self
            .catalog
            .list()
            .await
            .map_err(|err| HubError::Catalog(format!("{:#}", err)))?;

        Ok(agents
            .into_iter()
            .filter(|agent| self.self_alias.as_deref() != Some(agent.alias.as_str()))
            .collect())
    }

    /// Route the request to agents, or answer it with the language model when none apply
    pub async fn ask(&self, request: &AskRequest) -> HubResult<AskResponse> {
        let started = Instant::now();
        let llm = self.llm.as_ref().ok_or(HubError::LlmNotConfigured)?;

        let catalog = self.agents().await?;
        let (classified, routing_usage) = llm.classifier.classify(&request.prompt, &catalog).await?;
        let selection = merge_selection(classified, &request.prompt, &catalog);
        info!(
            session_id = %request.session_id,
            selection = ?selection,
            "routing decision"
        );

        let attachments: Vec<Attachment> = request
            .pdf_attachments()
            .iter()
            .map(Attachment::pdf)
            .collect();

        if !selection.is_empty() {
            let replies = self.dispatcher.dispatch(&selection, &catalog, request).await;
            let synthesis = synthesize(&replies, &catalog)?;

            let meta = ResponseMeta {
                model: request.model_id.clone(),
                response_time_ms: started.elapsed().as_millis() as u64,
                tokens_used: routing_usage.total(),
                agents: synthesis.agents,
                fastest_agent: synthesis.fastest_agent,
                agent_latency_ms: Some(synthesis.worst_latency_ms),
            };
            return Ok(AskResponse::success(
                request.session_id.as_str(),
                synthesis.content_markdown,
                meta,
                attachments,
            ));
        }

        let history = clip_history(request.history(), self.history_budget);
        let batch = self.ingestor.ingest_all(&request.document_urls()).await;
        let project_id = request.project_id();

        let answer = llm
            .responder
            .respond(
                &request.model_id,
                &request.prompt,
                project_id.as_deref(),
                &history,
                &catalog,
                &batch,
            )
            .await?;

        let meta = ResponseMeta {
            model: request.model_id.clone(),
            response_time_ms: started.elapsed().as_millis() as u64,
            tokens_used: routing_usage.total() + answer.usage.total(),
            agents: Vec::new(),
            fastest_agent: None,
            agent_latency_ms: None,
        };
        Ok(AskResponse::success(
            request.session_id.as_str(),
            answer.content_markdown,
            meta,
            attachments,
        ))
    }
}
