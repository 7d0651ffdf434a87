use serde_json::Value;

use crate::errors::{AgentFailure, HubError, HubResult};
use crate::models::agent::{AgentAttribution, AgentDescriptor};
use crate::models::reply::{AgentOutcome, AgentReply};

/// Shown when an agent answered without any readable content
pub const NO_CONTENT: &str = "(no content)";

/// Reply fields that may carry the answer, in priority order
const CONTENT_FIELDS: &[&str] = &["content_markdown", "answer", "content"];

/// The merged answer built from agent replies
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub content_markdown: String,
    /// Every agent that answered, in selection order
    pub agents: Vec<AgentAttribution>,
    pub fastest_agent: Option<String>,
    /// Slowest successful call
    pub worst_latency_ms: u64,
}

/// First non-blank content field of an agent reply, or the placeholder
pub fn extract_content(data: &Value) -> String {
    CONTENT_FIELDS
        .iter()
        .filter_map(|field| data.get(field).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .unwrap_or(NO_CONTENT)
        .to_string()
}

fn find_agent<'a>(alias: &str, catalog: &'a [AgentDescriptor]) -> Option<&'a AgentDescriptor> {
    catalog.iter().find(|agent| agent.alias == alias)
}

/// Merge agent replies into a single answer.
///
/// One success is returned as-is. Several are rendered as `## Name` sections in reply order.
/// No success at all is an error naming every agent and why it failed.
pub fn synthesize(replies: &[AgentReply], catalog: &[AgentDescriptor]) -> HubResult<Synthesis> {
    let answered: Vec<(&AgentReply, &Value)> = replies
        .iter()
        .filter_map(|reply| match &reply.outcome {
            AgentOutcome::Answered(data) => Some((reply, data)),
            AgentOutcome::Failed(_) => None,
        })
        .collect();

    if answered.is_empty() {
        return Err(HubError::AgentsUnavailable(
            replies
                .iter()
                .map(|reply| AgentFailure {
                    alias: reply.alias.clone(),
                    name: find_agent(&reply.alias, catalog)
                        .map(|agent| agent.name.clone())
                        .unwrap_or_else(|| reply.alias.clone()),
                    ok: false,
                    error: reply.error().unwrap_or_default().to_string(),
                })
                .collect(),
        ));
    }

    let attribution = |alias: &str| {
        find_agent(alias, catalog)
            .map(AgentAttribution::from)
            .unwrap_or_else(|| AgentAttribution {
                alias: alias.to_string(),
                name: alias.to_string(),
                icon: None,
            })
    };

    let content_markdown = match answered.as_slice() {
        [(_, data)] => extract_content(data),
        _ => answered
            .iter()
            .map(|(reply, data)| {
                format!("## {}\n\n{}", attribution(&reply.alias).name, extract_content(data))
            })
            .collect::<Vec<_>>()
            .join("\n\n"),
    };

    let fastest_agent = answered
        .iter()
        .min_by_key(|(reply, _)| reply.time_ms)
        .map(|(reply, _)| reply.alias.clone());
    let worst_latency_ms = answered
        .iter()
        .map(|(reply, _)| reply.time_ms)
        .max()
        .unwrap_or(0);

    Ok(Synthesis {
        content_markdown,
        agents: answered
            .iter()
            .map(|(reply, _)| attribution(&reply.alias))
            .collect(),
        fastest_agent,
        worst_latency_ms,
    })
}
