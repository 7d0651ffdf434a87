//! Answers directly with the language model when no agent was selected.

use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::errors::{HubError, HubResult};
use crate::models::agent::AgentDescriptor;
use crate::models::content::Content;
use crate::models::document::DocumentBatch;
use crate::models::message::Message;
use crate::models::request::Turn;
use crate::prompt_template::{load_prompt, SYSTEM_PROMPT};
use crate::providers::base::{Provider, Usage};
use crate::synthesis::NO_CONTENT;

pub const DEFAULT_BASE_PROMPT: &str = "You are the assistant of a research collaboration platform. \
Answer in the language of the question, be accurate and concise, and format your answer in Markdown.";

/// Separates the user's prompt from text extracted out of attachments
pub const ATTACHMENTS_DELIMITER: &str = "----- Attached documents -----";

#[derive(Debug, Clone, Default)]
pub struct FallbackSettings {
    /// Operator prompt; the built-in one is used when unset or blank
    pub base_prompt: Option<String>,
    pub site_guidance: Option<String>,
    /// Tools the platform offers, one short description each
    pub tools: Vec<String>,
}

impl FallbackSettings {
    fn base_prompt(&self) -> &str {
        self.base_prompt
            .as_deref()
            .map(str::trim)
            .filter(|prompt| !prompt.is_empty())
            .unwrap_or(DEFAULT_BASE_PROMPT)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FallbackAnswer {
    pub content_markdown: String,
    pub usage: Usage,
}

/// Render the system prompt: base prompt, optional context, then the fixed request block
pub fn build_system_prompt(
    settings: &FallbackSettings,
    project_id: Option<&str>,
    agents: &[AgentDescriptor],
    batch: &DocumentBatch,
) -> Result<String, tera::Error> {
    let agents: Vec<_> = agents
        .iter()
        .map(|agent| json!({"name": agent.name, "description": agent.description}))
        .collect();
    let site_guidance = settings
        .site_guidance
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();

    load_prompt(
        SYSTEM_PROMPT,
        &json!({
            "base_prompt": settings.base_prompt(),
            "tools": settings.tools,
            "agents": agents,
            "site_guidance": site_guidance,
            "project_id": project_id.unwrap_or("none"),
            "attachment_count": batch.len(),
            "unreadable": batch.errors,
        }),
    )
}

/// The final user turn. Plain text unless some attachment produced text or images, in which
/// case it is a list of parts.
pub fn build_user_message(prompt: &str, batch: &DocumentBatch) -> Message {
    if !batch.has_content() {
        return Message::user().with_text(prompt);
    }

    let text = if batch.texts.is_empty() {
        prompt.to_string()
    } else {
        format!(
            "{}\n\n{}\n\n{}",
            prompt,
            ATTACHMENTS_DELIMITER,
            batch.texts.join("\n\n")
        )
    };

    batch.images.iter().fold(
        Message::user().structured().with_content(Content::text(text)),
        |message, image| message.with_image(image.base64.as_str(), image.mime_type.as_str()),
    )
}

pub struct FallbackResponder {
    provider: Arc<dyn Provider>,
    settings: FallbackSettings,
}

impl FallbackResponder {
    pub fn new(provider: Arc<dyn Provider>, settings: FallbackSettings) -> Self {
        Self { provider, settings }
    }

    /// Call the model exactly once with the assembled conversation
    pub async fn respond(
        &self,
        model: &str,
        prompt: &str,
        project_id: Option<&str>,
        history: &[Turn],
        agents: &[AgentDescriptor],
        batch: &DocumentBatch,
    ) -> HubResult<FallbackAnswer> {
        let system = build_system_prompt(&self.settings, project_id, agents, batch)
            .map_err(|err| HubError::Prepare(err.to_string()))?;

        let mut messages: Vec<Message> = history
            .iter()
            .map(|turn| Message::new(turn.role).with_text(turn.content.as_str()))
            .collect();
        messages.push(build_user_message(prompt, batch));

        let (reply, usage) = self
            .provider
            .complete(Some(model), &system, &messages)
            .await
            .map_err(HubError::Llm)?;

        info!(
            model,
            history = history.len(),
            documents = batch.len(),
            tokens = usage.total(),
            "answered without agents"
        );

        let text = reply.text();
        let content_markdown = match text.trim() {
            "" => NO_CONTENT.to_string(),
            trimmed => trimmed.to_string(),
        };

        Ok(FallbackAnswer {
            content_markdown,
            usage,
        })
    }
}
