use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::errors::{HubError, HubResult};
use crate::models::agent::AgentDescriptor;
use crate::models::message::Message;
use crate::prompt_template::{load_prompt, ROUTING_PROMPT};
use crate::providers::base::{Provider, Usage};

/// Result of reading the classifier's reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedAliases {
    /// Known aliases in the order the model listed them, canonical casing, duplicates kept
    Parsed(Vec<String>),
    /// No array literal could be located in the reply
    Unparseable,
}

impl ParsedAliases {
    pub fn into_aliases(self) -> Vec<String> {
        match self {
            ParsedAliases::Parsed(aliases) => aliases,
            ParsedAliases::Unparseable => Vec::new(),
        }
    }
}

/// Asks a language model which agents fit a prompt
pub struct Classifier {
    provider: Arc<dyn Provider>,
    model: Option<String>,
}

impl Classifier {
    /// `model` overrides the provider's default model for routing calls
    pub fn new(provider: Arc<dyn Provider>, model: Option<String>) -> Self {
        Self { provider, model }
    }

    /// Candidate aliases for `prompt`, plus the tokens the routing call consumed.
    /// An empty catalog short-circuits without calling the model.
    pub async fn classify(
        &self,
        prompt: &str,
        catalog: &[AgentDescriptor],
    ) -> HubResult<(Vec<String>, Usage)> {
        if catalog.is_empty() {
            return Ok((Vec::new(), Usage::default()));
        }

        let system = load_prompt(ROUTING_PROMPT, &json!({ "catalog": catalog_text(catalog) }))
            .map_err(|err| HubError::Prepare(err.to_string()))?;

        let model = self
            .model
            .as_deref()
            .unwrap_or_else(|| self.provider.default_model());
        let (reply, usage) = self
            .provider
            .complete(
                Some(model),
                &system,
                &[Message::user().with_text(prompt)],
            )
            .await
            .map_err(HubError::Routing)?;

        let raw = reply.text();
        debug!(model, raw = %raw, "classifier reply");

        let parsed = parse_alias_list(&raw, catalog);
        if parsed == ParsedAliases::Unparseable {
            debug!("classifier reply has no alias list");
        }
        Ok((parsed.into_aliases(), usage))
    }
}

/// One line per agent: `- alias: description [hint: ...]`
pub fn catalog_text(catalog: &[AgentDescriptor]) -> String {
    catalog
        .iter()
        .map(|agent| match agent.hint() {
            Some(hint) => format!("- {}: {} [hint: {}]", agent.alias, agent.description, hint),
            None => format!("- {}: {}", agent.alias, agent.description),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replace typographic quotation marks with their ASCII counterparts
pub fn normalize_quotes(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' | '\u{2036}'
            | '\u{00AB}' | '\u{00BB}' | '\u{FF02}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' | '\u{2035}'
            | '\u{2039}' | '\u{203A}' | '\u{FF07}' => '\'',
            other => other,
        })
        .collect()
}

/// Read an alias list out of free-form model output.
///
/// The text between the first `[` and the last `]` is quote-normalized and parsed as JSON
/// (one level of nesting is flattened). If that fails the brackets are stripped and the
/// content is split on commas. Either way only known aliases survive, in their catalog casing.
pub fn parse_alias_list(raw: &str, catalog: &[AgentDescriptor]) -> ParsedAliases {
    let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']')) else {
        return ParsedAliases::Unparseable;
    };
    if end < start {
        return ParsedAliases::Unparseable;
    }

    let literal = normalize_quotes(&raw[start..=end]);
    let tokens = strict_tokens(&literal).unwrap_or_else(|| lenient_tokens(&literal));

    ParsedAliases::Parsed(
        tokens
            .iter()
            .filter_map(|token| canonical_alias(token, catalog))
            .collect(),
    )
}

fn strict_tokens(literal: &str) -> Option<Vec<String>> {
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(literal) else {
        return None;
    };

    let mut tokens = Vec::new();
    for item in items {
        match item {
            Value::String(alias) => tokens.push(alias),
            Value::Array(nested) => tokens.extend(
                nested
                    .into_iter()
                    .filter_map(|value| value.as_str().map(str::to_string)),
            ),
            _ => {}
        }
    }
    Some(tokens)
}

fn lenient_tokens(literal: &str) -> Vec<String> {
    let inner = literal
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(literal);

    inner
        .split(',')
        .map(|token| {
            token
                .trim()
                .trim_matches(|c: char| is_quote_like(c) || c == '\\' || c == '[' || c == ']')
                .trim()
                .to_string()
        })
        .filter(|token| !token.is_empty())
        .collect()
}

fn is_quote_like(c: char) -> bool {
    matches!(c, '"' | '\'' | '`') || normalize_quotes(&c.to_string()) != c.to_string()
}

fn canonical_alias(token: &str, catalog: &[AgentDescriptor]) -> Option<String> {
    let wanted = token.trim().to_lowercase();
    catalog
        .iter()
        .find(|agent| agent.alias.to_lowercase() == wanted)
        .map(|agent| agent.alias.clone())
}
