use serde_json::{json, Map, Value};

use super::base::Usage;
use crate::errors::ProviderError;
use crate::models::content::{Content, ImageContent};
use crate::models::message::Message;
use crate::models::role::Role;

/// Convert internal Message format to OpenAI's API message specification.
///   A message made of a single text part is sent with string content; anything else is sent
///   as a list of typed parts so images can ride along as data uris.
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .filter(|message| !message.content.is_empty())
        .map(|message| {
            let content = if message.is_plain_text() {
                json!(message.text())
            } else {
                Value::Array(message.content.iter().map(content_to_part).collect())
            };
            json!({
                "role": message.role,
                "content": content,
            })
        })
        .collect()
}

fn content_to_part(content: &Content) -> Value {
    match content {
        Content::Text(text) => json!({
            "type": "text",
            "text": text.text,
        }),
        Content::Image(image) => convert_image(image),
    }
}

/// Convert an image content into an openai image part
pub fn convert_image(image: &ImageContent) -> Value {
    json!({
        "type": "image_url",
        "image_url": {
            "url": image.data_uri()
        }
    })
}

/// Build a chat completion payload with the system message first
pub fn build_payload(
    model: &str,
    system: &str,
    messages: &[Message],
    temperature: Option<f32>,
    max_tokens: Option<i32>,
) -> Value {
    let mut messages_array = vec![json!({
        "role": "system",
        "content": system
    })];
    messages_array.extend(messages_to_openai_spec(messages));

    let mut payload = Map::new();
    payload.insert("model".to_string(), json!(model));
    payload.insert("messages".to_string(), Value::Array(messages_array));
    if let Some(temp) = temperature {
        payload.insert("temperature".to_string(), json!(temp));
    }
    if let Some(tokens) = max_tokens {
        payload.insert("max_tokens".to_string(), json!(tokens));
    }
    Value::Object(payload)
}

/// Convert OpenAI's API response to internal Message format
pub fn openai_response_to_message(response: &Value) -> Result<Message, ProviderError> {
    if let Some(error) = response.get("error") {
        return Err(ProviderError::Malformed(format!("error payload: {}", error)));
    }

    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| ProviderError::Malformed("response has no choices".to_string()))?;

    let mut message = Message::new(Role::Assistant);
    match original.get("content") {
        Some(Value::String(text)) => message = message.with_text(text.clone()),
        Some(Value::Array(parts)) => {
            for part in parts {
                if let Some(text) = part.get("text").and_then(Value::as_str) {
                    message = message.with_text(text);
                }
            }
        }
        _ => {}
    }

    Ok(message)
}

pub fn get_usage(data: &Value) -> Usage {
    let Some(usage) = data.get("usage") else {
        return Usage::default();
    };

    let input_tokens = usage
        .get("prompt_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);

    let output_tokens = usage
        .get("completion_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);

    let total_tokens = usage
        .get("total_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32)
        .or_else(|| match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });

    Usage::new(input_tokens, output_tokens, total_tokens)
}

/// Map a transport error, keeping timeouts distinct
pub fn request_error(err: reqwest::Error, timeout_secs: u64) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout_secs)
    } else {
        ProviderError::Request(err)
    }
}
