use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

/// Instructions for the routing classifier; expects `catalog`
pub const ROUTING_PROMPT: &str = include_str!("prompts/routing.md");

/// System prompt for the direct language-model path
pub const SYSTEM_PROMPT: &str = include_str!("prompts/system.md");

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}
