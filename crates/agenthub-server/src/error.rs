use thiserror::Error;

/// Environment variable prefix for every setting
pub const ENV_PREFIX: &str = "AGENTHUB";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: set {env_var} or the matching key in the config file")]
    MissingEnvVar { env_var: String },

    #[error("Invalid address {address}: {source}")]
    InvalidAddress {
        address: String,
        source: std::net::AddrParseError,
    },

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets a dotted config key, e.g. `provider.api_key`
pub fn to_env_var(field: &str) -> String {
    format!(
        "{}_{}",
        ENV_PREFIX,
        field.to_uppercase().replace('.', "__")
    )
}

/// Pull the dotted key out of a "missing field `x`" deserialization message
pub fn missing_field_key(message: &str) -> Option<String> {
    let field = between_backticks(message.split_once("missing field ")?.1)?;
    match message
        .split_once("for key ")
        .and_then(|(_, rest)| between_backticks(rest))
    {
        Some(key) if !key.is_empty() => Some(format!("{}.{}", key, field)),
        _ => Some(field.to_string()),
    }
}

fn between_backticks(text: &str) -> Option<&str> {
    let rest = text.strip_prefix('`')?;
    rest.split_once('`').map(|(inside, _)| inside)
}
