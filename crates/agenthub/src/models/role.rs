use serde::{Deserialize, Deserializer, Serialize};

/// Author of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl Role {
    /// Parse a role name, coercing anything unrecognized to `User`
    pub fn coerce(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "assistant" => Role::Assistant,
            "system" => Role::System,
            _ => Role::User,
        }
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(name
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .map(Role::coerce)
            .unwrap_or(Role::User))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_roles_become_user() {
        let roles: Vec<Role> =
            serde_json::from_str(r#"["assistant", "SYSTEM", "tool", "", null, 7]"#).unwrap();
        assert_eq!(
            roles,
            vec![
                Role::Assistant,
                Role::System,
                Role::User,
                Role::User,
                Role::User,
                Role::User
            ]
        );
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    }
}
