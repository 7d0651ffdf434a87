use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// How a single agent call ended
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutcome {
    /// The agent answered; the payload is the agent's opaque reply body
    Answered(Value),
    /// The call failed after its retry; the string says why
    Failed(String),
}

/// The outcome of calling one selected agent. Exactly one exists per dispatched alias.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    pub alias: String,
    /// Wall time for the call including any retry, recorded on failure too
    pub time_ms: u64,
    pub outcome: AgentOutcome,
}

impl AgentReply {
    pub fn answered<S: Into<String>>(alias: S, time_ms: u64, data: Value) -> Self {
        Self {
            alias: alias.into(),
            time_ms,
            outcome: AgentOutcome::Answered(data),
        }
    }

    pub fn failed<S: Into<String>, E: Into<String>>(alias: S, time_ms: u64, error: E) -> Self {
        Self {
            alias: alias.into(),
            time_ms,
            outcome: AgentOutcome::Failed(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, AgentOutcome::Answered(_))
    }

    pub fn data(&self) -> Option<&Value> {
        match &self.outcome {
            AgentOutcome::Answered(data) => Some(data),
            AgentOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            AgentOutcome::Failed(error) => Some(error),
            AgentOutcome::Answered(_) => None,
        }
    }
}

// Wire shape: {alias, ok, timeMs, data | error}
impl Serialize for AgentReply {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("alias", &self.alias)?;
        map.serialize_entry("ok", &self.is_ok())?;
        map.serialize_entry("timeMs", &self.time_ms)?;
        match &self.outcome {
            AgentOutcome::Answered(data) => map.serialize_entry("data", data)?,
            AgentOutcome::Failed(error) => map.serialize_entry("error", error)?,
        }
        map.end()
    }
}
