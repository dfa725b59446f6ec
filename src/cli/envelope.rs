use crate::domain::error::{SipLineError, SipLineResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Command name used to announce an agent's status
pub const SET_STATUS: &str = "set-status";

/// Status reported when a set-status payload carries none
pub const STATUS_NOT_AVAILABLE: &str = "not-available";

/// Statuses the client manages itself; agents cannot choose them
pub const RESERVED_STATUSES: [&str; 2] = ["disconnected", "active-call"];

/// `{cmd, args}` payload exchanged between agents in message bodies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEnvelope {
    pub cmd: String,
    #[serde(default)]
    pub args: Value,
}

impl AgentEnvelope {
    pub fn new(cmd: impl Into<String>, args: Value) -> Self {
        Self {
            cmd: cmd.into(),
            args,
        }
    }

    /// `set-status` command for a status the agent may pick
    pub fn set_status(status: &str) -> SipLineResult<Self> {
        if status.trim().is_empty() {
            return Err(SipLineError::InvalidInput("status must not be empty".to_string()));
        }
        if RESERVED_STATUSES.contains(&status) {
            return Err(SipLineError::InvalidInput(format!(
                "status '{}' is managed by the client",
                status
            )));
        }
        Ok(Self::new(SET_STATUS, json!({ "status": status })))
    }

    pub fn encode(&self) -> SipLineResult<String> {
        serde_json::to_string(self)
            .map_err(|e| SipLineError::InvalidInput(format!("Failed to encode envelope: {}", e)))
    }

    pub fn decode(payload: &str) -> SipLineResult<Self> {
        serde_json::from_str(payload)
            .map_err(|e| SipLineError::InvalidInput(format!("Not an agent envelope: {}", e)))
    }

    /// Status carried by a `set-status` envelope; `None` for other commands
    pub fn status(&self) -> Option<&str> {
        if self.cmd != SET_STATUS {
            return None;
        }
        Some(
            self.args
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or(STATUS_NOT_AVAILABLE),
        )
    }
}
