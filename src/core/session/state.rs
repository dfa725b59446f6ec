use serde::{Deserialize, Serialize};

/// Call lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CallState {
    /// Incoming invitation, not answered yet
    Initial,
    /// Outgoing INVITE sent, or incoming invitation accepted
    Establishing,
    /// Media flowing
    Established,
    /// Ended; the session leaves the registry on entry
    Terminated,
}

impl CallState {
    /// Check whether the state machine allows moving to `next`
    pub fn can_transition_to(&self, next: CallState) -> bool {
        use CallState::*;

        match (self, next) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (Initial, Establishing) | (Initial, Established) => true,
            (Establishing, Established) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Terminated)
    }

    pub fn is_established(&self) -> bool {
        matches!(self, CallState::Established)
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallState::Initial => write!(f, "Initial"),
            CallState::Establishing => write!(f, "Establishing"),
            CallState::Established => write!(f, "Established"),
            CallState::Terminated => write!(f, "Terminated"),
        }
    }
}

/// Transport connection state, process-wide
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Registered with the server; implies connected
    Registered,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Registered)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Registered => write!(f, "Registered"),
        }
    }
}
