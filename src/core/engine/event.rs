use crate::core::session::{RemoteIdentity, SessionId};
use std::time::Duration;

/// Events raised by the signaling engine, in the order it raised them.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Transport handshake completed
    Connected,
    /// Transport closed; `error` is set when the loss was not requested
    Disconnected { error: Option<String> },
    /// REGISTER accepted
    Registered,
    /// Registration removed
    Unregistered,
    /// REGISTER rejected or timed out
    RegistrationFailed { reason: String },
    /// INVITE for an outbound session was sent
    CallCreated { id: SessionId },
    /// Incoming invitation
    CallReceived { id: SessionId, remote: RemoteIdentity },
    /// Session established
    CallAnswered { id: SessionId },
    /// Session ended, whichever side ended it
    CallHangup { id: SessionId },
    /// Hold renegotiation outcome, or a remote hold change
    HoldChanged { id: SessionId, held: bool },
    /// DTMF tone received in-dialog
    DtmfReceived {
        id: SessionId,
        tone: char,
        duration: Duration,
    },
    /// Out-of-dialog MESSAGE received
    MessageReceived { from: String, body: String },
}

impl EngineEvent {
    /// Session the event refers to, if any
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            EngineEvent::CallCreated { id }
            | EngineEvent::CallReceived { id, .. }
            | EngineEvent::CallAnswered { id }
            | EngineEvent::CallHangup { id }
            | EngineEvent::HoldChanged { id, .. }
            | EngineEvent::DtmfReceived { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Short event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::Connected => "connected",
            EngineEvent::Disconnected { .. } => "disconnected",
            EngineEvent::Registered => "registered",
            EngineEvent::Unregistered => "unregistered",
            EngineEvent::RegistrationFailed { .. } => "registration-failed",
            EngineEvent::CallCreated { .. } => "call-created",
            EngineEvent::CallReceived { .. } => "call-received",
            EngineEvent::CallAnswered { .. } => "call-answered",
            EngineEvent::CallHangup { .. } => "call-hangup",
            EngineEvent::HoldChanged { .. } => "call-hold-changed",
            EngineEvent::DtmfReceived { .. } => "dtmf-received",
            EngineEvent::MessageReceived { .. } => "message-received",
        }
    }
}
