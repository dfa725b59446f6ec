use crate::core::session::state::CallState;
use crate::domain::error::{SipLineError, SipLineResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Engine-supplied session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Call direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CallDirection {
    Incoming,
    Outgoing,
}

impl std::fmt::Display for CallDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallDirection::Incoming => write!(f, "Incoming"),
            CallDirection::Outgoing => write!(f, "Outgoing"),
        }
    }
}

/// Remote party of a call
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteIdentity {
    /// SIP URI or phone number
    pub uri: String,
    /// Display name, empty when the remote party sent none
    pub display_name: String,
}

impl RemoteIdentity {
    pub fn new(uri: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            display_name: display_name.into(),
        }
    }

    /// Bare URI with no display name
    pub fn uri(uri: impl Into<String>) -> Self {
        Self::new(uri, "")
    }
}

impl std::fmt::Display for RemoteIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.display_name.is_empty() {
            write!(f, "{}", self.uri)
        } else {
            write!(f, "\"{}\" <{}>", self.display_name, self.uri)
        }
    }
}

/// Result of applying a hold confirmation from the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldOutcome {
    /// The hold flag now reflects the confirmation
    Applied,
    /// A newer hold/unhold request is still outstanding; nothing changed
    Superseded,
}

/// One tracked call
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    id: SessionId,
    direction: CallDirection,
    remote: RemoteIdentity,
    state: CallState,
    held: bool,
    muted: bool,
    created_at: SystemTime,
    answered_at: Option<SystemTime>,
    /// Hold/unhold requests sent but not yet confirmed
    #[serde(skip)]
    pending_hold_requests: u32,
}

impl Session {
    /// Session for an incoming invitation
    pub fn incoming(id: SessionId, remote: RemoteIdentity) -> Self {
        Self::new(id, CallDirection::Incoming, remote, CallState::Initial)
    }

    /// Session for an outbound call whose INVITE is about to be sent
    pub fn outgoing(id: SessionId, remote: RemoteIdentity) -> Self {
        Self::new(id, CallDirection::Outgoing, remote, CallState::Establishing)
    }

    fn new(id: SessionId, direction: CallDirection, remote: RemoteIdentity, state: CallState) -> Self {
        Self {
            id,
            direction,
            remote,
            state,
            held: false,
            muted: false,
            created_at: SystemTime::now(),
            answered_at: None,
            pending_hold_requests: 0,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn direction(&self) -> CallDirection {
        self.direction
    }

    pub fn remote(&self) -> &RemoteIdentity {
        &self.remote
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn answered_at(&self) -> Option<SystemTime> {
        self.answered_at
    }

    /// Time since the call was answered, zero if it never was
    pub fn talk_time(&self) -> Duration {
        self.answered_at
            .and_then(|at| SystemTime::now().duration_since(at).ok())
            .unwrap_or_default()
    }

    /// Move to `next`, enforcing the call state machine
    pub fn advance(&mut self, next: CallState) -> SipLineResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(self.invalid_state(&format!("move to {}", next)));
        }
        if next == CallState::Established {
            self.answered_at = Some(SystemTime::now());
        }
        self.state = next;
        Ok(())
    }

    pub(crate) fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Whether a hold/unhold request is awaiting confirmation
    pub fn has_pending_hold(&self) -> bool {
        self.pending_hold_requests > 0
    }

    pub(crate) fn begin_hold_request(&mut self) {
        self.pending_hold_requests += 1;
    }

    /// Forget a request the engine failed to send
    pub(crate) fn cancel_hold_request(&mut self) {
        self.pending_hold_requests = self.pending_hold_requests.saturating_sub(1);
    }

    /// Apply a hold confirmation; the latest request wins.
    ///
    /// Confirmations arrive in request order, so while newer requests are
    /// outstanding this one is stale and leaves the flag alone.
    pub(crate) fn apply_hold_confirmation(&mut self, held: bool) -> HoldOutcome {
        self.pending_hold_requests = self.pending_hold_requests.saturating_sub(1);
        if self.pending_hold_requests == 0 {
            self.held = held;
            HoldOutcome::Applied
        } else {
            HoldOutcome::Superseded
        }
    }

    pub(crate) fn invalid_state(&self, operation: &str) -> SipLineError {
        SipLineError::InvalidState {
            id: self.id.to_string(),
            state: self.state.to_string(),
            operation: operation.to_string(),
        }
    }
}
