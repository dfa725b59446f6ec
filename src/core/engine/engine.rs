use crate::core::session::SessionId;
use crate::domain::error::SipLineResult;
use async_trait::async_trait;

/// Options for a REGISTER request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterOptions {
    /// Requested registration lifetime in seconds
    pub expires: Option<u32>,
    /// Extra headers added to the request
    pub extra_headers: Vec<String>,
}

/// Options for an un-REGISTER request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnregisterOptions {
    /// Remove every binding for the AOR, not only this user agent's
    pub all: bool,
    pub extra_headers: Vec<String>,
}

/// Options for an outbound INVITE
#[derive(Debug, Clone, PartialEq)]
pub struct InviteOptions {
    pub audio: bool,
    pub video: bool,
    pub extra_headers: Vec<String>,
}

impl Default for InviteOptions {
    fn default() -> Self {
        Self {
            audio: true,
            video: false,
            extra_headers: Vec::new(),
        }
    }
}

/// How DTMF tones are carried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtmfMode {
    /// INFO request with `application/dtmf-relay`
    Info,
    /// In-band RFC 2833 events through the session description handler
    InBand,
}

/// Signaling engine the orchestration layer drives.
///
/// Methods resolve once the request has been handed to the network; the
/// outcome of a request (registration accepted, call answered, hold
/// renegotiated, ...) is reported later as an
/// [`EngineEvent`](super::EngineEvent).
#[async_trait]
pub trait SignalingEngine: Send + Sync {
    /// Start the transport. Resolves when the handshake completes.
    async fn connect(&self) -> SipLineResult<()>;

    /// Stop the transport.
    async fn disconnect(&self) -> SipLineResult<()>;

    /// Send a REGISTER for the configured AOR.
    async fn register(&self, options: &RegisterOptions) -> SipLineResult<()>;

    /// Send an un-REGISTER for the configured AOR.
    async fn unregister(&self, options: &UnregisterOptions) -> SipLineResult<()>;

    /// Allocate an outbound dialog towards `destination` without sending
    /// anything yet. Returns the engine's identifier for the new session.
    fn create_outbound(&self, destination: &str) -> SipLineResult<SessionId>;

    /// Send the INVITE for a session allocated by [`create_outbound`](Self::create_outbound).
    async fn invite(&self, id: &SessionId, options: &InviteOptions) -> SipLineResult<()>;

    /// Accept an incoming invitation.
    async fn accept(&self, id: &SessionId) -> SipLineResult<()>;

    /// Reject an incoming invitation.
    async fn reject(&self, id: &SessionId) -> SipLineResult<()>;

    /// End a session with BYE, CANCEL or a reject response as appropriate.
    async fn hangup(&self, id: &SessionId) -> SipLineResult<()>;

    /// Send a re-INVITE offering hold (`true`) or unhold (`false`).
    async fn set_hold(&self, id: &SessionId, hold: bool) -> SipLineResult<()>;

    /// Enable or disable the session's outgoing media tracks.
    /// Returns `false` when the session has no local media yet.
    fn set_local_media_enabled(&self, id: &SessionId, enabled: bool) -> bool;

    /// Send one DTMF tone.
    async fn send_dtmf(&self, id: &SessionId, tone: char, mode: DtmfMode) -> SipLineResult<()>;

    /// Send an out-of-dialog MESSAGE.
    async fn send_message(&self, destination: &str, body: &str) -> SipLineResult<()>;
}
