use crate::core::engine::engine::{
    DtmfMode, InviteOptions, RegisterOptions, SignalingEngine, UnregisterOptions,
};
use crate::core::engine::event::EngineEvent;
use crate::core::session::{RemoteIdentity, SessionId};
use crate::domain::error::{SipLineError, SipLineResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A request the loopback engine received from the orchestration layer
#[derive(Debug, Clone, PartialEq)]
pub enum EngineRequest {
    Connect,
    Disconnect,
    Register,
    Unregister,
    Invite { id: SessionId, destination: String },
    Accept { id: SessionId },
    Reject { id: SessionId },
    Hangup { id: SessionId },
    SetHold { id: SessionId, hold: bool },
    SetLocalMedia { id: SessionId, enabled: bool },
    Dtmf { id: SessionId, tone: char, mode: DtmfMode },
    Message { destination: String, body: String },
}

struct LoopbackState {
    connected: bool,
    connect_attempts: u32,
    fail_connect: bool,
    fail_requests: bool,
    auto_confirm: bool,
    auto_answer: bool,
    outbound_counter: u64,
    destinations: HashMap<SessionId, String>,
    with_media: HashSet<SessionId>,
    requests: Vec<EngineRequest>,
}

/// In-process signaling engine.
///
/// Records every request it receives and, while auto-confirm is on,
/// answers each one with the event a cooperative server would produce.
/// Remote-side activity (incoming calls, remote hangups, transport loss)
/// is injected with [`emit`](Self::emit) and the helpers around it.
pub struct LoopbackEngine {
    events: mpsc::UnboundedSender<EngineEvent>,
    state: Mutex<LoopbackState>,
}

impl LoopbackEngine {
    /// Create an engine and the receiver its events are delivered on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let engine = Self {
            events,
            state: Mutex::new(LoopbackState {
                connected: false,
                connect_attempts: 0,
                fail_connect: false,
                fail_requests: false,
                auto_confirm: true,
                auto_answer: false,
                outbound_counter: 0,
                destinations: HashMap::new(),
                with_media: HashSet::new(),
                requests: Vec::new(),
            }),
        };
        (engine, receiver)
    }

    /// Emit confirmation events for requests (default: on)
    pub fn set_auto_confirm(&self, enabled: bool) {
        self.state().auto_confirm = enabled;
    }

    /// Have the remote party answer outbound calls immediately (default: off)
    pub fn set_auto_answer(&self, enabled: bool) {
        self.state().auto_answer = enabled;
    }

    /// Make every transport handshake fail
    pub fn set_connect_failure(&self, fail: bool) {
        self.state().fail_connect = fail;
    }

    /// Make in-dialog and messaging requests fail to send
    pub fn set_request_failure(&self, fail: bool) {
        self.state().fail_requests = fail;
    }

    /// Deliver an event as if the engine had raised it
    pub fn emit(&self, event: EngineEvent) {
        if let EngineEvent::CallAnswered { id } = &event {
            self.state().with_media.insert(id.clone());
        }
        if self.events.send(event).is_err() {
            warn!("Loopback engine event dropped: receiver closed");
        }
    }

    /// Simulate an incoming invitation
    pub fn ring(&self, id: &str, remote: RemoteIdentity) {
        self.emit(EngineEvent::CallReceived {
            id: SessionId::from(id),
            remote,
        });
    }

    /// Simulate the remote party ending a session
    pub fn remote_hangup(&self, id: &SessionId) {
        self.state().with_media.remove(id);
        self.emit(EngineEvent::CallHangup { id: id.clone() });
    }

    /// Simulate an unexpected transport loss
    pub fn drop_transport(&self, error: &str) {
        self.state().connected = false;
        self.emit(EngineEvent::Disconnected {
            error: Some(error.to_string()),
        });
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// Number of transport handshakes attempted so far
    pub fn connect_attempts(&self) -> u32 {
        self.state().connect_attempts
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<EngineRequest> {
        self.state().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.state().requests.clear();
    }

    fn state(&self) -> MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a request; returns whether confirmations should be emitted
    fn record(&self, request: EngineRequest) -> bool {
        debug!("Loopback engine request: {:?}", request);
        let mut state = self.state();
        state.requests.push(request);
        state.auto_confirm
    }

    fn check_request(&self) -> SipLineResult<()> {
        if self.state().fail_requests {
            return Err(SipLineError::engine("request could not be sent"));
        }
        Ok(())
    }
}

#[async_trait]
impl SignalingEngine for LoopbackEngine {
    async fn connect(&self) -> SipLineResult<()> {
        self.record(EngineRequest::Connect);
        {
            let mut state = self.state();
            state.connect_attempts += 1;
            if state.fail_connect {
                return Err(SipLineError::transport("handshake failed"));
            }
            state.connected = true;
        }
        self.emit(EngineEvent::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> SipLineResult<()> {
        self.record(EngineRequest::Disconnect);
        self.state().connected = false;
        self.emit(EngineEvent::Disconnected { error: None });
        Ok(())
    }

    async fn register(&self, _options: &RegisterOptions) -> SipLineResult<()> {
        if self.record(EngineRequest::Register) {
            self.emit(EngineEvent::Registered);
        }
        Ok(())
    }

    async fn unregister(&self, _options: &UnregisterOptions) -> SipLineResult<()> {
        if self.record(EngineRequest::Unregister) {
            self.emit(EngineEvent::Unregistered);
        }
        Ok(())
    }

    fn create_outbound(&self, destination: &str) -> SipLineResult<SessionId> {
        if destination.trim().is_empty() {
            return Err(SipLineError::InvalidInput(
                "destination must not be empty".to_string(),
            ));
        }
        let mut state = self.state();
        state.outbound_counter += 1;
        let id = SessionId::new(format!("out-{}", state.outbound_counter));
        state.destinations.insert(id.clone(), destination.to_string());
        Ok(id)
    }

    async fn invite(&self, id: &SessionId, _options: &InviteOptions) -> SipLineResult<()> {
        self.check_request()?;
        let destination = self
            .state()
            .destinations
            .get(id)
            .cloned()
            .ok_or_else(|| SipLineError::engine(format!("unknown outbound session '{}'", id)))?;
        self.record(EngineRequest::Invite {
            id: id.clone(),
            destination,
        });
        self.emit(EngineEvent::CallCreated { id: id.clone() });
        if self.state().auto_answer {
            self.emit(EngineEvent::CallAnswered { id: id.clone() });
        }
        Ok(())
    }

    async fn accept(&self, id: &SessionId) -> SipLineResult<()> {
        self.check_request()?;
        if self.record(EngineRequest::Accept { id: id.clone() }) {
            self.emit(EngineEvent::CallAnswered { id: id.clone() });
        }
        Ok(())
    }

    async fn reject(&self, id: &SessionId) -> SipLineResult<()> {
        if self.record(EngineRequest::Reject { id: id.clone() }) {
            self.emit(EngineEvent::CallHangup { id: id.clone() });
        }
        Ok(())
    }

    async fn hangup(&self, id: &SessionId) -> SipLineResult<()> {
        self.check_request()?;
        let confirm = self.record(EngineRequest::Hangup { id: id.clone() });
        if confirm {
            self.state().with_media.remove(id);
            self.emit(EngineEvent::CallHangup { id: id.clone() });
        }
        Ok(())
    }

    async fn set_hold(&self, id: &SessionId, hold: bool) -> SipLineResult<()> {
        self.check_request()?;
        if self.record(EngineRequest::SetHold {
            id: id.clone(),
            hold,
        }) {
            self.emit(EngineEvent::HoldChanged {
                id: id.clone(),
                held: hold,
            });
        }
        Ok(())
    }

    fn set_local_media_enabled(&self, id: &SessionId, enabled: bool) -> bool {
        self.record(EngineRequest::SetLocalMedia {
            id: id.clone(),
            enabled,
        });
        self.state().with_media.contains(id)
    }

    async fn send_dtmf(&self, id: &SessionId, tone: char, mode: DtmfMode) -> SipLineResult<()> {
        self.check_request()?;
        self.record(EngineRequest::Dtmf {
            id: id.clone(),
            tone,
            mode,
        });
        Ok(())
    }

    async fn send_message(&self, destination: &str, body: &str) -> SipLineResult<()> {
        self.check_request()?;
        self.record(EngineRequest::Message {
            destination: destination.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_emits_event() {
        let (engine, mut events) = LoopbackEngine::new();

        engine.connect().await.unwrap();
        assert!(engine.is_connected());
        assert_eq!(engine.connect_attempts(), 1);
        assert_eq!(events.recv().await, Some(EngineEvent::Connected));
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let (engine, mut events) = LoopbackEngine::new();
        engine.set_connect_failure(true);

        let result = engine.connect().await;
        assert!(matches!(result, Err(SipLineError::Transport { .. })));
        assert!(!engine.is_connected());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_outbound_flow() {
        let (engine, mut events) = LoopbackEngine::new();
        engine.set_auto_answer(true);

        let id = engine.create_outbound("sip:bob@example.com").unwrap();
        engine.invite(&id, &InviteOptions::default()).await.unwrap();

        assert_eq!(events.recv().await, Some(EngineEvent::CallCreated { id: id.clone() }));
        assert_eq!(events.recv().await, Some(EngineEvent::CallAnswered { id: id.clone() }));
        assert!(engine.set_local_media_enabled(&id, false));
        assert_eq!(
            engine.requests()[0],
            EngineRequest::Invite {
                id,
                destination: "sip:bob@example.com".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_without_auto_confirm() {
        let (engine, mut events) = LoopbackEngine::new();
        engine.set_auto_confirm(false);

        let id = SessionId::from("s1");
        engine.set_hold(&id, true).await.unwrap();
        assert!(events.try_recv().is_err());
        assert_eq!(engine.requests().len(), 1);
        assert!(!engine.set_local_media_enabled(&id, false));
    }

    #[test]
    fn test_empty_destination_rejected() {
        let (engine, _events) = LoopbackEngine::new();
        assert!(matches!(
            engine.create_outbound(" "),
            Err(SipLineError::InvalidInput(_))
        ));
    }
}
