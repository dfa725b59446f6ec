use crate::core::connection::ConnectionController;
use crate::core::engine::{DtmfMode, InviteOptions, SignalingEngine};
use crate::core::media::MediaControl;
use crate::core::session::{CallDirection, CallState, RemoteIdentity, Session, SessionId, SessionRegistry};
use crate::domain::error::{SipLineError, SipLineResult};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Tones accepted by [`CallControl::send_dtmf`]
pub const DTMF_TONES: &str = "0123456789ABCD*#,";

/// Call commands: place, answer, decline, hang up and DTMF.
///
/// Commands only send requests. State moves forward when the engine's
/// events are applied by the event bridge, except for the local
/// `Initial -> Establishing` step once an answer has been sent.
#[derive(Clone)]
pub struct CallControl {
    engine: Arc<dyn SignalingEngine>,
    connection: ConnectionController,
    registry: Arc<RwLock<SessionRegistry>>,
    media: MediaControl,
    invite_options: InviteOptions,
    dtmf_mode: DtmfMode,
}

impl CallControl {
    pub fn new(
        engine: Arc<dyn SignalingEngine>,
        connection: ConnectionController,
        registry: Arc<RwLock<SessionRegistry>>,
        media: MediaControl,
        invite_options: InviteOptions,
        dtmf_mode: DtmfMode,
    ) -> Self {
        Self {
            engine,
            connection,
            registry,
            media,
            invite_options,
            dtmf_mode,
        }
    }

    /// Place an outbound call with the default invite options
    pub async fn call(&self, destination: &str) -> SipLineResult<SessionId> {
        let options = self.invite_options.clone();
        self.call_with(destination, options).await
    }

    /// Place an outbound call.
    ///
    /// The new session takes its registry slot before anything is sent, so a
    /// call that cannot fit fails without touching other sessions. Other
    /// established calls are then put on hold. Resolves with the new
    /// session's id once the INVITE is sent.
    pub async fn call_with(&self, destination: &str, options: InviteOptions) -> SipLineResult<SessionId> {
        self.connection.ensure_connected().await?;
        let id = {
            let mut registry = self.registry.write().await;
            if registry.is_full() {
                return Err(SipLineError::CapacityExceeded {
                    max: registry.capacity(),
                });
            }
            let id = self.engine.create_outbound(destination)?;
            registry.add(Session::outgoing(id.clone(), RemoteIdentity::uri(destination)))?;
            id
        };

        // The new session is still establishing, so it is not held here.
        let held = self.media.hold_all().await;
        if !held.is_empty() {
            debug!("Put {} session(s) on hold before dialing", held.len());
        }

        info!("Calling {} (session '{}')", destination, id);
        if let Err(e) = self.engine.invite(&id, &options).await {
            self.registry.write().await.remove(&id);
            warn!("Failed to send INVITE for session '{}': {}", id, e);
            return Err(e);
        }
        Ok(id)
    }

    /// Accept an incoming call.
    ///
    /// Fails with `SessionNotFound` when the caller has already hung up.
    pub async fn answer(&self, id: &SessionId) -> SipLineResult<()> {
        self.connection.ensure_connected().await?;
        {
            let registry = self.registry.read().await;
            let session = registry
                .find(id)
                .ok_or_else(|| SipLineError::session_not_found(id))?;
            if session.state() != CallState::Initial {
                return Err(session.invalid_state("answer"));
            }
        }

        info!("Answering session '{}'", id);
        self.engine.accept(id).await?;

        let mut registry = self.registry.write().await;
        let session = registry
            .find_mut(id)
            .ok_or_else(|| SipLineError::session_not_found(id))?;
        // The answered event may already have been applied.
        if session.state() == CallState::Initial {
            session.advance(CallState::Establishing)?;
        }
        Ok(())
    }

    /// Refuse a call. Incoming calls not answered yet are rejected; any
    /// other call is ended.
    pub async fn decline(&self, id: &SessionId) -> SipLineResult<()> {
        self.connection.ensure_connected().await?;
        let ringing = {
            let registry = self.registry.read().await;
            let session = registry
                .find(id)
                .ok_or_else(|| SipLineError::session_not_found(id))?;
            session.direction() == CallDirection::Incoming && session.state() == CallState::Initial
        };

        info!("Declining session '{}'", id);
        if ringing {
            self.engine.reject(id).await
        } else {
            self.engine.hangup(id).await
        }
    }

    /// End a call. The session is terminated when the engine confirms.
    pub async fn hangup(&self, id: &SessionId) -> SipLineResult<()> {
        self.connection.ensure_connected().await?;
        if !self.registry.read().await.contains(id) {
            return Err(SipLineError::session_not_found(id));
        }

        info!("Hanging up session '{}'", id);
        self.engine.hangup(id).await
    }

    /// Send one DTMF tone on an established call
    pub async fn send_dtmf(&self, id: &SessionId, tone: char) -> SipLineResult<()> {
        let tone = tone.to_ascii_uppercase();
        if !DTMF_TONES.contains(tone) {
            return Err(SipLineError::InvalidInput(format!("invalid DTMF tone '{}'", tone)));
        }

        self.connection.ensure_connected().await?;
        {
            let registry = self.registry.read().await;
            let session = registry
                .find(id)
                .ok_or_else(|| SipLineError::session_not_found(id))?;
            if !session.state().is_established() {
                return Err(session.invalid_state("send DTMF on"));
            }
        }

        debug!("Sending DTMF '{}' on session '{}'", tone, id);
        self.engine.send_dtmf(id, tone, self.dtmf_mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bridge::delegate::ClientDelegate;
    use crate::core::connection::ReconnectPolicy;
    use crate::core::engine::{EngineEvent, EngineRequest, LoopbackEngine};
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Fixture {
        calls: CallControl,
        engine: Arc<LoopbackEngine>,
        registry: Arc<RwLock<SessionRegistry>>,
        connection: ConnectionController,
        _events: mpsc::UnboundedReceiver<EngineEvent>,
    }

    fn fixture(max_sessions: usize) -> Fixture {
        let (engine, events) = LoopbackEngine::new();
        let engine = Arc::new(engine);
        let connection = ConnectionController::new(
            engine.clone(),
            Arc::new(ClientDelegate::new()),
            ReconnectPolicy {
                attempts: 1,
                delay: Duration::from_secs(1),
            },
        );
        let registry = Arc::new(RwLock::new(SessionRegistry::new(max_sessions)));
        let media = MediaControl::new(engine.clone(), connection.clone(), registry.clone());
        let calls = CallControl::new(
            engine.clone(),
            connection.clone(),
            registry.clone(),
            media,
            InviteOptions::default(),
            DtmfMode::Info,
        );
        Fixture {
            calls,
            engine,
            registry,
            connection,
            _events: events,
        }
    }

    #[tokio::test]
    async fn test_call_creates_establishing_session() {
        let f = fixture(2);
        f.connection.connect().await.unwrap();

        let id = f.calls.call("sip:bob@example.com").await.unwrap();
        let registry = f.registry.read().await;
        let session = registry.find(&id).unwrap();
        assert_eq!(session.state(), CallState::Establishing);
        assert_eq!(session.direction(), CallDirection::Outgoing);
        assert_eq!(session.remote().uri, "sip:bob@example.com");
    }

    #[tokio::test]
    async fn test_commands_require_connection() {
        let f = fixture(2);
        let id = SessionId::from("s1");

        assert!(matches!(f.calls.call("sip:bob@example.com").await, Err(SipLineError::NotConnected)));
        assert!(matches!(f.calls.answer(&id).await, Err(SipLineError::NotConnected)));
        assert!(matches!(f.calls.decline(&id).await, Err(SipLineError::NotConnected)));
        assert!(matches!(f.calls.hangup(&id).await, Err(SipLineError::NotConnected)));
        assert!(matches!(f.calls.send_dtmf(&id, '1').await, Err(SipLineError::NotConnected)));
        assert!(f.registry.read().await.is_empty());
        assert!(f.engine.requests().is_empty());
    }

    #[tokio::test]
    async fn test_call_at_capacity() {
        let f = fixture(1);
        f.connection.connect().await.unwrap();
        f.calls.call("sip:bob@example.com").await.unwrap();

        let result = f.calls.call("sip:carol@example.com").await;
        assert!(matches!(result, Err(SipLineError::CapacityExceeded { max: 1 })));
        assert_eq!(f.registry.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_invite_releases_session() {
        let f = fixture(2);
        f.connection.connect().await.unwrap();
        f.engine.set_request_failure(true);

        assert!(f.calls.call("sip:bob@example.com").await.is_err());
        assert!(f.registry.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_answer_missing_session() {
        let f = fixture(2);
        f.connection.connect().await.unwrap();

        let result = f.calls.answer(&SessionId::from("s1")).await;
        assert!(matches!(result, Err(SipLineError::SessionNotFound { .. })));
    }

    #[tokio::test]
    async fn test_answer_moves_to_establishing() {
        let f = fixture(2);
        f.connection.connect().await.unwrap();
        f.engine.set_auto_confirm(false);
        f.registry
            .write()
            .await
            .add(Session::incoming(SessionId::from("s1"), RemoteIdentity::default()))
            .unwrap();

        f.calls.answer(&SessionId::from("s1")).await.unwrap();
        let registry = f.registry.read().await;
        assert_eq!(registry.find(&SessionId::from("s1")).unwrap().state(), CallState::Establishing);
    }

    #[tokio::test]
    async fn test_hangup_does_not_terminate_locally() {
        let f = fixture(2);
        f.connection.connect().await.unwrap();
        let id = f.calls.call("sip:bob@example.com").await.unwrap();

        f.calls.hangup(&id).await.unwrap();
        assert!(f.registry.read().await.contains(&id));
        assert!(f.engine.requests().contains(&EngineRequest::Hangup { id }));
    }

    #[tokio::test]
    async fn test_decline_ringing_call_rejects() {
        let f = fixture(2);
        f.connection.connect().await.unwrap();
        f.registry
            .write()
            .await
            .add(Session::incoming(SessionId::from("s1"), RemoteIdentity::default()))
            .unwrap();

        f.calls.decline(&SessionId::from("s1")).await.unwrap();
        assert!(f.engine.requests().contains(&EngineRequest::Reject {
            id: SessionId::from("s1")
        }));
    }

    #[tokio::test]
    async fn test_dtmf_validation() {
        let f = fixture(2);
        f.connection.connect().await.unwrap();
        let mut session = Session::incoming(SessionId::from("s1"), RemoteIdentity::default());
        session.advance(CallState::Established).unwrap();
        f.registry.write().await.add(session).unwrap();
        let id = SessionId::from("s1");

        assert!(matches!(f.calls.send_dtmf(&id, 'x').await, Err(SipLineError::InvalidInput(_))));
        f.calls.send_dtmf(&id, 'b').await.unwrap();
        f.calls.send_dtmf(&id, '#').await.unwrap();
        assert!(f.engine.requests().contains(&EngineRequest::Dtmf {
            id: id.clone(),
            tone: 'B',
            mode: DtmfMode::Info
        }));
    }

    #[tokio::test]
    async fn test_dtmf_requires_established_call() {
        let f = fixture(2);
        f.connection.connect().await.unwrap();
        let id = f.calls.call("sip:bob@example.com").await.unwrap();

        let result = f.calls.send_dtmf(&id, '5').await;
        assert!(matches!(result, Err(SipLineError::InvalidState { .. })));
    }
}
