use crate::core::bridge::delegate::{ClientDelegate, DtmfReceived, InboundMessage};
use crate::core::connection::ConnectionController;
use crate::core::engine::{EngineEvent, SignalingEngine};
use crate::core::session::{CallState, HoldOutcome, RemoteIdentity, Session, SessionId, SessionRegistry};
use crate::domain::error::{SipLineError, SipLineResult};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Applies engine events to the registry and connection state, then
/// notifies the application.
///
/// Events are handled one at a time, in arrival order. Local state is
/// always updated before the matching callback runs, and callbacks never
/// run with the registry locked.
#[derive(Clone)]
pub struct EventBridge {
    engine: Arc<dyn SignalingEngine>,
    connection: ConnectionController,
    registry: Arc<RwLock<SessionRegistry>>,
    delegate: Arc<ClientDelegate>,
}

impl EventBridge {
    pub fn new(
        engine: Arc<dyn SignalingEngine>,
        connection: ConnectionController,
        registry: Arc<RwLock<SessionRegistry>>,
        delegate: Arc<ClientDelegate>,
    ) -> Self {
        Self {
            engine,
            connection,
            registry,
            delegate,
        }
    }

    /// Drain `events` on a background task until the engine drops its sender
    pub fn spawn(self, mut events: mpsc::UnboundedReceiver<EngineEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let name = event.name();
                if let Err(e) = self.handle_event(event).await {
                    warn!("Engine event {} not applied: {}", name, e);
                }
            }
            debug!("Engine event stream closed");
        })
    }

    /// Apply one engine event
    pub async fn handle_event(&self, event: EngineEvent) -> SipLineResult<()> {
        debug!("Engine event: {}", event.name());
        match event {
            EngineEvent::Connected => {
                self.connection.mark_connected().await;
                self.delegate.server_connect();
            }
            EngineEvent::Disconnected { error } => {
                self.connection.handle_transport_closed(error).await;
            }
            EngineEvent::Registered => {
                self.connection.mark_registered().await;
                info!("Registered");
                self.delegate.registered();
            }
            EngineEvent::Unregistered => {
                self.connection.mark_unregistered().await;
                info!("Unregistered");
                self.delegate.unregistered();
            }
            EngineEvent::RegistrationFailed { reason } => {
                warn!("Registration failed: {}", reason);
                self.delegate.registration_failed(&reason);
            }
            EngineEvent::CallCreated { id } => {
                if let Some(session) = self.snapshot(&id).await {
                    self.delegate.call_created(&session);
                }
            }
            EngineEvent::CallReceived { id, remote } => self.on_call_received(id, remote).await?,
            EngineEvent::CallAnswered { id } => self.on_call_answered(id).await?,
            EngineEvent::CallHangup { id } => self.on_call_hangup(id).await,
            EngineEvent::HoldChanged { id, held } => self.on_hold_changed(id, held).await,
            EngineEvent::DtmfReceived { id, tone, duration } => {
                if let Some(session) = self.snapshot(&id).await {
                    self.delegate.call_dtmf_received(&DtmfReceived {
                        session,
                        tone,
                        duration,
                    });
                }
            }
            EngineEvent::MessageReceived { from, body } => {
                self.delegate.message_received(&InboundMessage { from, body });
            }
        }
        Ok(())
    }

    async fn on_call_received(&self, id: SessionId, remote: RemoteIdentity) -> SipLineResult<()> {
        let added = self
            .registry
            .write()
            .await
            .add(Session::incoming(id.clone(), remote))
            .cloned();

        match added {
            Ok(session) => {
                info!("Incoming call from {} (session '{}')", session.remote(), id);
                self.delegate.call_received(&session);
                Ok(())
            }
            Err(e @ SipLineError::CapacityExceeded { .. }) => {
                warn!("Rejecting incoming call '{}': {}", id, e);
                if let Err(reject) = self.engine.reject(&id).await {
                    error!("Failed to reject incoming call '{}': {}", id, reject);
                }
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn on_call_answered(&self, id: SessionId) -> SipLineResult<()> {
        let session = {
            let mut registry = self.registry.write().await;
            let Some(session) = registry.find_mut(&id) else {
                debug!("Answer for unknown session '{}'", id);
                return Ok(());
            };
            if session.state() != CallState::Established {
                session.advance(CallState::Established)?;
            }
            session.clone()
        };

        info!("Call '{}' established", id);
        self.delegate.call_answered(&session);
        Ok(())
    }

    async fn on_call_hangup(&self, id: SessionId) {
        let removed = self.registry.write().await.remove(&id);
        let Some(mut session) = removed else {
            debug!("Hangup for unknown session '{}'", id);
            return;
        };

        // Terminated is reachable from every live state.
        let _ = session.advance(CallState::Terminated);
        info!("Call '{}' terminated", id);
        self.delegate.call_hangup(&session);
    }

    async fn on_hold_changed(&self, id: SessionId, held: bool) {
        let session = {
            let mut registry = self.registry.write().await;
            let Some(session) = registry.find_mut(&id) else {
                debug!("Hold change for unknown session '{}'", id);
                return;
            };
            match session.apply_hold_confirmation(held) {
                HoldOutcome::Applied => session.clone(),
                HoldOutcome::Superseded => {
                    debug!("Ignoring superseded hold confirmation for session '{}'", id);
                    return;
                }
            }
        };

        info!("Call '{}' {}", id, if held { "held" } else { "resumed" });
        self.delegate.call_hold(&session);
    }

    async fn snapshot(&self, id: &SessionId) -> Option<Session> {
        let session = self.registry.read().await.find(id).cloned();
        if session.is_none() {
            debug!("Event for unknown session '{}'", id);
        }
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connection::ReconnectPolicy;
    use crate::core::engine::{EngineRequest, LoopbackEngine};
    use crate::core::session::ConnectionState;
    use std::sync::Mutex;
    use std::time::Duration;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Fixture {
        bridge: EventBridge,
        engine: Arc<LoopbackEngine>,
        registry: Arc<RwLock<SessionRegistry>>,
        connection: ConnectionController,
        log: Log,
        _events: mpsc::UnboundedReceiver<EngineEvent>,
    }

    fn push(log: &Log, entry: &'static str) -> impl Fn(&Session) + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |s: &Session| log.lock().unwrap().push(format!("{}:{}:{}", entry, s.id(), s.state()))
    }

    fn recording_delegate(log: &Log) -> ClientDelegate {
        let connected = Arc::clone(log);
        let registered = Arc::clone(log);
        let messages = Arc::clone(log);
        let dtmf = Arc::clone(log);
        ClientDelegate::new()
            .on_server_connect(move || connected.lock().unwrap().push("connect".to_string()))
            .on_registered(move || registered.lock().unwrap().push("registered".to_string()))
            .on_call_created(push(log, "created"))
            .on_call_received(push(log, "received"))
            .on_call_answered(push(log, "answered"))
            .on_call_hangup(push(log, "hangup"))
            .on_call_hold(push(log, "hold"))
            .on_call_dtmf_received(move |e| dtmf.lock().unwrap().push(format!("dtmf:{}", e.tone)))
            .on_message_received(move |m| messages.lock().unwrap().push(format!("message:{}", m.body)))
    }

    fn fixture(max_sessions: usize) -> Fixture {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let delegate = Arc::new(recording_delegate(&log));
        let (engine, events) = LoopbackEngine::new();
        let engine = Arc::new(engine);
        let connection = ConnectionController::new(
            engine.clone(),
            delegate.clone(),
            ReconnectPolicy {
                attempts: 1,
                delay: Duration::from_secs(1),
            },
        );
        let registry = Arc::new(RwLock::new(SessionRegistry::new(max_sessions)));
        let bridge = EventBridge::new(engine.clone(), connection.clone(), registry.clone(), delegate);
        Fixture {
            bridge,
            engine,
            registry,
            connection,
            log,
            _events: events,
        }
    }

    fn ring(id: &str) -> EngineEvent {
        EngineEvent::CallReceived {
            id: SessionId::from(id),
            remote: RemoteIdentity::new("sip:alice@example.com", "Alice"),
        }
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_incoming_call_lifecycle() {
        let f = fixture(1);
        let id = SessionId::from("s1");

        f.bridge.handle_event(ring("s1")).await.unwrap();
        f.bridge
            .handle_event(EngineEvent::CallAnswered { id: id.clone() })
            .await
            .unwrap();
        f.bridge
            .handle_event(EngineEvent::CallHangup { id: id.clone() })
            .await
            .unwrap();

        assert_eq!(
            entries(&f.log),
            vec!["received:s1:Initial", "answered:s1:Established", "hangup:s1:Terminated"]
        );
        assert!(f.registry.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_second_hangup_is_noop() {
        let f = fixture(1);
        f.bridge.handle_event(ring("s1")).await.unwrap();

        let hangup = EngineEvent::CallHangup {
            id: SessionId::from("s1"),
        };
        f.bridge.handle_event(hangup.clone()).await.unwrap();
        f.bridge.handle_event(hangup).await.unwrap();

        let hangups = entries(&f.log).iter().filter(|e| e.starts_with("hangup")).count();
        assert_eq!(hangups, 1);
    }

    #[tokio::test]
    async fn test_incoming_call_over_capacity_is_rejected() {
        let f = fixture(1);
        f.bridge.handle_event(ring("s1")).await.unwrap();

        let result = f.bridge.handle_event(ring("s2")).await;
        assert!(matches!(result, Err(SipLineError::CapacityExceeded { max: 1 })));
        assert_eq!(f.registry.read().await.ids(), vec![SessionId::from("s1")]);
        assert!(f.engine.requests().contains(&EngineRequest::Reject {
            id: SessionId::from("s2")
        }));
        assert_eq!(entries(&f.log), vec!["received:s1:Initial"]);
    }

    #[tokio::test]
    async fn test_superseded_hold_confirmation_is_silent() {
        let f = fixture(1);
        let id = SessionId::from("s1");
        f.bridge.handle_event(ring("s1")).await.unwrap();
        f.bridge
            .handle_event(EngineEvent::CallAnswered { id: id.clone() })
            .await
            .unwrap();
        {
            let mut registry = f.registry.write().await;
            let session = registry.find_mut(&id).unwrap();
            session.begin_hold_request();
            session.begin_hold_request();
        }

        f.bridge
            .handle_event(EngineEvent::HoldChanged {
                id: id.clone(),
                held: true,
            })
            .await
            .unwrap();
        assert!(!f.registry.read().await.find(&id).unwrap().is_held());

        f.bridge
            .handle_event(EngineEvent::HoldChanged {
                id: id.clone(),
                held: false,
            })
            .await
            .unwrap();

        let holds: Vec<String> = entries(&f.log).into_iter().filter(|e| e.starts_with("hold")).collect();
        assert_eq!(holds, vec!["hold:s1:Established"]);
        assert!(!f.registry.read().await.find(&id).unwrap().is_held());
    }

    #[tokio::test]
    async fn test_events_for_unknown_sessions_are_ignored() {
        let f = fixture(1);
        let id = SessionId::from("ghost");

        f.bridge
            .handle_event(EngineEvent::CallCreated { id: id.clone() })
            .await
            .unwrap();
        f.bridge
            .handle_event(EngineEvent::CallAnswered { id: id.clone() })
            .await
            .unwrap();
        f.bridge
            .handle_event(EngineEvent::HoldChanged {
                id: id.clone(),
                held: true,
            })
            .await
            .unwrap();
        f.bridge
            .handle_event(EngineEvent::DtmfReceived {
                id,
                tone: '5',
                duration: Duration::from_millis(100),
            })
            .await
            .unwrap();

        assert!(entries(&f.log).is_empty());
    }

    #[tokio::test]
    async fn test_connection_events_update_state_first() {
        let f = fixture(1);
        f.connection.connect().await.unwrap();

        f.bridge.handle_event(EngineEvent::Connected).await.unwrap();
        f.bridge.handle_event(EngineEvent::Registered).await.unwrap();

        assert_eq!(f.connection.state().await, ConnectionState::Registered);
        assert_eq!(entries(&f.log), vec!["connect", "registered"]);
    }

    #[tokio::test]
    async fn test_dtmf_and_messages_forwarded() {
        let f = fixture(1);
        f.bridge.handle_event(ring("s1")).await.unwrap();

        f.bridge
            .handle_event(EngineEvent::DtmfReceived {
                id: SessionId::from("s1"),
                tone: '#',
                duration: Duration::from_millis(250),
            })
            .await
            .unwrap();
        f.bridge
            .handle_event(EngineEvent::MessageReceived {
                from: "sip:alice@example.com".to_string(),
                body: "{\"cmd\":\"ping\"}".to_string(),
            })
            .await
            .unwrap();

        let log = entries(&f.log);
        assert_eq!(log[1], "dtmf:#");
        assert_eq!(log[2], "message:{\"cmd\":\"ping\"}");
    }

    #[tokio::test]
    async fn test_spawned_bridge_drains_events() {
        let f = fixture(1);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = f.bridge.clone().spawn(rx);

        tx.send(ring("s1")).unwrap();
        tx.send(EngineEvent::CallHangup {
            id: SessionId::from("s1"),
        })
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(entries(&f.log), vec!["received:s1:Initial", "hangup:s1:Terminated"]);
    }
}
