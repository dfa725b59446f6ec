use crate::core::{
    bridge::{ClientDelegate, EventBridge},
    call::CallControl,
    connection::{ConnectionController, ReconnectPolicy},
    engine::{
        DtmfMode, EngineEvent, InviteOptions, LoopbackEngine, RegisterOptions, SignalingEngine,
        UnregisterOptions,
    },
    media::MediaControl,
    messaging::MessagingChannel,
    session::{CallDirection, CallState, ConnectionState, Session, SessionId, SessionRegistry},
};
use crate::domain::{
    config::ClientOptions,
    error::{SipLineError, SipLineResult},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::info;

/// Flattened view of a session for listings
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub direction: CallDirection,
    pub remote: String,
    pub state: CallState,
    pub held: bool,
    pub muted: bool,
    pub created_at: std::time::SystemTime,
    pub talk_time: std::time::Duration,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id().to_string(),
            direction: session.direction(),
            remote: session.remote().to_string(),
            state: session.state(),
            held: session.is_held(),
            muted: session.is_muted(),
            created_at: session.created_at(),
            talk_time: session.talk_time(),
        }
    }
}

/// The object an application holds: one signaling engine, the sessions it
/// carries and the callbacks that report on them.
///
/// Session commands are keyed by [`SessionId`]. Engine events are applied
/// by a background task started in [`CallClient::new`], so the client must
/// be created inside a Tokio runtime.
pub struct CallClient {
    options: ClientOptions,
    registry: Arc<RwLock<SessionRegistry>>,
    connection: ConnectionController,
    calls: CallControl,
    media: MediaControl,
    messaging: MessagingChannel,
    bridge_task: JoinHandle<()>,
}

impl CallClient {
    /// Wire a client around `engine` and start applying its `events`
    pub fn new(
        options: ClientOptions,
        engine: Arc<dyn SignalingEngine>,
        events: mpsc::UnboundedReceiver<EngineEvent>,
        delegate: ClientDelegate,
    ) -> SipLineResult<Self> {
        if options.max_sessions == 0 {
            return Err(SipLineError::Config {
                message: "max_sessions must be at least 1".to_string(),
            });
        }

        let delegate = Arc::new(delegate);
        let registry = Arc::new(RwLock::new(SessionRegistry::new(options.max_sessions)));
        let connection = ConnectionController::new(
            engine.clone(),
            delegate.clone(),
            ReconnectPolicy::from(&options),
        );
        let media = MediaControl::new(engine.clone(), connection.clone(), registry.clone());
        let dtmf_mode = if options.send_dtmf_using_session_description_handler {
            DtmfMode::InBand
        } else {
            DtmfMode::Info
        };
        let invite_options = InviteOptions {
            audio: options.audio,
            video: options.video,
            extra_headers: Vec::new(),
        };
        let calls = CallControl::new(
            engine.clone(),
            connection.clone(),
            registry.clone(),
            media.clone(),
            invite_options,
            dtmf_mode,
        );
        let messaging = MessagingChannel::new(engine.clone(), connection.clone());
        let bridge_task =
            EventBridge::new(engine, connection.clone(), registry.clone(), delegate).spawn(events);

        info!(
            "Client '{}' ready for {} (max {} session(s))",
            options.id(),
            options.server_url,
            options.max_sessions
        );

        Ok(Self {
            options,
            registry,
            connection,
            calls,
            media,
            messaging,
            bridge_task,
        })
    }

    /// Client backed by an in-process [`LoopbackEngine`]
    pub fn with_loopback(
        options: ClientOptions,
        delegate: ClientDelegate,
    ) -> SipLineResult<(Self, Arc<LoopbackEngine>)> {
        let (engine, events) = LoopbackEngine::new();
        let engine = Arc::new(engine);
        let client = Self::new(options, engine.clone(), events, delegate)?;
        Ok((client, engine))
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    // Connection

    pub async fn connect(&self) -> SipLineResult<()> {
        self.connection.connect().await
    }

    pub async fn disconnect(&self) -> SipLineResult<()> {
        self.connection.disconnect().await
    }

    /// Register the configured AOR for the configured expiry
    pub async fn register(&self) -> SipLineResult<()> {
        self.connection
            .register(RegisterOptions {
                expires: Some(self.options.register_expires_secs),
                extra_headers: Vec::new(),
            })
            .await
    }

    pub async fn register_with(&self, options: RegisterOptions) -> SipLineResult<()> {
        self.connection.register(options).await
    }

    pub async fn unregister(&self) -> SipLineResult<()> {
        self.connection.unregister(UnregisterOptions::default()).await
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.connection.state().await
    }

    // Calls

    pub async fn call(&self, destination: &str) -> SipLineResult<SessionId> {
        self.calls.call(destination).await
    }

    pub async fn call_with(&self, destination: &str, options: InviteOptions) -> SipLineResult<SessionId> {
        self.calls.call_with(destination, options).await
    }

    pub async fn answer(&self, id: &SessionId) -> SipLineResult<()> {
        self.calls.answer(id).await
    }

    pub async fn decline(&self, id: &SessionId) -> SipLineResult<()> {
        self.calls.decline(id).await
    }

    pub async fn hangup(&self, id: &SessionId) -> SipLineResult<()> {
        self.calls.hangup(id).await
    }

    pub async fn send_dtmf(&self, id: &SessionId, tone: char) -> SipLineResult<()> {
        self.calls.send_dtmf(id, tone).await
    }

    // Media

    pub async fn hold(&self, id: &SessionId) -> SipLineResult<()> {
        self.media.hold(id).await
    }

    pub async fn unhold(&self, id: &SessionId) -> SipLineResult<()> {
        self.media.unhold(id).await
    }

    pub async fn hold_all(&self) -> Vec<SessionId> {
        self.media.hold_all().await
    }

    pub async fn mute(&self, id: &SessionId) -> SipLineResult<bool> {
        self.media.mute(id).await
    }

    pub async fn unmute(&self, id: &SessionId) -> SipLineResult<bool> {
        self.media.unmute(id).await
    }

    pub async fn is_held(&self, id: &SessionId) -> bool {
        self.media.is_held(id).await
    }

    pub async fn is_muted(&self, id: &SessionId) -> bool {
        self.media.is_muted(id).await
    }

    // Messaging

    pub async fn message(&self, destination: &str, body: &str) -> SipLineResult<()> {
        self.messaging.send(destination, body).await
    }

    // Registry queries

    pub async fn session(&self, id: &SessionId) -> Option<Session> {
        self.registry.read().await.find(id).cloned()
    }

    /// Snapshot of every tracked session, in creation order
    pub async fn sessions(&self) -> Vec<Session> {
        self.registry.read().await.iter().cloned().collect()
    }

    pub async fn sessions_in_state(&self, state: CallState) -> Vec<Session> {
        self.registry.read().await.filter_by_state(state).cloned().collect()
    }

    /// Incoming calls still ringing
    pub async fn incoming_sessions(&self) -> Vec<Session> {
        self.registry.read().await.incoming().cloned().collect()
    }

    pub async fn summaries(&self) -> Vec<SessionSummary> {
        self.registry.read().await.iter().map(SessionSummary::from).collect()
    }

    pub async fn session_count(&self) -> usize {
        self.registry.read().await.len()
    }
}

impl Drop for CallClient {
    fn drop(&mut self) {
        self.bridge_task.abort();
    }
}

impl std::fmt::Debug for CallClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallClient")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
