use crate::core::bridge::delegate::{ClientDelegate, DisconnectReason};
use crate::core::engine::{RegisterOptions, SignalingEngine, UnregisterOptions};
use crate::core::session::ConnectionState;
use crate::domain::{
    config::ClientOptions,
    error::{SipLineError, SipLineResult},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Automatic reconnection settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts made after an unexpected transport loss
    pub attempts: u32,
    /// Wait between consecutive attempts; the first one is immediate
    pub delay: Duration,
}

impl From<&ClientOptions> for ReconnectPolicy {
    fn from(options: &ClientOptions) -> Self {
        Self {
            attempts: options.reconnection_attempts,
            delay: options.reconnection_delay,
        }
    }
}

struct ConnectionInner {
    state: ConnectionState,
    attempts_remaining: u32,
    /// Bumped by every manual connect/disconnect; stale reconnect loops stop
    generation: u64,
    /// Requested closes whose `Disconnected` event has not arrived yet
    pending_closes: u32,
    reconnecting: bool,
    /// Registration to restore after an automatic reconnect
    registration: Option<RegisterOptions>,
}

/// Owns the engine's transport lifecycle and registration.
#[derive(Clone)]
pub struct ConnectionController {
    engine: Arc<dyn SignalingEngine>,
    delegate: Arc<ClientDelegate>,
    policy: ReconnectPolicy,
    inner: Arc<RwLock<ConnectionInner>>,
}

impl ConnectionController {
    pub fn new(
        engine: Arc<dyn SignalingEngine>,
        delegate: Arc<ClientDelegate>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            engine,
            delegate,
            policy,
            inner: Arc::new(RwLock::new(ConnectionInner {
                state: ConnectionState::Disconnected,
                attempts_remaining: policy.attempts,
                generation: 0,
                pending_closes: 0,
                reconnecting: false,
                registration: None,
            })),
        }
    }

    /// Start the transport; resets the reconnection budget
    pub async fn connect(&self) -> SipLineResult<()> {
        let generation = {
            let mut inner = self.inner.write().await;
            inner.generation += 1;
            inner.attempts_remaining = self.policy.attempts;
            inner.reconnecting = false;
            inner.state = ConnectionState::Connecting;
            inner.generation
        };

        info!("Connecting transport");
        match self.engine.connect().await {
            Ok(()) => {
                let mut inner = self.inner.write().await;
                if inner.generation == generation && inner.state == ConnectionState::Connecting {
                    inner.state = ConnectionState::Connected;
                }
                info!("Transport connected");
                Ok(())
            }
            Err(e) => {
                let mut inner = self.inner.write().await;
                if inner.generation == generation {
                    inner.state = ConnectionState::Disconnected;
                }
                error!("Failed to connect transport: {}", e);
                Err(into_transport_error(e))
            }
        }
    }

    /// Stop the transport. No-op when already disconnected.
    pub async fn disconnect(&self) -> SipLineResult<()> {
        let was_registered = {
            let mut inner = self.inner.write().await;
            if inner.state == ConnectionState::Disconnected && !inner.reconnecting {
                debug!("Disconnect requested while already disconnected");
                return Ok(());
            }
            inner.generation += 1;
            inner.reconnecting = false;
            inner.pending_closes += 1;
            inner.registration = None;
            inner.state == ConnectionState::Registered
        };

        info!("Disconnecting transport");
        if was_registered {
            if let Err(e) = self.engine.unregister(&UnregisterOptions::default()).await {
                warn!("Failed to unregister before disconnect: {}", e);
            }
        }

        let result = self.engine.disconnect().await;
        let mut inner = self.inner.write().await;
        inner.state = ConnectionState::Disconnected;
        if result.is_err() {
            // The engine will not report a close it never performed.
            inner.pending_closes = inner.pending_closes.saturating_sub(1);
        }
        result.map_err(into_transport_error)
    }

    /// Send a REGISTER; resolves once sent, acceptance arrives as an event
    pub async fn register(&self, options: RegisterOptions) -> SipLineResult<()> {
        self.ensure_connected().await?;
        info!("Registering");
        self.engine.register(&options).await?;
        self.inner.write().await.registration = Some(options);
        Ok(())
    }

    /// Send an un-REGISTER; resolves once sent
    pub async fn unregister(&self, options: UnregisterOptions) -> SipLineResult<()> {
        self.ensure_connected().await?;
        info!("Unregistering");
        self.engine.unregister(&options).await?;
        self.inner.write().await.registration = None;
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.read().await.state.is_connected()
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.read().await.state
    }

    /// Whether an automatic reconnection loop is running
    pub async fn is_reconnecting(&self) -> bool {
        self.inner.read().await.reconnecting
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    pub(crate) async fn ensure_connected(&self) -> SipLineResult<()> {
        if self.is_connected().await {
            Ok(())
        } else {
            Err(SipLineError::NotConnected)
        }
    }

    /// Only a handshake still in progress is promoted; a late event never
    /// revives a transport that was closed since.
    pub(crate) async fn mark_connected(&self) {
        let mut inner = self.inner.write().await;
        if inner.state == ConnectionState::Connecting {
            inner.state = ConnectionState::Connected;
        }
    }

    pub(crate) async fn mark_registered(&self) {
        let mut inner = self.inner.write().await;
        if inner.state.is_connected() {
            inner.state = ConnectionState::Registered;
        } else {
            warn!("Registration confirmed while {}", inner.state);
        }
    }

    pub(crate) async fn mark_unregistered(&self) {
        let mut inner = self.inner.write().await;
        if inner.state == ConnectionState::Registered {
            inner.state = ConnectionState::Connected;
        }
    }

    /// React to the engine closing the transport.
    ///
    /// Each requested close is matched with one close event and reported
    /// straight away, leaving the state to whatever `connect` set since.
    /// An unexpected loss starts the reconnection loop and is only reported
    /// once the attempts are used up.
    pub(crate) async fn handle_transport_closed(&self, error: Option<String>) {
        let mut inner = self.inner.write().await;
        if inner.pending_closes > 0 {
            inner.pending_closes -= 1;
            drop(inner);
            info!("Transport disconnected");
            self.delegate.server_disconnect(&DisconnectReason::Requested);
            return;
        }

        let previous = inner.state;
        inner.state = ConnectionState::Disconnected;

        if inner.reconnecting || previous == ConnectionState::Disconnected {
            debug!("Ignoring transport close while {}", previous);
            return;
        }

        let error = error.unwrap_or_else(|| "transport closed by peer".to_string());
        warn!("Transport lost: {}", error);

        if self.policy.attempts == 0 {
            drop(inner);
            self.give_up(error);
            return;
        }

        inner.reconnecting = true;
        let generation = inner.generation;
        drop(inner);

        let controller = self.clone();
        tokio::spawn(async move {
            controller.reconnect_loop(generation, error).await;
        });
    }

    async fn reconnect_loop(&self, generation: u64, mut last_error: String) {
        loop {
            let attempt = {
                let mut inner = self.inner.write().await;
                if inner.generation != generation {
                    debug!("Reconnection loop superseded");
                    return;
                }
                if inner.attempts_remaining == 0 {
                    inner.reconnecting = false;
                    drop(inner);
                    self.give_up(last_error);
                    return;
                }
                inner.attempts_remaining -= 1;
                self.policy.attempts - inner.attempts_remaining
            };

            if attempt > 1 {
                tokio::time::sleep(self.policy.delay).await;
            }

            {
                let mut inner = self.inner.write().await;
                if inner.generation != generation {
                    debug!("Reconnection loop superseded");
                    return;
                }
                inner.state = ConnectionState::Connecting;
            }

            info!("Reconnection attempt {}/{}", attempt, self.policy.attempts);
            match self.engine.connect().await {
                Ok(()) => {
                    let registration = {
                        let mut inner = self.inner.write().await;
                        if inner.generation != generation {
                            return;
                        }
                        if inner.state == ConnectionState::Connecting {
                            inner.state = ConnectionState::Connected;
                        }
                        inner.reconnecting = false;
                        inner.attempts_remaining = self.policy.attempts;
                        inner.registration.clone()
                    };
                    info!("Transport reconnected");

                    if let Some(options) = registration {
                        if let Err(e) = self.engine.register(&options).await {
                            warn!("Failed to restore registration after reconnect: {}", e);
                        }
                    }
                    return;
                }
                Err(e) => {
                    let mut inner = self.inner.write().await;
                    if inner.generation == generation {
                        inner.state = ConnectionState::Disconnected;
                    }
                    warn!("Reconnection attempt {}/{} failed: {}", attempt, self.policy.attempts, e);
                    last_error = e.to_string();
                }
            }
        }
    }

    fn give_up(&self, error: String) {
        error!(
            "Giving up on transport after {} reconnection attempt(s)",
            self.policy.attempts
        );
        self.delegate.server_disconnect(&DisconnectReason::ReconnectExhausted {
            attempts: self.policy.attempts,
            error,
        });
    }
}

fn into_transport_error(error: SipLineError) -> SipLineError {
    match error {
        SipLineError::Transport { .. } => error,
        other => SipLineError::transport(other.to_string()),
    }
}
