use crate::core::connection::ConnectionController;
use crate::core::engine::SignalingEngine;
use crate::core::session::{SessionId, SessionRegistry};
use crate::domain::error::{SipLineError, SipLineResult};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Hold/unhold (renegotiated with the remote party) and mute/unmute
/// (local outgoing tracks only).
#[derive(Clone)]
pub struct MediaControl {
    engine: Arc<dyn SignalingEngine>,
    connection: ConnectionController,
    registry: Arc<RwLock<SessionRegistry>>,
}

impl MediaControl {
    pub fn new(
        engine: Arc<dyn SignalingEngine>,
        connection: ConnectionController,
        registry: Arc<RwLock<SessionRegistry>>,
    ) -> Self {
        Self {
            engine,
            connection,
            registry,
        }
    }

    /// Ask the remote party to put the call on hold.
    ///
    /// Resolves once the re-INVITE is sent; the session's hold flag changes
    /// when the engine reports the outcome.
    pub async fn hold(&self, id: &SessionId) -> SipLineResult<()> {
        self.request_hold(id, true).await
    }

    /// Ask the remote party to resume the call
    pub async fn unhold(&self, id: &SessionId) -> SipLineResult<()> {
        self.request_hold(id, false).await
    }

    /// Disable outgoing media.
    ///
    /// Nothing is signaled, but the transport must be up. Returns `false`
    /// when the session has no media yet and nothing changed.
    pub async fn mute(&self, id: &SessionId) -> SipLineResult<bool> {
        self.set_muted(id, true).await
    }

    /// Enable outgoing media
    pub async fn unmute(&self, id: &SessionId) -> SipLineResult<bool> {
        self.set_muted(id, false).await
    }

    /// Confirmed hold state; `false` for unknown sessions
    pub async fn is_held(&self, id: &SessionId) -> bool {
        self.registry
            .read()
            .await
            .find(id)
            .map(|s| s.is_held())
            .unwrap_or(false)
    }

    /// Mute state; `false` for unknown sessions
    pub async fn is_muted(&self, id: &SessionId) -> bool {
        self.registry
            .read()
            .await
            .find(id)
            .map(|s| s.is_muted())
            .unwrap_or(false)
    }

    /// Put every established call that is not already held (or being held)
    /// on hold, in registry order. Returns the sessions a request was sent for.
    pub async fn hold_all(&self) -> Vec<SessionId> {
        let candidates: Vec<SessionId> = {
            let registry = self.registry.read().await;
            registry
                .established()
                .filter(|s| !s.is_held() && !s.has_pending_hold())
                .map(|s| s.id().clone())
                .collect()
        };

        let mut requested = Vec::with_capacity(candidates.len());
        for id in candidates {
            match self.hold(&id).await {
                Ok(()) => requested.push(id),
                Err(e) => warn!("Failed to hold session '{}': {}", id, e),
            }
        }
        requested
    }

    async fn request_hold(&self, id: &SessionId, hold: bool) -> SipLineResult<()> {
        let operation = if hold { "hold" } else { "unhold" };
        self.connection.ensure_connected().await?;

        {
            let mut registry = self.registry.write().await;
            let session = registry
                .find_mut(id)
                .ok_or_else(|| SipLineError::session_not_found(id))?;
            if !session.state().is_established() {
                return Err(session.invalid_state(operation));
            }
            session.begin_hold_request();
        }

        info!("Sending {} for session '{}'", operation, id);
        if let Err(e) = self.engine.set_hold(id, hold).await {
            if let Some(session) = self.registry.write().await.find_mut(id) {
                session.cancel_hold_request();
            }
            warn!("Failed to send {} for session '{}': {}", operation, id, e);
            return Err(e);
        }
        Ok(())
    }

    async fn set_muted(&self, id: &SessionId, muted: bool) -> SipLineResult<bool> {
        self.connection.ensure_connected().await?;
        let mut registry = self.registry.write().await;
        let session = registry
            .find_mut(id)
            .ok_or_else(|| SipLineError::session_not_found(id))?;

        if !self.engine.set_local_media_enabled(id, !muted) {
            debug!("Session '{}' has no local media yet; mute state unchanged", id);
            return Ok(false);
        }

        session.set_muted(muted);
        info!("Session '{}' {}", id, if muted { "muted" } else { "unmuted" });
        Ok(true)
    }
}
