use crate::core::connection::ConnectionController;
use crate::core::engine::SignalingEngine;
use crate::domain::error::{SipLineError, SipLineResult};
use std::sync::Arc;
use tracing::debug;

/// Out-of-dialog text messages. Inbound messages arrive through the
/// delegate's `on_message_received` slot.
#[derive(Clone)]
pub struct MessagingChannel {
    engine: Arc<dyn SignalingEngine>,
    connection: ConnectionController,
}

impl MessagingChannel {
    pub fn new(engine: Arc<dyn SignalingEngine>, connection: ConnectionController) -> Self {
        Self { engine, connection }
    }

    /// Send `body` to `destination`; resolves once the engine has sent it
    pub async fn send(&self, destination: &str, body: &str) -> SipLineResult<()> {
        self.connection.ensure_connected().await?;
        if destination.trim().is_empty() {
            return Err(SipLineError::InvalidInput(
                "message destination must not be empty".to_string(),
            ));
        }

        debug!("Sending {} byte message to {}", body.len(), destination);
        self.engine.send_message(destination, body).await
    }
}
