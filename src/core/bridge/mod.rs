// Bridge module - Engine events into registry state and application callbacks
pub mod bridge;
pub mod delegate;

pub use bridge::EventBridge;
pub use delegate::{ClientDelegate, DisconnectReason, DtmfReceived, InboundMessage};
