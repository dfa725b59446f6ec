//! SipLine Library
//!
//! Call session orchestration over a SIP signaling engine: connection and
//! registration lifecycle, a bounded registry of concurrent calls, hold and
//! mute control, and application callbacks driven by engine events.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use core::bridge::{ClientDelegate, DisconnectReason};
pub use core::engine::{EngineEvent, LoopbackEngine, SignalingEngine};
pub use core::session::{CallState, ConnectionState, Session, SessionId};
pub use core::CallClient;
pub use domain::config::{ClientOptions, SipLineConfig};
pub use domain::error::{SipLineError, SipLineResult};
