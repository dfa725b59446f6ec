// Engine module - Signaling engine boundary
pub mod engine;
pub mod event;
pub mod loopback;

pub use engine::{DtmfMode, InviteOptions, RegisterOptions, SignalingEngine, UnregisterOptions};
pub use event::EngineEvent;
pub use loopback::{EngineRequest, LoopbackEngine};
