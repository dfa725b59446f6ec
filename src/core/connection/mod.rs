// Connection module - Transport lifecycle and registration
pub mod controller;

pub use controller::{ConnectionController, ReconnectPolicy};
