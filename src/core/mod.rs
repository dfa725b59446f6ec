// Core module - Call session orchestration over a signaling engine
pub mod bridge;
pub mod call;
pub mod client;
pub mod connection;
pub mod engine;
pub mod media;
pub mod messaging;
pub mod session;

pub use client::{CallClient, SessionSummary};
