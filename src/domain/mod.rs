// Domain module - Configuration and error types shared across layers
pub mod config;
pub mod error;
