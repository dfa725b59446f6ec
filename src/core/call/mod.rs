// Call module - Call commands driving the session state machine
pub mod control;

pub use control::{CallControl, DTMF_TONES};
