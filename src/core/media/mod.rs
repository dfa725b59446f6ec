// Media module - Hold and mute control
pub mod control;

pub use control::MediaControl;
