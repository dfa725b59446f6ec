// Messaging module - Out-of-dialog text messages
pub mod channel;

pub use channel::MessagingChannel;
