use thiserror::Error;

/// SipLine unified error type
#[derive(Error, Debug)]
pub enum SipLineError {
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Not connected")]
    NotConnected,

    #[error("Session '{id}' not found")]
    SessionNotFound { id: String },

    #[error("Maximum number of sessions ({max}) reached")]
    CapacityExceeded { max: usize },

    #[error("Session '{id}' already exists")]
    DuplicateSession { id: String },

    #[error("Cannot {operation} session '{id}' in state {state}")]
    InvalidState {
        id: String,
        state: String,
        operation: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Engine error: {message}")]
    Engine { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output error: {0}")]
    Output(String),
}

impl SipLineError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn session_not_found(id: impl std::fmt::Display) -> Self {
        Self::SessionNotFound { id: id.to_string() }
    }

    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }
}

pub type SipLineResult<T> = Result<T, SipLineError>;
