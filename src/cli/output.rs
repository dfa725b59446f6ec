use crate::cli::args::OutputFormat;
use crate::cli::envelope::AgentEnvelope;
use crate::core::SessionSummary;
use crate::domain::config::SipLineConfig;
use serde::Serialize;
use std::io;
use tabled::{Table, Tabled};

/// One client event observed during a demo run
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub event: String,
    pub detail: String,
}

impl EventRecord {
    pub fn new(event: &str, detail: impl Into<String>) -> Self {
        Self {
            event: event.to_string(),
            detail: detail.into(),
        }
    }
}

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_sessions(&self, sessions: &[SessionSummary]) -> Result<(), OutputError>;
    fn write_events(&self, events: &[EventRecord]) -> Result<(), OutputError>;
    fn write_config(&self, config: &SipLineConfig) -> Result<(), OutputError>;
    fn write_envelope(&self, envelope: &AgentEnvelope) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::SipLineError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_sessions(&self, sessions: &[SessionSummary]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                if sessions.is_empty() {
                    println!("No active sessions");
                }
                for session in sessions {
                    println!("Session: {} ({})", session.session_id, session.direction);
                    println!("  Remote: {}", session.remote);
                    println!("  State: {}", session.state);
                    println!("  Held: {}  Muted: {}", session.held, session.muted);
                    println!("  Talk time: {}s", session.talk_time.as_secs());
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(sessions)?);
            }
            OutputFormat::Table => {
                if !sessions.is_empty() {
                    let rows: Vec<SessionTableRow> = sessions.iter().map(SessionTableRow::from).collect();
                    println!("{}", Table::new(rows));
                }
            }
            OutputFormat::Csv => {
                println!("id,direction,remote,state,held,muted");
                for session in sessions {
                    println!(
                        "{},{},{},{},{},{}",
                        session.session_id,
                        session.direction,
                        csv_field(&session.remote),
                        session.state,
                        session.held,
                        session.muted
                    );
                }
            }
        }
        Ok(())
    }

    fn write_events(&self, events: &[EventRecord]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                for event in events {
                    println!("[{}] {}", event.event, event.detail);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(events)?);
            }
            OutputFormat::Table => {
                if !events.is_empty() {
                    let rows: Vec<EventTableRow> = events.iter().map(EventTableRow::from).collect();
                    println!("{}", Table::new(rows));
                }
            }
            OutputFormat::Csv => {
                println!("event,detail");
                for event in events {
                    println!("{},{}", event.event, csv_field(&event.detail));
                }
            }
        }
        Ok(())
    }

    fn write_config(&self, config: &SipLineConfig) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("SipLine Configuration:");
                println!("  Log level: {}", config.global.log_level);
                println!("  Max sessions: {}", config.global.max_sessions);
                println!("  Server: {}", config.connection.server_url);
                println!(
                    "  AOR: {}",
                    config.connection.aor.as_deref().unwrap_or("(anonymous)")
                );
                println!(
                    "  Reconnection: {} attempt(s), {}s apart",
                    config.connection.reconnection_attempts, config.connection.reconnection_delay_secs
                );
                println!(
                    "  Media: audio={} video={} in-band DTMF={}",
                    config.media.audio,
                    config.media.video,
                    config.media.send_dtmf_using_session_description_handler
                );
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(config)?);
            }
            OutputFormat::Table => {
                println!("{}", Table::new(config_rows(config)));
            }
            OutputFormat::Csv => {
                println!("key,value");
                for row in config_rows(config) {
                    println!("{},{}", row.key, csv_field(&row.value));
                }
            }
        }
        Ok(())
    }

    fn write_envelope(&self, envelope: &AgentEnvelope) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(envelope)?);
            }
            _ => {
                println!("{}", serde_json::to_string(envelope)?);
            }
        }
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "error": error,
                    "level": "error"
                });
                eprintln!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                eprintln!("Error: {}", error);
            }
        }
        Ok(())
    }
}

/// Table row for session summary
#[derive(Tabled)]
struct SessionTableRow {
    id: String,
    direction: String,
    remote: String,
    state: String,
    held: bool,
    muted: bool,
}

impl From<&SessionSummary> for SessionTableRow {
    fn from(session: &SessionSummary) -> Self {
        Self {
            id: session.session_id.clone(),
            direction: session.direction.to_string(),
            remote: session.remote.clone(),
            state: session.state.to_string(),
            held: session.held,
            muted: session.muted,
        }
    }
}

/// Table row for a client event
#[derive(Tabled)]
struct EventTableRow {
    event: String,
    detail: String,
}

impl From<&EventRecord> for EventTableRow {
    fn from(event: &EventRecord) -> Self {
        Self {
            event: event.event.clone(),
            detail: event.detail.clone(),
        }
    }
}

/// Table row for one configuration setting
#[derive(Tabled)]
struct ConfigTableRow {
    key: &'static str,
    value: String,
}

fn config_rows(config: &SipLineConfig) -> Vec<ConfigTableRow> {
    let row = |key, value: String| ConfigTableRow { key, value };
    vec![
        row("global.log_level", config.global.log_level.clone()),
        row("global.max_sessions", config.global.max_sessions.to_string()),
        row("connection.server_url", config.connection.server_url.clone()),
        row("connection.aor", config.connection.aor.clone().unwrap_or_default()),
        row(
            "connection.display_name",
            config.connection.display_name.clone().unwrap_or_default(),
        ),
        row(
            "connection.reconnection_attempts",
            config.connection.reconnection_attempts.to_string(),
        ),
        row(
            "connection.reconnection_delay_secs",
            config.connection.reconnection_delay_secs.to_string(),
        ),
        row(
            "connection.register_expires_secs",
            config.connection.register_expires_secs.to_string(),
        ),
        row("media.audio", config.media.audio.to_string()),
        row("media.video", config.media.video.to_string()),
        row(
            "media.send_dtmf_using_session_description_handler",
            config.media.send_dtmf_using_session_description_handler.to_string(),
        ),
    ]
}

/// Quote a CSV field when it contains separators or quotes
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
