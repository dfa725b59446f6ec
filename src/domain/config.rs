use crate::domain::error::{SipLineError, SipLineResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// SipLine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SipLineConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Signaling server connection
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Media options
    #[serde(default)]
    pub media: MediaConfig,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Number of simultaneous sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

/// Signaling server connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// WebSocket URL of the signaling server
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Address of record registered to receive incoming calls.
    /// An anonymous address is used when absent.
    #[serde(default)]
    pub aor: Option<String>,
    /// Display name presented to remote parties
    #[serde(default)]
    pub display_name: Option<String>,
    /// Maximum number of automatic reconnection attempts
    #[serde(default = "default_reconnection_attempts")]
    pub reconnection_attempts: u32,
    /// Seconds to wait between reconnection attempts
    #[serde(default = "default_reconnection_delay_secs")]
    pub reconnection_delay_secs: u64,
    /// Requested registration lifetime
    #[serde(default = "default_register_expires_secs")]
    pub register_expires_secs: u32,
}

/// Media settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Offer and answer audio
    #[serde(default = "default_true")]
    pub audio: bool,
    /// Offer and answer video
    #[serde(default)]
    pub video: bool,
    /// Send DTMF in-band (RFC 2833) instead of via INFO requests
    #[serde(default)]
    pub send_dtmf_using_session_description_handler: bool,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_sessions() -> usize {
    1
}

fn default_server_url() -> String {
    "wss://localhost:7443".to_string()
}

fn default_reconnection_attempts() -> u32 {
    3
}

fn default_reconnection_delay_secs() -> u64 {
    4
}

fn default_register_expires_secs() -> u32 {
    600
}

fn default_true() -> bool {
    true
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            aor: None,
            display_name: None,
            reconnection_attempts: default_reconnection_attempts(),
            reconnection_delay_secs: default_reconnection_delay_secs(),
            register_expires_secs: default_register_expires_secs(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            audio: true,
            video: false,
            send_dtmf_using_session_description_handler: false,
        }
    }
}

impl SipLineConfig {
    /// Reject settings the client cannot run with
    pub fn validate(&self) -> SipLineResult<()> {
        if self.global.max_sessions == 0 {
            return Err(SipLineError::Config {
                message: "max_sessions must be at least 1".to_string(),
            });
        }
        if self.connection.server_url.trim().is_empty() {
            return Err(SipLineError::Config {
                message: "server_url must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Runtime options handed to the call client at construction
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub server_url: String,
    pub aor: Option<String>,
    pub display_name: Option<String>,
    pub max_sessions: usize,
    pub reconnection_attempts: u32,
    pub reconnection_delay: Duration,
    pub register_expires_secs: u32,
    pub audio: bool,
    pub video: bool,
    pub send_dtmf_using_session_description_handler: bool,
}

impl ClientOptions {
    /// Instance identifier used in log lines
    pub fn id(&self) -> &str {
        self.display_name.as_deref().unwrap_or("Anonymous")
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions::from(&SipLineConfig::default())
    }
}

impl From<&SipLineConfig> for ClientOptions {
    fn from(config: &SipLineConfig) -> Self {
        Self {
            server_url: config.connection.server_url.clone(),
            aor: config.connection.aor.clone(),
            display_name: config.connection.display_name.clone(),
            max_sessions: config.global.max_sessions,
            reconnection_attempts: config.connection.reconnection_attempts,
            reconnection_delay: Duration::from_secs(config.connection.reconnection_delay_secs),
            register_expires_secs: config.connection.register_expires_secs,
            audio: config.media.audio,
            video: config.media.video,
            send_dtmf_using_session_description_handler: config
                .media
                .send_dtmf_using_session_description_handler,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = SipLineConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: SipLineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.global.max_sessions, 1);
        assert_eq!(deserialized.connection.reconnection_attempts, 3);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml_str = r#"
            [global]
            max_sessions = 4

            [connection]
            server_url = "wss://pbx.example.com:8089/ws"
            aor = "sip:alice@example.com"
        "#;

        let config: SipLineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.global.max_sessions, 4);
        assert_eq!(config.global.log_level, "info");
        assert_eq!(config.connection.aor.as_deref(), Some("sip:alice@example.com"));
        assert_eq!(config.connection.reconnection_delay_secs, 4);
        assert!(config.media.audio);
        assert!(!config.media.video);
    }

    #[test]
    fn test_validation() {
        let mut config = SipLineConfig::default();
        assert!(config.validate().is_ok());

        config.global.max_sessions = 0;
        assert!(matches!(config.validate(), Err(SipLineError::Config { .. })));

        config.global.max_sessions = 2;
        config.connection.server_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_options_from_config() {
        let mut config = SipLineConfig::default();
        config.connection.reconnection_delay_secs = 1;
        config.connection.display_name = Some("Alice".to_string());

        let options = ClientOptions::from(&config);
        assert_eq!(options.reconnection_delay, Duration::from_secs(1));
        assert_eq!(options.id(), "Alice");
        assert_eq!(ClientOptions::default().id(), "Anonymous");
    }
}
