use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Command line arguments for SipLine
#[derive(Parser, Debug)]
#[command(
    name = "sipline",
    version = env!("CARGO_PKG_VERSION"),
    about = "Call session orchestration over a SIP signaling engine",
    long_about = "Connects to a SIP signaling server, tracks concurrent call sessions and reports call events. Ships a loopback engine for scripted runs."
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Configuration management commands
    Config(ConfigArgs),
    /// Run a scripted call scenario against the loopback engine
    Demo(DemoArgs),
    /// Build or read agent message payloads
    Envelope(EnvelopeArgs),
    /// Display version information
    Version,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
    /// Table output
    Table,
    /// CSV output
    Csv,
}

/// Configuration management arguments
#[derive(ClapArgs, Debug)]
pub struct ConfigArgs {
    /// Configuration subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Validate configuration
    Validate {
        /// Configuration file path
        file: Option<String>,
    },
    /// Create default configuration
    Init {
        /// Directory to create the project configuration in
        #[arg(short, long)]
        dir: Option<String>,
        /// Write the global configuration instead
        #[arg(short, long)]
        global: bool,
    },
    /// Print configuration file locations
    Path,
}

/// Demo scenario arguments
#[derive(ClapArgs, Debug)]
pub struct DemoArgs {
    /// Destination of the outbound call
    #[arg(short, long, default_value = "sip:bob@example.com")]
    pub destination: String,

    /// Caller of the simulated incoming call
    #[arg(long, default_value = "sip:alice@example.com")]
    pub caller: String,

    /// DTMF tones sent on the outbound call
    #[arg(long, default_value = "123#")]
    pub dtmf: String,

    /// Agent status announced to the destination
    #[arg(long, default_value = "available")]
    pub status: String,
}

/// Agent message payload arguments
#[derive(ClapArgs, Debug)]
pub struct EnvelopeArgs {
    /// Envelope subcommand
    #[command(subcommand)]
    pub command: EnvelopeCommand,
}

/// Agent message payload subcommands
#[derive(Subcommand, Debug)]
pub enum EnvelopeCommand {
    /// Encode a command and JSON arguments
    Encode {
        /// Command name
        cmd: String,
        /// Arguments as a JSON value
        #[arg(short, long)]
        args: Option<String>,
    },
    /// Encode a set-status command
    SetStatus {
        /// Agent status
        status: String,
    },
    /// Decode a received payload
    Decode {
        /// Raw message body
        payload: String,
    },
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
