// CLI module - Command line interface
pub mod args;
pub mod commands;
pub mod envelope;
pub mod output;

pub use args::{Args, Command, OutputFormat};
pub use commands::execute_command;
pub use envelope::AgentEnvelope;
pub use output::OutputWriter;
