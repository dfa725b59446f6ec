use crate::cli::args::{Args, Command, ConfigCommand, DemoArgs, EnvelopeCommand};
use crate::cli::envelope::AgentEnvelope;
use crate::cli::output::{ConsoleWriter, EventRecord, OutputWriter};
use crate::core::bridge::ClientDelegate;
use crate::core::session::{CallState, RemoteIdentity, SessionId};
use crate::core::CallClient;
use crate::domain::config::{ClientOptions, SipLineConfig};
use crate::domain::error::{SipLineError, SipLineResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Execute CLI command
pub async fn execute_command(args: Args) -> SipLineResult<()> {
    let writer = ConsoleWriter::new(args.output);

    let config_manager = ConfigManager::new()?;
    let config = match &args.config {
        Some(config_path) => {
            let config = config_manager.load_config_from_path(config_path.as_ref())?;
            config.validate()?;
            config
        }
        None => config_manager.load_config()?,
    };

    if !args.quiet {
        let level = if args.verbose { "debug" } else { config.global.log_level.as_str() };
        if let Err(e) = init_logging(level) {
            writer.write_error(&format!("Failed to initialize logging: {}", e))?;
        }
    }

    match args.command {
        Command::Config(config_args) => {
            execute_config_command(config_args.command, &writer, &config, &config_manager)
        }
        Command::Demo(demo_args) => {
            let events = run_demo(&config, &demo_args, &writer).await?;
            writer.write_events(&events)?;
            Ok(())
        }
        Command::Envelope(envelope_args) => execute_envelope_command(envelope_args.command, &writer),
        Command::Version => {
            writer.write_message(&format!("sipline {}", env!("CARGO_PKG_VERSION")))?;
            Ok(())
        }
    }
}

fn execute_config_command(
    command: ConfigCommand,
    writer: &ConsoleWriter,
    config: &SipLineConfig,
    config_manager: &ConfigManager,
) -> SipLineResult<()> {
    match command {
        ConfigCommand::Show => {
            writer.write_config(config)?;
        }
        ConfigCommand::Validate { file } => {
            let result = match &file {
                Some(path) => config_manager
                    .load_config_from_path(path.as_ref())
                    .and_then(|c| c.validate()),
                None => config_manager.load_config().map(|_| ()),
            };
            let name = file.as_deref().unwrap_or("Current configuration");
            match result {
                Ok(()) => writer.write_message(&format!("{} is valid", name))?,
                Err(e) => writer.write_error(&format!("Configuration validation failed: {}", e))?,
            }
        }
        ConfigCommand::Init { dir, global } => {
            if global {
                config_manager.save_config(&SipLineConfig::default())?;
                writer.write_message(&format!(
                    "Global configuration initialized at '{}'",
                    config_manager.global_config_path().display()
                ))?;
            } else {
                let dir = match dir {
                    Some(dir) => PathBuf::from(dir),
                    None => std::env::current_dir()?,
                };
                let path = config_manager.init_project_config(&dir)?;
                writer.write_message(&format!("Project configuration initialized at '{}'", path.display()))?;
            }
        }
        ConfigCommand::Path => {
            writer.write_message(&format!("global: {}", config_manager.global_config_path().display()))?;
            match config_manager.project_config_path() {
                Some(path) => writer.write_message(&format!("project: {}", path.display()))?,
                None => writer.write_message("project: (none)")?,
            }
        }
    }
    Ok(())
}

fn execute_envelope_command(command: EnvelopeCommand, writer: &ConsoleWriter) -> SipLineResult<()> {
    match command {
        EnvelopeCommand::Encode { cmd, args } => {
            let args = match args {
                Some(raw) => serde_json::from_str(&raw)
                    .map_err(|e| SipLineError::InvalidInput(format!("Invalid JSON arguments: {}", e)))?,
                None => serde_json::Value::Null,
            };
            writer.write_envelope(&AgentEnvelope::new(cmd, args))?;
        }
        EnvelopeCommand::SetStatus { status } => {
            writer.write_envelope(&AgentEnvelope::set_status(&status)?)?;
        }
        EnvelopeCommand::Decode { payload } => {
            let envelope = AgentEnvelope::decode(&payload)?;
            writer.write_envelope(&envelope)?;
            if let Some(status) = envelope.status() {
                writer.write_message(&format!("status: {}", status))?;
            }
        }
    }
    Ok(())
}

type EventLog = Arc<Mutex<Vec<EventRecord>>>;

fn record(log: &EventLog, event: &str, detail: impl Into<String>) {
    if let Ok(mut log) = log.lock() {
        log.push(EventRecord::new(event, detail));
    }
}

fn demo_delegate(log: &EventLog) -> ClientDelegate {
    let sink = |event: &'static str| {
        let log = Arc::clone(log);
        move |detail: String| record(&log, event, detail)
    };
    let (connect, disconnect, registered) = (sink("server-connect"), sink("server-disconnect"), sink("registered"));
    let (created, received, answered) = (sink("call-created"), sink("call-received"), sink("call-answered"));
    let (hangup, hold, dtmf, message) = (
        sink("call-hangup"),
        sink("call-hold"),
        sink("dtmf-received"),
        sink("message-received"),
    );

    ClientDelegate::new()
        .on_server_connect(move || connect("transport up".to_string()))
        .on_server_disconnect(move |reason| disconnect(reason.to_string()))
        .on_registered(move || registered("address of record bound".to_string()))
        .on_call_created(move |s| created(format!("{} to {}", s.id(), s.remote())))
        .on_call_received(move |s| received(format!("{} from {}", s.id(), s.remote())))
        .on_call_answered(move |s| answered(format!("{} {}", s.id(), s.state())))
        .on_call_hangup(move |s| hangup(s.id().to_string()))
        .on_call_hold(move |s| hold(format!("{} {}", s.id(), if s.is_held() { "held" } else { "resumed" })))
        .on_call_dtmf_received(move |e| dtmf(format!("{} '{}'", e.session.id(), e.tone)))
        .on_message_received(move |m| message(format!("{} from {}", m.body, m.from)))
}

// Gives the bridge task time to apply the engine's events.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

/// Scripted run on the loopback engine: an incoming call is answered, an
/// outbound call puts it on hold, DTMF and an agent status message are
/// sent, then both calls end and the client disconnects.
pub async fn run_demo(
    config: &SipLineConfig,
    args: &DemoArgs,
    writer: &dyn OutputWriter,
) -> SipLineResult<Vec<EventRecord>> {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let mut options = ClientOptions::from(config);
    options.max_sessions = options.max_sessions.max(2);

    let (client, engine) = CallClient::with_loopback(options, demo_delegate(&log))?;

    client.connect().await?;
    client.register().await?;
    settle().await;

    let incoming = SessionId::new(format!("in-{}", Uuid::new_v4().simple()));
    engine.ring(incoming.as_str(), RemoteIdentity::uri(args.caller.as_str()));
    settle().await;
    client.answer(&incoming).await?;
    settle().await;

    engine.set_auto_answer(true);
    let outgoing = client.call(&args.destination).await?;
    settle().await;
    writer.write_sessions(&client.summaries().await)?;

    for tone in args.dtmf.chars() {
        client.send_dtmf(&outgoing, tone).await?;
    }
    let status = AgentEnvelope::set_status(&args.status)?.encode()?;
    client.message(&args.destination, &status).await?;

    client.hangup(&outgoing).await?;
    engine.remote_hangup(&incoming);
    settle().await;

    let leftover = client.sessions_in_state(CallState::Established).await;
    if !leftover.is_empty() {
        return Err(SipLineError::engine(format!("{} session(s) still established", leftover.len())));
    }

    client.disconnect().await?;
    settle().await;

    let events = log.lock().map(|log| log.clone()).unwrap_or_default();
    Ok(events)
}
