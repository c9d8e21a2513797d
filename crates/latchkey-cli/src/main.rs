//! Latchkey - single-door RFID access controller
//!
//! # Configuration
//!
//! Configuration is loaded from multiple sources with priority:
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`LATCHKEY_*`)
//! 3. Config file (`--config`, TOML)
//! 4. Default values (lowest priority)
//!
//! # Exit Codes
//!
//! - `0`: clean shutdown
//! - `1`: device construction, open, attach or close failure, or bad
//!   configuration

mod config;
mod console;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use latchkey_audit::{AnyAuditSink, CsvAuditSink, MemoryAuditSink, read_records};
use latchkey_controller::{
    ControllerConfig, ExitStatus, LifecycleCoordinator, LifecycleError, RepeatPolicy,
};
use latchkey_core::constants::COMMAND_QUEUE_CAPACITY;
use latchkey_hardware::devices::{AnyActuator, AnyTagReader};
use latchkey_hardware::{DeviceBackend, DeviceKind};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Overrides;
use crate::console::Console;

/// Latchkey - single-door RFID access controller
#[derive(Parser, Debug)]
#[command(name = "latchkey")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, env = "LATCHKEY_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Authorized tag identifier
    #[arg(long, env = "LATCHKEY_CREDENTIAL", hide_env_values = true)]
    credential: Option<String>,

    /// Audit trail file
    #[arg(long, env = "LATCHKEY_AUDIT_PATH", value_name = "PATH")]
    audit_path: Option<PathBuf>,

    /// How long to wait for each device to attach
    #[arg(long, value_name = "MS")]
    attach_timeout_ms: Option<u64>,

    /// Servo channel driving the lock
    #[arg(long)]
    channel: Option<u8>,

    /// Servo position for an open door, in degrees
    #[arg(long, value_name = "DEGREES")]
    open_position: Option<f64>,

    /// Servo position for a locked door, in degrees
    #[arg(long, value_name = "DEGREES")]
    locked_position: Option<f64>,

    /// What the credential does on an unlocked door: toggle or ignore
    #[arg(long, value_name = "POLICY")]
    repeat_policy: Option<RepeatPolicy>,

    /// Device backend for both devices: mock or phidget
    #[arg(long, env = "LATCHKEY_BACKEND", value_name = "BACKEND")]
    backend: Option<DeviceBackend>,

    /// Keep the audit trail in memory instead of writing the file
    #[arg(long)]
    dry_run: bool,

    /// Log filter (also: RUST_LOG)
    #[arg(long, default_value = "info", value_name = "FILTER")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the controller (default)
    Run,

    /// Print the audit trail
    Audit {
        /// Print records as JSON lines
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to build tokio runtime: {}", e);
            return ExitStatus::Failure.into();
        }
    };

    let status = runtime.block_on(async_main(cli));
    // Stdin reads may still be parked on a blocking thread.
    runtime.shutdown_background();
    status.into()
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn async_main(cli: Cli) -> ExitStatus {
    let overrides = Overrides {
        credential: cli.credential,
        audit_path: cli.audit_path,
        attach_timeout_ms: cli.attach_timeout_ms,
        channel: cli.channel,
        open_position: cli.open_position,
        locked_position: cli.locked_position,
        repeat_policy: cli.repeat_policy,
        backend: cli.backend,
    };
    let config = match config::load(cli.config.as_deref(), overrides) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitStatus::Failure;
        }
    };

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_controller(config, cli.dry_run).await,
        Commands::Audit { json } => match print_audit(&config, json).await {
            Ok(()) => ExitStatus::Clean,
            Err(e) => {
                error!("{:#}", e);
                ExitStatus::Failure
            }
        },
    }
}

async fn run_controller(config: ControllerConfig, dry_run: bool) -> ExitStatus {
    let settings = match config.settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitStatus::Failure;
        }
    };

    let (servo, _servo_handle) = match AnyActuator::from_backend(config.actuator_backend) {
        Ok(parts) => parts,
        Err(e) => {
            let e = LifecycleError::construction(DeviceKind::Actuator, e);
            error!("{}", e);
            return e.exit_status();
        }
    };
    let (reader, reader_handle) = match AnyTagReader::from_backend(config.reader_backend) {
        Ok(parts) => parts,
        Err(e) => {
            let e = LifecycleError::construction(DeviceKind::Reader, e);
            error!("{}", e);
            return e.exit_status();
        }
    };

    let sink: AnyAuditSink = if dry_run {
        info!("Dry run, audit records kept in memory");
        MemoryAuditSink::new().into()
    } else {
        info!("Audit trail: {}", config.audit_path.display());
        CsvAuditSink::new(&config.audit_path).into()
    };

    let mut coordinator = LifecycleCoordinator::new(settings, reader, servo, sink);
    let (commands_tx, commands) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    let console = Console::new(commands_tx, coordinator.subscribe(), reader_handle);

    // The command receiver is dropped with this future, which stops the console.
    let controller = async move {
        let mut commands = commands;
        coordinator.run_to_completion(&mut commands).await
    };

    let (status, ()) = tokio::join!(controller, console.run(BufReader::new(tokio::io::stdin())));
    status
}

async fn print_audit(config: &ControllerConfig, json: bool) -> Result<()> {
    let records = read_records(&config.audit_path)
        .await
        .with_context(|| format!("failed to read {}", config.audit_path.display()))?;

    for record in &records {
        if json {
            println!("{}", serde_json::to_string(record)?);
        } else {
            println!("{record}");
        }
    }
    Ok(())
}
