//! ---
//! fl_section: "01-core-functionality"
//! fl_subsection: "binary"
//! fl_type: "source"
//! fl_scope: "code"
//! fl_description: "Binary entrypoint for the FieldLink daemon."
//! fl_version: "v0.1.0"
//! fl_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use fieldlink_common::config::AppConfig;
use fieldlink_common::logging::init_tracing;
use fieldlink_common::version::VersionInfo;
use fieldlink_common::{
    DeviceIdentity, Feedback, LogDisplay, NoDisplay, NoIndicator, SharedDisplay, SharedIndicator,
    SysfsLed, SystemClock,
};
use fieldlink_core::{Gateway, GatewayState};
use fieldlink_metrics::{new_registry, spawn_http_server, GatewayMetrics};
use fieldlink_modem::ArtifactSet;
use fieldlink_rt::StopSignal;
use fieldlink_sim::SimulatedSensors;
use fieldlink_transport::{SerialPortChannel, Transactor};
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    version = concat!("FieldLink ", env!("CARGO_PKG_VERSION")),
    about = "FieldLink cellular gateway daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "PATH", help = "Override the modem serial port")]
    port: Option<String>,

    #[arg(long, help = "Treat a failed connectivity probe or TLS setup as fatal")]
    strict: bool,

    #[arg(long, help = "Log every modem command and response")]
    trace_commands: bool,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Bring the modem up and publish telemetry")]
    Run,
    #[command(about = "Validate configuration and TLS artifacts, then exit")]
    CheckConfig,
    #[command(about = "Send one command to the modem and print the response")]
    Probe {
        #[arg(value_name = "COMMAND")]
        command: String,
        #[arg(long, default_value_t = 1_000, help = "How long to wait for the response")]
        wait_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let version = VersionInfo::current();
    if cli.version {
        println!("{}", version.extended());
        return Ok(());
    }
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/fieldlink.toml"));
    candidates.push(PathBuf::from("configs/example.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    if let Some(port) = cli.port {
        config.modem.port = port;
    }
    if cli.strict {
        config.strict = true;
    }
    config.validate()?;
    init_tracing("fieldlinkd", &config.logging, cli.trace_commands)?;
    info!(
        config_path = %loaded.source.display(),
        version = %version.banner(),
        strict = config.strict,
        "configuration loaded"
    );

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_daemon(config, version).await?,
        Commands::CheckConfig => check_config(&config)?,
        Commands::Probe { command, wait_ms } => {
            probe(&config, &command, Duration::from_millis(wait_ms))?
        }
    }

    Ok(())
}

async fn run_daemon(config: AppConfig, version: VersionInfo) -> Result<()> {
    let registry = new_registry();
    let metrics = GatewayMetrics::new(registry.clone())?;
    metrics.set_build_info(&version.semver, &version.target);
    let metrics_server = if config.metrics.enabled {
        info!(address = %config.metrics.listen, "metrics exporter enabled");
        Some(spawn_http_server(registry, config.metrics.listen)?)
    } else {
        info!("metrics exporter disabled by configuration");
        None
    };

    let channel = SerialPortChannel::open(&config.modem.port, config.modem.baud_rate)?;
    let engine = Transactor::new(Box::new(channel), SystemClock::shared());
    let telemetry = SimulatedSensors::new(&config.telemetry)?;
    let feedback = feedback_from_config(&config);
    let stop = StopSignal::new();
    let mut gateway = Gateway::new(config, engine, Box::new(telemetry))?
        .with_feedback(feedback)
        .with_metrics(metrics)
        .with_stop_signal(stop.clone());
    info!(device_id = %gateway.identity(), "gateway starting");

    let signal_stop = stop.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("ctrl-c received; stopping gateway");
                signal_stop.trigger();
            }
            Err(err) => warn!(error = %err, "unable to listen for ctrl-c"),
        }
    });

    let final_state = tokio::task::spawn_blocking(move || gateway.run().clone())
        .await
        .context("gateway worker terminated abnormally")?;
    info!(state = ?final_state, "gateway finished");

    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }
    exit_status(&final_state)
}

/// A halted gateway never reports success, even after a clean stop request.
fn exit_status(state: &GatewayState) -> Result<()> {
    match state {
        GatewayState::Halted(err) => {
            bail!("gateway halted during {} bring-up: {}", err.stage(), err)
        }
        _ => Ok(()),
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    let identity = DeviceIdentity::from_config(&config.device)?;
    println!("Device id: {identity}");
    println!("Broker: {} (topic {})", config.broker.url(), config.broker.topic);
    println!("Serial port: {} @ {}", config.modem.port, config.modem.baud_rate);
    if config.tls.enabled {
        let artifacts = ArtifactSet::from_config(&config.tls).context("TLS artifacts unusable")?;
        for record in artifacts.records() {
            println!("{}: {} ({} bytes)", record.role(), record.name(), record.len());
        }
    } else {
        println!("TLS disabled");
    }
    Ok(())
}

fn probe(config: &AppConfig, command: &str, wait: Duration) -> Result<()> {
    let channel = SerialPortChannel::open(&config.modem.port, config.modem.baud_rate)?;
    let mut engine = Transactor::new(Box::new(channel), SystemClock::shared());
    let response = engine.transact(command, wait, true);
    if response.is_empty() {
        warn!(command, "no response within {:?}", wait);
    }
    println!("{}", response.trim());
    Ok(())
}

fn feedback_from_config(config: &AppConfig) -> Feedback {
    let indicator: SharedIndicator = match &config.indicator.led_path {
        Some(path) => Arc::new(SysfsLed::new(path.clone())),
        None => Arc::new(NoIndicator),
    };
    let display: SharedDisplay = if config.display.enabled {
        Arc::new(LogDisplay)
    } else {
        Arc::new(NoDisplay)
    };
    Feedback::new(indicator, display)
}
