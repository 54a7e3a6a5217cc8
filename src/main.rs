//! Remote Runner
//!
//! Main entry point for the remote runner CLI.

mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use runner_config::{Config, ConfigLoader, ConfigValidator};
use runner_loop::{
    register_builtins, ActionRegistry, Dispatcher, ExecutionLoop, HttpTransport, LogRelay,
    LoggingPresenter, LoopConfig, RunnerError,
};
use runner_protocols::NullSurface;

use cli::{Cli, Commands, RunArgs};

/// Timeout of each relayed log request.
const LOG_RELAY_TIMEOUT: Duration = Duration::from_secs(5);

fn init_tracing(
    config: &Config,
    debug: bool,
    relay: Option<&LogRelay>,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = ConfigLoader::expand_path(&config.logging.dir);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("remote-runner")
        .filename_suffix("log")
        .max_log_files(30)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keeps the background writer alive for the program duration.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let fallback = if debug { "debug" } else { config.logging.level.as_str() };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(relay.map(LogRelay::layer))
        .init();

    Ok(())
}

/// Merge CLI flags over the file configuration.
fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(url) = &args.driver_url {
        config.driver.url = url.clone();
    }
    if let Some(id) = &args.session_id {
        config.driver.session_id = Some(id.clone());
    }
    if args.continue_run {
        config.driver.continue_run = true;
    }
    if args.debug {
        config.driver.debug = true;
    }
}

/// In debug mode, client log events are also sent to the driver.
fn driver_log_relay(config: &Config) -> Result<Option<LogRelay>, Box<dyn std::error::Error>> {
    if !config.driver.debug {
        return Ok(None);
    }
    let url = url::Url::parse(&config.driver.url)?;
    let transport = HttpTransport::new(url, Some(LOG_RELAY_TIMEOUT))?;
    Ok(Some(LogRelay::spawn(
        Arc::new(transport),
        config.driver.session_id.clone(),
    )))
}

fn loop_config(config: &Config) -> LoopConfig {
    LoopConfig {
        transport_retry: config.timing.transport_retry(),
        retry_last_delay: config.timing.retry_last_delay(),
        condition_poll: config.timing.condition_poll(),
        default_timeout: config.timing.default_timeout(),
        continue_run: config.driver.continue_run,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::CheckConfig) => check_config(&cli.config),
        Some(Commands::Run(args)) => run(&cli.config, args).await,
        None => run(&cli.config, RunArgs::default()).await,
    }
}

/// Validate the configuration file and report findings on stdout.
fn check_config(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load(path)?;
    let result = ConfigValidator::validate(&config);

    for warning in &result.warnings {
        println!("warning: {}", warning);
    }
    for error in &result.errors {
        println!("error: {}", error);
    }

    if !result.is_valid() {
        return Err(format!("{} has {} error(s)", path.display(), result.errors.len()).into());
    }
    println!("{} is valid", path.display());
    Ok(())
}

/// Run the execution loop in the foreground.
async fn run(config_path: &Path, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ConfigLoader::load_or_default(config_path)?;
    apply_overrides(&mut config, &args);
    let relay = driver_log_relay(&config)?;
    init_tracing(&config, config.driver.debug, relay.as_ref())?;

    info!("Starting remote-runner v{}", env!("CARGO_PKG_VERSION"));

    let validation = ConfigValidator::validate(&config);
    for warning in &validation.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    if let Some(first) = validation.errors.first() {
        return Err(runner_config::ConfigError::InvalidValue {
            field: first.path.clone(),
            message: first.message.clone(),
        }
        .into());
    }

    let driver_url = url::Url::parse(&config.driver.url)?;
    let transport = Arc::new(HttpTransport::new(
        driver_url.clone(),
        config.timing.request_timeout(),
    )?);

    let registry = Arc::new(ActionRegistry::new());
    register_builtins(&registry)?;
    info!(commands = ?registry.names(), "Actions registered");

    let cancel = CancellationToken::new();
    let mut runner = ExecutionLoop::new(
        loop_config(&config),
        driver_url.clone(),
        transport,
        Dispatcher::new(registry),
    )
    .with_surface(Arc::new(NullSurface))
    .with_presenter(Arc::new(presenter(relay)))
    .with_cancellation(cancel.clone());
    if let Some(id) = &config.driver.session_id {
        runner = runner.with_session_id(id.clone());
    }

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            shutdown.cancel();
        }
    });

    info!(driver = %driver_url, "Polling driver");
    let result = runner.run().await;

    let snapshot = runner.metrics().snapshot();
    info!(
        polls = snapshot.polls,
        commands = snapshot.commands_dispatched,
        failures = snapshot.failures,
        errors = snapshot.errors,
        runs = snapshot.runs_completed,
        "Runner stopped"
    );

    match result {
        Ok(()) | Err(RunnerError::Cancelled) => Ok(()),
        Err(e) => {
            error!(error = %e, "Runner stopped with error");
            Err(e.into())
        }
    }
}

fn presenter(relay: Option<LogRelay>) -> LoggingPresenter {
    match relay {
        Some(relay) => LoggingPresenter::new().with_relay(relay),
        None => LoggingPresenter::new(),
    }
}
