// # apw - Arch Package Watcher
//
// The apw binary is a thin layer over apw-core. It is responsible for:
// 1. Parsing arguments and environment variables
// 2. Setting up logging
// 3. Registering snapshot sources
// 4. Running one command and rendering its result
//
// All change-tracking logic lives in apw-core.
//
// ## Configuration
//
// Flags, each with an environment fallback:
//
// - `--config` / `APW_PACMAN_CONF`: pacman.conf handed to expac
// - `--expac` / `APW_EXPAC`: path to the expac binary
// - `--state` / `APW_STATE`: state file (default `~/.cache/apw.json`)
// - `--result` / `APW_RESULT`: result file (default `~/.cache/apw-result.json`)
// - `--retention-days` / `APW_RETENTION_DAYS`: how long a change stays listed
// - `--timeout` / `APW_TIMEOUT`: expac timeout in seconds
// - `--log-level` / `APW_LOG_LEVEL`: log level, logs go to stderr
//
// ## Example
//
// ```bash
// apw init            # once, records the current repositories as baseline
// apw update          # e.g. from a systemd user timer
// apw                 # show what changed
// apw dismiss
// ```

mod cli;
mod render;

use anyhow::{Context, Result};
use apw_core::engine::clean;
use apw_core::{ApwConfig, ApwEngine, ExportedResult, ResultFile, SourceRegistry};
use clap::Parser;
use cli::{Cli, Command, OutputFormat};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Success
/// - 1: Configuration or usage error
/// - 2: Runtime error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApwExitCode {
    /// Command completed
    Success = 0,
    /// Bad arguments or configuration
    ConfigError = 1,
    /// The command failed while running
    RuntimeError = 2,
}

impl From<ApwExitCode> for ExitCode {
    fn from(code: ApwExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl ApwExitCode {
    /// Classify a command failure
    fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<apw_core::Error>() {
            Some(apw_core::Error::Config(_)) => ApwExitCode::ConfigError,
            _ => ApwExitCode::RuntimeError,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version also arrive here
            let _ = e.print();
            return if e.use_stderr() {
                ApwExitCode::ConfigError.into()
            } else {
                ApwExitCode::Success.into()
            };
        }
    };

    let log_level = match parse_log_level(&cli.log_level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ApwExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ApwExitCode::ConfigError.into();
    }

    let config = match cli.apw_config().and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ApwExitCode::ConfigError.into();
        }
    };

    // One sequential flow per invocation
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ApwExitCode::RuntimeError.into();
        }
    };

    let command = cli.command();
    match rt.block_on(run(command, &config, cli.format)) {
        Ok(()) => ApwExitCode::Success.into(),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ApwExitCode::for_error(&e).into()
        }
    }
}

/// Validate a log level name the way it is spelled in the environment
fn parse_log_level(value: &str) -> Result<Level> {
    match value.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "APW_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            value
        ),
    }
}

fn source_registry() -> SourceRegistry {
    let registry = SourceRegistry::new();

    #[cfg(feature = "expac")]
    apw_source_expac::register(&registry);

    debug!("Registered snapshot sources: {:?}", registry.list_sources());
    registry
}

/// Run one command
async fn run(command: Command, config: &ApwConfig, format: OutputFormat) -> Result<()> {
    let registry = source_registry();
    let result_file = config.result_path.as_ref().map(ResultFile::new);

    match command {
        Command::Init => {
            info!("Scheduling is not managed by apw; run 'apw update' from a timer or cron job");
            let source = registry.create_source(&config.source)?;
            let store = registry.create_state_store(&config.state_store).await?;
            let mut engine = ApwEngine::open_for_init(store, config).await?;
            let result = engine
                .init(source.as_ref())
                .await
                .context("Taking the baseline snapshot failed")?;

            match format {
                OutputFormat::Json => print_json(&result)?,
                OutputFormat::Text => println!(
                    "{} Tracking {} packages. Run 'apw update' to look for changes.",
                    "apw initialized.".bold(),
                    engine.database().state().known_packages.len()
                ),
            }
        }
        Command::Update => {
            let source = registry.create_source(&config.source)?;
            let store = registry.create_state_store(&config.state_store).await?;
            let mut engine = ApwEngine::open(store, config).await?;
            let result = engine.update(source.as_ref()).await?;
            output(&result, format)?;
        }
        Command::Dismiss => {
            let store = registry.create_state_store(&config.state_store).await?;
            let mut engine = ApwEngine::open(store, config).await?;
            let result = engine.dismiss().await?;
            if format == OutputFormat::Json {
                print_json(&result)?;
            }
        }
        Command::Show => {
            let file = result_file.context("No result file configured")?;
            let result = file
                .read()
                .await?
                .context("Did you forget to call 'apw init'?")?;
            output(&result, format)?;
        }
        Command::Clean => {
            let store = registry.create_state_store(&config.state_store).await?;
            clean(store.as_ref(), result_file.as_ref()).await?;
            info!("Any timer running 'apw update' has to be stopped separately");
            if format == OutputFormat::Text {
                println!("{}", "Removed apw state and result files".bold());
            }
        }
    }

    Ok(())
}

fn output(result: &ExportedResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(result),
        OutputFormat::Text => {
            let styled = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
            if let Some(text) = render::render_text(result, styled) {
                print!("{text}");
            }
            Ok(())
        }
    }
}

fn print_json(result: &ExportedResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
