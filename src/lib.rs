//! Lumberjack Session - driver-based session storage
//!
//! Per-user session state with flash data aging, pluggable storage backends
//! and optional encryption of the persisted payload. The [`session`] module
//! holds the engine; [`cli`] and [`run_app`] form a small maintenance tool
//! around it (garbage collection, inspection, removal).

pub mod cli;
pub mod config;
pub mod encrypter;
pub mod error;
pub mod logging;
pub mod session;

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands, GcArgs, SessionArgs};
use crate::config::Config;
use crate::error::ExitCode;
use crate::session::{lock, SessionManager, SessionStore};

/// Run the CLI, writing command output to stdout.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_with_writer(cli, &mut out)
}

/// Run the CLI, writing command output to `out`.
pub fn run_with_writer(cli: Cli, out: &mut dyn Write) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };

    match cli.command {
        Commands::Gc(args) => run_gc(config, &args, out),
        Commands::Show(args) => run_show(config, &args, out),
        Commands::Destroy(args) => run_destroy(config, &args, out),
    }
}

fn run_gc(config: Config, args: &GcArgs, out: &mut dyn Write) -> Result<ExitCode> {
    let minutes = args
        .lifetime
        .unwrap_or_else(|| config.get("session.lifetime", crate::config::DEFAULT_LIFETIME_MINUTES));
    let manager = SessionManager::new(config);
    let handler = manager
        .handler(args.driver.driver.as_deref())
        .context("Failed to open session driver")?;

    let removed = handler
        .gc(Duration::from_secs(minutes.saturating_mul(60)))
        .context("Session garbage collection failed")?;

    log::info!(
        "Removed {} session(s) idle for more than {} minute(s)",
        removed,
        minutes
    );
    writeln!(out, "{}", removed)?;
    Ok(ExitCode::Success)
}

fn run_show(config: Config, args: &SessionArgs, out: &mut dyn Write) -> Result<ExitCode> {
    let manager = SessionManager::new(config).with_session_id(&args.id);
    let driver = manager
        .driver(args.driver.driver.as_deref())
        .context("Failed to open session driver")?;
    let mut session = lock(&driver);

    let raw = session
        .handler()
        .read(&args.id)
        .with_context(|| format!("Failed to read session {}", args.id))?;
    if raw.is_empty() {
        log::warn!("No session stored under id {}", args.id);
        return Ok(ExitCode::SessionNotFound);
    }

    session
        .start()
        .with_context(|| format!("Failed to start session {}", args.id))?;
    let json = serde_json::to_string_pretty(&session.all())
        .context("Failed to serialize session attributes")?;
    writeln!(out, "{}", json)?;
    Ok(ExitCode::Success)
}

fn run_destroy(config: Config, args: &SessionArgs, out: &mut dyn Write) -> Result<ExitCode> {
    let manager = SessionManager::new(config);
    let handler = manager
        .handler(args.driver.driver.as_deref())
        .context("Failed to open session driver")?;

    handler
        .destroy(&args.id)
        .with_context(|| format!("Failed to destroy session {}", args.id))?;
    log::info!("Destroyed session {}", args.id);
    writeln!(out, "{}", args.id)?;
    Ok(ExitCode::Success)
}
