//! Command-line interface for session maintenance.
//!
//! Session garbage collection is not triggered by stores themselves; a
//! scheduler (cron, systemd timer) is expected to run `gc` periodically.
//!
//! # Example
//!
//! ```bash
//! # Remove sessions idle for longer than session.lifetime
//! lumberjack-session gc
//!
//! # Override the lifetime (minutes) and use a specific config file
//! lumberjack-session --config ./config.toml gc --lifetime 30
//!
//! # Inspect and remove a single session
//! lumberjack-session show 3f2a9c0d4e5b6a7c8d9e0f1a2b3c4d5e
//! lumberjack-session destroy 3f2a9c0d4e5b6a7c8d9e0f1a2b3c4d5e
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Maintenance tool for lumberjack session storage.
#[derive(Debug, Parser)]
#[command(name = "lumberjack-session")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (TOML) layered over the built-in defaults
    #[arg(long, value_name = "PATH", global = true, env = "LUMBERJACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Remove sessions older than the configured lifetime
    Gc(GcArgs),
    /// Print the attributes of a stored session as JSON
    Show(SessionArgs),
    /// Remove a stored session
    Destroy(SessionArgs),
}

/// Options shared by commands that pick a driver.
#[derive(Debug, Args)]
pub struct DriverArgs {
    /// Session driver to use (defaults to session.driver)
    #[arg(long, value_name = "NAME")]
    pub driver: Option<String>,
}

/// Arguments for the gc subcommand.
#[derive(Debug, Args)]
pub struct GcArgs {
    /// Maximum idle time in minutes (defaults to session.lifetime)
    #[arg(long, value_name = "MINUTES")]
    pub lifetime: Option<u64>,

    #[command(flatten)]
    pub driver: DriverArgs,
}

/// Arguments for commands addressing a single session.
#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Session id
    #[arg(value_name = "ID")]
    pub id: String,

    #[command(flatten)]
    pub driver: DriverArgs,
}
