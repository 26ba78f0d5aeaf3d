//! Command-line interface for workshop-sync.
//!
//! This module provides the CLI structure for the `wsync` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

pub use commands::{
    parse_collection, parse_field, CaptureCommand, ConfigCommand, EquipmentArg, ExportCommand,
    PendingCommand, RecentCommand, ScopeArg, SearchCommand, StatusCommand,
};

/// wsync - Capture workshop records offline, sync when the service is reachable
///
/// Records for engines and generators are kept in a local database and sent
/// to the remote workshop service in batches.
#[derive(Debug, Parser)]
#[command(name = "wsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Remote API base URL for this run
    #[arg(long, global = true, value_name = "URL")]
    pub api_base: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a form submission
    Capture(CaptureCommand),

    /// Send every pending record to the remote service
    Sync,

    /// Show records waiting to be synced
    Pending(PendingCommand),

    /// Show connectivity and local store status
    Status(StatusCommand),

    /// Look up every event for a serial number or generator code
    Search(SearchCommand),

    /// Show the latest supplied engines or generators
    Recent(RecentCommand),

    /// Download a spreadsheet report
    Export(ExportCommand),

    /// Ask the remote service to repair its schema
    Repair,

    /// View or modify configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Command {
    /// Check if the command can do its job without the local store.
    #[must_use]
    pub fn is_remote_only(&self) -> bool {
        matches!(
            self,
            Self::Status(_) | Self::Search(_) | Self::Recent(_) | Self::Export(_) | Self::Repair
        )
    }
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
