//! CLI module for netres
//!
//! This module provides the command-line interface for netres,
//! including argument parsing and subcommand handling.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use output::OutputFormat;

/// netres - declarative network resource configuration
///
/// Parses device configuration into structured facts and computes the
/// commands that converge a device onto the desired state.
#[derive(Parser, Debug, Clone)]
#[command(name = "netres")]
#[command(version)]
#[command(about = "Declarative network resource configuration", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format (defaults to the configured one)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<OutputFormat>,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "NETRES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a resource against a configuration file
    Run(commands::run::RunArgs),

    /// List available resources
    List(commands::list::ListArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }
}
