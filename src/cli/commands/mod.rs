//! Subcommands module for netres CLI
//!
//! This module contains all the subcommand implementations.

pub mod list;
pub mod run;

use crate::cli::output::{OutputFormat, OutputFormatter};
use anyhow::{Context, Result};
use netres::config::Config;
use netres::modules::ResourceRegistry;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Built-in resources
    pub registry: ResourceRegistry,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Result<Self> {
        let format = match cli.output {
            Some(format) => format,
            None => config
                .defaults
                .output
                .parse::<OutputFormat>()
                .map_err(anyhow::Error::msg)
                .context("Invalid output format in configuration")?,
        };
        let use_color = !cli.no_color && config.colors.enabled;
        let registry =
            ResourceRegistry::with_builtins().context("Failed to load built-in resources")?;

        Ok(Self {
            output: OutputFormatter::new(use_color, format, cli.verbosity()),
            config,
            registry,
        })
    }
}
