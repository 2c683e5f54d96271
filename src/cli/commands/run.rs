//! Run command - Execute a resource
//!
//! Loads the desired configuration and the device's running configuration
//! from files and drives one resource invocation. Device-contacting states
//! use an offline connection serving the running configuration file and
//! recording the commands it is asked to apply.

use super::CommandContext;
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::debug;

use netres::connection::{DeviceConnection, StaticConnection};
use netres::modules::{ModuleContext, ResourceParams, State};

/// Arguments for the run command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Resource to run (see `netres list`)
    #[arg(required = true)]
    pub resource: String,

    /// Desired state (defaults to the configured one)
    #[arg(long, short = 's')]
    pub state: Option<State>,

    /// Desired configuration as YAML or JSON
    #[arg(long)]
    pub config_file: Option<PathBuf>,

    /// Device running configuration text
    #[arg(long)]
    pub running_config: Option<PathBuf>,

    /// Generate commands without applying them
    #[arg(long)]
    pub check: bool,

    /// Show a diff of the facts before and after
    #[arg(long, short = 'D')]
    pub diff: bool,
}

/// Read a YAML or JSON document into a JSON value
fn load_want(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn read_running_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read running config: {}", path.display()))
}

impl RunArgs {
    /// Execute the run command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let Some(resource) = ctx.registry.get(&self.resource) else {
            bail!(
                "Unknown resource '{}'. Available: {}",
                self.resource,
                ctx.registry.names().join(", ")
            );
        };
        let state = self.state.unwrap_or(ctx.config.defaults.state);

        let mut params = ResourceParams::new(state);
        if let Some(path) = &self.config_file {
            params = params.with_config(load_want(path)?);
        }

        let running_config = self
            .running_config
            .as_deref()
            .map(read_running_config)
            .transpose()?;

        let connection = match (&running_config, &self.running_config) {
            (Some(text), Some(path)) if state.contacts_device() => {
                let identifier = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "device".to_string());
                Some(StaticConnection::new(identifier, text.as_str()))
            }
            _ => None,
        };
        if state == State::Parsed {
            if let Some(text) = running_config {
                params = params.with_running_config(text);
            }
        }

        let context = ModuleContext::new()
            .with_check_mode(self.check || ctx.config.defaults.check_mode)
            .with_diff_mode(self.diff);
        if context.check_mode && state.contacts_device() {
            ctx.output.warning("Check mode: commands are reported, not applied");
        }

        debug!(resource = %self.resource, %state, "running resource");
        let output = netres::modules::run(
            resource.as_ref(),
            &params,
            connection.as_ref().map(|c| c as &dyn DeviceConnection),
            &context,
        )
        .with_context(|| format!("{} failed with state {}", self.resource, state))?;

        if let Some(connection) = &connection {
            let applied = connection.applied();
            if !applied.is_empty() {
                ctx.output
                    .info(&format!("{} commands recorded for {}", applied.len(), connection.identifier()));
            }
        }

        ctx.output.resource_result(&self.resource, state, &output)?;
        Ok(0)
    }
}
