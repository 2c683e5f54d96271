//! List command - Show available resources

use super::CommandContext;
use crate::cli::output::ResourceSummary;
use anyhow::Result;
use clap::Parser;

/// Arguments for the list command
#[derive(Parser, Debug, Clone)]
pub struct ListArgs {}

impl ListArgs {
    /// Execute the list command
    pub fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let summaries: Vec<ResourceSummary> = ctx
            .registry
            .names()
            .into_iter()
            .filter_map(|name| ctx.registry.get(name))
            .map(|resource| ResourceSummary {
                name: resource.name().to_string(),
                description: resource.description().to_string(),
                states: resource
                    .supported_states()
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            })
            .collect();

        ctx.output.resource_list(&summaries)?;
        Ok(0)
    }
}
