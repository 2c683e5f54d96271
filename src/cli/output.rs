//! Output formatting module for netres
//!
//! Renders resource results for people (colored text) or for scripts
//! (JSON or YAML documents on stdout).

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::str::FromStr;

use netres::diff::{colorize, facts_diff};
use netres::modules::{ResourceOutput, State};

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
    /// YAML output
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}

/// Summary of one registered resource
#[derive(Debug, Clone, Serialize)]
pub struct ResourceSummary {
    pub name: String,
    pub description: String,
    pub states: Vec<String>,
}

/// Output formatter for different output modes
#[derive(Debug, Clone)]
pub struct OutputFormatter {
    /// Use colored output
    use_color: bool,
    /// Selected format
    format: OutputFormat,
    /// Verbosity level
    verbosity: u8,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, format: OutputFormat, verbosity: u8) -> Self {
        colored::control::set_override(use_color);
        Self {
            use_color,
            format,
            verbosity,
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.format != OutputFormat::Human {
            return;
        }
        if self.use_color {
            println!("\n{}", title.cyan().bold());
            println!("{}", "-".repeat(title.len()).cyan());
        } else {
            println!("\n{}", title);
            println!("{}", "-".repeat(title.len()));
        }
    }

    /// Print an info message, shown only with -v
    pub fn info(&self, message: &str) {
        if self.format == OutputFormat::Human && self.verbosity >= 1 {
            println!("{} {}", "INFO".blue(), message);
        }
    }

    /// Print a warning to stderr
    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", "WARNING".yellow().bold(), message);
    }

    /// Serialize `value` in the machine-readable format
    fn print_document<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
            _ => println!("{}", serde_json::to_string_pretty(value)?),
        }
        Ok(())
    }

    /// Print the result of a resource invocation
    pub fn resource_result(
        &self,
        resource: &str,
        state: State,
        result: &ResourceOutput,
    ) -> anyhow::Result<()> {
        if self.format != OutputFormat::Human {
            return self.print_document(result);
        }

        let status = if result.changed {
            "changed".yellow().to_string()
        } else {
            "ok".green().to_string()
        };
        println!("{}: [{}] state={}", status, resource.bright_white().bold(), state);

        if let Some(commands) = result.commands.as_ref().or(result.rendered.as_ref()) {
            let label = if result.rendered.is_some() { "rendered" } else { "commands" };
            self.section(label);
            if commands.is_empty() {
                println!("  {}", "(none)".bright_black());
            }
            for command in commands {
                println!("  {}", command);
            }
        }

        for (label, facts) in [("gathered", &result.gathered), ("parsed", &result.parsed)] {
            if let Some(facts) = facts {
                self.section(label);
                print!("{}", serde_yaml::to_string(facts)?);
            }
        }

        if self.verbosity >= 1 {
            if let Some(before) = &result.before {
                self.section("before");
                print!("{}", serde_yaml::to_string(before)?);
            }
        }

        if let Some(diff) = &result.diff {
            self.section("diff");
            println!("{}", colorize(diff));
            if let (Some(before), Some(after)) = (&result.before, &result.after) {
                let stats = facts_diff(before, after)?.stats;
                println!("{} ({})", stats.short_summary_colored(), stats);
            }
        }
        Ok(())
    }

    /// Print the registered resources
    pub fn resource_list(&self, resources: &[ResourceSummary]) -> anyhow::Result<()> {
        if self.format != OutputFormat::Human {
            return self.print_document(&resources);
        }

        self.section("RESOURCES");
        let width = resources.iter().map(|r| r.name.len()).max().unwrap_or(0);
        for resource in resources {
            let name = format!("{:<width$}", resource.name, width = width);
            println!("  {}  {}", name.bold(), resource.description);
            println!(
                "  {:<width$}  {}",
                "",
                resource.states.join(", ").bright_black(),
                width = width
            );
        }
        Ok(())
    }
}
