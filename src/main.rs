//! netres - declarative network resource configuration
//!
//! This is the main entry point for the netres CLI.

mod cli;

use anyhow::Result;
use cli::commands::CommandContext;
use cli::{Cli, Commands};
use netres::config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let config = Config::load(cli.config.as_deref());
    let log_level = match &config {
        Ok(config) => config.logging.log_level.clone(),
        Err(_) => "warn".to_string(),
    };
    init_logging(cli.verbosity(), &log_level);

    if cli.verbosity() >= 2 {
        eprintln!("netres v{}", VERSION);
    }

    let config = config.unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {:#}", e);
        Config::default()
    });

    let mut ctx = CommandContext::new(&cli, config)?;

    let exit_code = match &cli.command {
        Commands::Run(args) => args.execute(&mut ctx)?,
        Commands::List(args) => args.execute(&mut ctx)?,
    };

    std::process::exit(exit_code);
}

/// Initialize logging: `RUST_LOG` wins, then `-v`, then the configured level
fn init_logging(verbosity: u8, configured: &str) {
    let filter = match verbosity {
        0 => configured,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(verbosity >= 3))
        .with(env_filter)
        .init();
}
