//! fodcache - content-addressed fetch cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use fodcache::cli::{Cli, Commands};
use fodcache::config::{Config, ConfigManager};
use fodcache::error::FodResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, config: &Config) {
    // 0 = warn, 1 = info, 2+ = debug
    let filter = match verbose {
        0 => EnvFilter::new("fodcache=warn"),
        1 => EnvFilter::new("fodcache=info"),
        _ => EnvFilter::new("fodcache=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}

async fn run() -> FodResult<()> {
    let cli = Cli::parse();

    let config_manager = if let Some(ref path) = cli.config {
        ConfigManager::with_path(path.clone())
    } else {
        ConfigManager::new()
    };

    let config = config_manager.load().await?;
    init_logging(cli.verbose, &config);
    debug!("Using config {}", config_manager.path().display());

    match cli.command {
        Commands::Fetch(args) => fodcache::cli::commands::fetch(args, &config).await,
        Commands::Path(args) => fodcache::cli::commands::path(args, &config).await,
        Commands::Sanitize(args) => fodcache::cli::commands::sanitize(args).await,
        Commands::Config(args) => {
            fodcache::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
