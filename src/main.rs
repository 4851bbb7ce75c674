//! rfcd - Remote Function Call Daemon
//!
//! This is the main entry point for the rfcd server.
//! It loads the configuration, builds the command registry and serves
//! connections until interrupted.

use clap::Parser;
use rfcd::config::DEFAULT_CONFIG_PATH;
use rfcd::{Config, Registry, Server};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Remote function call daemon
#[derive(Parser, Debug)]
#[command(name = "rfcd")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the configured verbosity (0-3)
    #[arg(short, long)]
    verbosity: Option<u8>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Reading configuration {} failed: {}", args.config.display(), e);
            std::process::exit(1);
        }
    };
    if let Some(verbosity) = args.verbosity {
        config.verbosity = verbosity;
    }

    // Set up logging, RUST_LOG wins over the configured verbosity
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(config.log_level().into()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    info!("rfcd v{}", rfcd::VERSION);

    // Resolve every configured command before serving anything
    let registry = match Registry::build(&config.command_configs) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("Building command registry failed: {}", e);
            eprintln!("Building command registry failed: {}", e);
            std::process::exit(1);
        }
    };
    info!("Registered {} command(s)", registry.len());

    let config = Arc::new(config);
    let server = match Server::bind(Arc::clone(&config), registry).await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Opening server on {} failed: {}", config.bind_address(), e);
            std::process::exit(1);
        }
    };

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server...");
    };

    tokio::select! {
        _ = server.run() => {}
        _ = shutdown => {}
    }

    info!("Server shutdown complete");
    Ok(())
}
