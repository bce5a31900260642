// src/main.rs

//! The main entry point for the boardlink bridge.

use anyhow::Result;
use boardlink::config::Config;
use boardlink::server;
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, prelude::*, reload};

const DEFAULT_CONFIG_PATH: &str = "boardlink.toml";

#[tokio::main]
async fn main() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("boardlink version {VERSION}");
        return Ok(());
    }

    // An explicit --config must exist; the default path is optional.
    let explicit_path = match args.iter().position(|arg| arg == "--config") {
        Some(i) => match args.get(i + 1) {
            Some(path) => Some(path.as_str()),
            None => {
                eprintln!("--config flag requires a value");
                std::process::exit(1);
            }
        },
        None => None,
    };

    let config = match explicit_path {
        Some(path) => load_config(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => load_config(DEFAULT_CONFIG_PATH),
        None => Config::default(),
    };

    // RUST_LOG takes precedence over the configured level.
    let initial_log_level = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    let (filter, reload_handle) = reload::Layer::new(EnvFilter::new(initial_log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true),
        )
        .init();

    if explicit_path.is_none() && !Path::new(DEFAULT_CONFIG_PATH).exists() {
        info!("No {} found, using built-in defaults.", DEFAULT_CONFIG_PATH);
    }

    if let Err(e) = server::run(config, Some(Arc::new(reload_handle))).await {
        error!("Bridge runtime error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Loads the configuration, exiting the process if it cannot be used.
fn load_config(path: &str) -> Config {
    match Config::from_file(path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from \"{path}\": {e:#}");
            std::process::exit(1);
        }
    }
}
