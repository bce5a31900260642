// src/server/initialization.rs

//! Handles bridge initialization: configuration checks, state setup and binding the
//! three endpoint listeners.

use super::context::ServerContext;
use crate::config::Config;
use crate::core::Role;
use crate::core::state::{BridgeState, LogReloadHandle};
use anyhow::{Context, Result, anyhow};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Initializes all bridge components before any task is started.
///
/// An endpoint whose listener cannot be bound is logged and marked as not started;
/// the others are still served. Startup fails only when no endpoint could be bound.
pub async fn setup(
    config: Config,
    log_reload_handle: Option<Arc<LogReloadHandle>>,
) -> Result<ServerContext> {
    config.validate()?;
    log_startup_info(&config);

    let state = Arc::new(BridgeState::new(config, log_reload_handle));
    info!("Bridge state initialized.");

    let mut listeners = Vec::with_capacity(3);
    for role in Role::iter() {
        let endpoint = state.config.endpoints.get(role);
        let (host, port) = endpoint.bind_addr();
        let bound = bind_listener(host, port)
            .await
            .with_context(|| format!("Failed to bind {role} endpoint on {host}:{port}"));
        match bound {
            Ok((listener, local_addr)) => {
                state.endpoints.set_local_addr(role, local_addr);
                info!("{} server listening on {}", role, local_addr);
                listeners.push((role, listener));
            }
            Err(e) => {
                error!("{:#}. The {} endpoint will not be started.", e, role);
                state.endpoints.set_not_started(role);
            }
        }
    }

    if listeners.is_empty() {
        return Err(anyhow!("No endpoint could be bound; the bridge cannot start"));
    }

    Ok(ServerContext {
        state,
        listeners,
        tasks: JoinSet::new(),
    })
}

async fn bind_listener(host: &str, port: u16) -> io::Result<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind((host, port)).await?;
    let local_addr = listener.local_addr()?;
    Ok((listener, local_addr))
}

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &Config) {
    info!("boardlink {} starting.", env!("CARGO_PKG_VERSION"));
    for role in Role::iter() {
        let endpoint = config.endpoints.get(role);
        info!(
            "{} endpoint: {}:{} (read timeout {}s)",
            role, endpoint.host, endpoint.port, endpoint.read_timeout_secs
        );
    }
    info!(
        "Sensor buffer holds {} readings; command responses time out after {}s.",
        config.sensor_buffer_capacity, config.command_timeout_secs
    );
    info!("Maximum frame length is {} bytes.", config.max_frame_len);
}
