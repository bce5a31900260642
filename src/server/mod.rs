// src/server/mod.rs

//! Startup, task orchestration and shutdown of the three bridge endpoints.

use crate::config::Config;
use crate::core::Role;
use crate::core::state::{BridgeHandle, LogReloadHandle};
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;

mod context;
mod endpoint_loop;
mod initialization;
mod spawner;
mod supervisor;

use context::ServerContext;

/// A bridge whose listeners are bound but whose tasks have not started yet.
///
/// Binding and running are separate steps so callers can read the actual local
/// addresses (for example when ports are 0) and grab a handle before serving.
pub struct BridgeServer {
    ctx: ServerContext,
}

impl BridgeServer {
    /// Validates `config`, builds the shared state and binds the three endpoints.
    /// An endpoint that cannot be bound is left out; fails only if none could be.
    pub async fn bind(
        config: Config,
        log_reload_handle: Option<Arc<LogReloadHandle>>,
    ) -> Result<Self> {
        let ctx = initialization::setup(config, log_reload_handle).await?;
        Ok(Self { ctx })
    }

    /// The handle collaborators use to submit commands and read snapshots.
    pub fn handle(&self) -> BridgeHandle {
        self.ctx.state.clone()
    }

    /// The address an endpoint is actually bound to.
    pub fn local_addr(&self, role: Role) -> Option<SocketAddr> {
        self.ctx.state.endpoints.info(role).local_addr
    }

    /// Serves until shutdown is requested and every task has been joined.
    pub async fn run(mut self) -> Result<()> {
        spawner::spawn_all(&mut self.ctx);
        supervisor::run(self.ctx).await
    }
}

/// The main bridge startup function: binds the endpoints, then serves until
/// shutdown.
pub async fn run(config: Config, log_reload_handle: Option<Arc<LogReloadHandle>>) -> Result<()> {
    BridgeServer::bind(config, log_reload_handle)
        .await?
        .run()
        .await
}
