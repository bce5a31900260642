// src/server/context.rs

use crate::core::Role;
use crate::core::state::BridgeState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

/// Holds all the initialized state required to run the bridge's tasks.
pub struct ServerContext {
    pub state: Arc<BridgeState>,
    /// Bound listeners, taken by the spawner when the endpoint tasks start.
    pub listeners: Vec<(Role, TcpListener)>,
    pub tasks: JoinSet<Result<(), anyhow::Error>>,
}
