// src/connection/guard.rs

//! Defines `ConnectionGuard`, an RAII guard for session resource management.

use crate::core::Role;
use crate::core::state::BridgeState;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// An RAII guard that publishes a session as connected for its lifetime and always
/// undoes that when the session's scope is exited, however it exits.
pub struct ConnectionGuard {
    /// A shared reference to the bridge state.
    pub(crate) state: Arc<BridgeState>,
    pub(crate) role: Role,
    /// The unique identifier for the session.
    pub(crate) session_id: u64,
    /// The network address of the base board.
    pub(crate) addr: SocketAddr,
}

impl ConnectionGuard {
    /// Marks the endpoint connected and counts the session.
    pub(crate) fn new(
        state: Arc<BridgeState>,
        role: Role,
        session_id: u64,
        addr: SocketAddr,
    ) -> Self {
        state.endpoints.set_connected(role, session_id, addr);
        state.stats.increment_sessions(role);
        Self {
            state,
            role,
            session_id,
            addr,
        }
    }
}

impl Drop for ConnectionGuard {
    /// Detaches the session from the command dispatcher and marks the endpoint
    /// disconnected.
    fn drop(&mut self) {
        debug!(
            "ConnectionGuard dropping, cleaning up session {} from {}",
            self.session_id, self.addr
        );
        if self.role == Role::CommandHandler {
            self.state.dispatcher.detach(self.session_id);
        }
        self.state
            .endpoints
            .set_disconnected(self.role, self.session_id);
    }
}
