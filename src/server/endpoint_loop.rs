// src/server/endpoint_loop.rs

//! The accept loop of one endpoint. Each endpoint serves a single base board
//! session at a time and listens again as soon as that session closes.

use crate::connection::{CloseReason, ConnectionHandler};
use crate::core::Role;
use crate::core::state::BridgeState;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{Instrument, debug, error, info, info_span};

/// Delay before retrying after a failed `accept`.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Runs the endpoint until shutdown is requested.
pub async fn run(
    role: Role,
    listener: TcpListener,
    state: Arc<BridgeState>,
    shutdown_rx: broadcast::Receiver<()>,
) {
    accept_loop(role, listener, state, shutdown_rx)
        .instrument(info_span!("endpoint", role = %role))
        .await
}

async fn accept_loop(
    role: Role,
    listener: TcpListener,
    state: Arc<BridgeState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        if state.is_shutting_down() {
            break;
        }
        state.endpoints.set_listening(role);
        debug!("Waiting for base board connection.");

        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            res = listener.accept() => match res {
                Ok((socket, addr)) => {
                    info!("Accepted base board connection from {}", addr);
                    let session_id = state.next_session_id();
                    let handler = ConnectionHandler::new(socket, addr, role, state.clone(), session_id);
                    if let CloseReason::Shutdown = handler.run(&mut shutdown_rx).await {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to accept connection: {}. Retrying in {:?}.", e, ACCEPT_RETRY_DELAY);
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = tokio::time::sleep(ACCEPT_RETRY_DELAY) => {}
                    }
                }
            }
        }
    }
    info!("{} server stopped.", role);
}
