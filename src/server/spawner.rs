// src/server/spawner.rs

//! Spawns all of the bridge's long-running tasks.

use super::context::ServerContext;
use super::endpoint_loop;
use crate::core::tasks::command_timeout::CommandTimeoutTask;
use crate::shell::Shell;
use tracing::info;

/// Spawns the endpoint, sweep and shell tasks into the context's JoinSet. Every
/// task subscribes to the shutdown broadcast before it is spawned.
pub fn spawn_all(ctx: &mut ServerContext) {
    let state = &ctx.state;
    let tasks = &mut ctx.tasks;

    // --- Endpoints ---
    for (role, listener) in ctx.listeners.drain(..) {
        let endpoint_state = state.clone();
        let shutdown_rx = state.shutdown.subscribe();
        tasks.spawn(async move {
            endpoint_loop::run(role, listener, endpoint_state, shutdown_rx).await;
            Ok(())
        });
    }

    // --- Command timeout sweep ---
    let sweeper = CommandTimeoutTask::new(state.dispatcher.clone());
    let shutdown_rx_sweep = state.shutdown.subscribe();
    tasks.spawn(async move {
        sweeper.run(shutdown_rx_sweep).await;
        Ok(())
    });

    // --- Interactive shell ---
    if state.config.shell.enabled {
        let shell = Shell::new(state.clone());
        let shutdown_rx_shell = state.shutdown.subscribe();
        tasks.spawn(async move {
            shell.run(shutdown_rx_shell).await;
            Ok(())
        });
    } else {
        info!("Interactive shell is disabled in the configuration.");
    }
}
