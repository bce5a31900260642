// src/server/supervisor.rs

//! Waits for a shutdown trigger and then joins every task of the bridge.

use super::context::ServerContext;
use anyhow::{Context, Result, anyhow};
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};

/// How long tasks get to finish after shutdown before they are aborted.
const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Runs until shutdown is requested by a signal, the shell, an embedding caller or
/// a failing task, then stops and joins all tasks.
pub async fn run(mut ctx: ServerContext) -> Result<()> {
    let mut sigint =
        signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;

    let mut failure = None;
    loop {
        tokio::select! {
            biased;

            _ = sigint.recv() => {
                info!("SIGINT received, initiating graceful shutdown.");
                break;
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, initiating graceful shutdown.");
                break;
            }
            _ = ctx.state.shutdown.wait() => break,

            Some(res) = ctx.tasks.join_next() => {
                match res {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        error!("CRITICAL: Task failed: {}. Shutting down.", e);
                        failure = Some(e);
                        break;
                    }
                    Err(e) => {
                        error!("CRITICAL: Task panicked: {e:?}. Shutting down.");
                        failure = Some(anyhow!("task panicked: {e}"));
                        break;
                    }
                }
            }
        }
    }

    ctx.state.request_shutdown();

    info!("Waiting for tasks to finish...");
    let joined = tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, async {
        while let Some(res) = ctx.tasks.join_next().await {
            match res {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Task failed during shutdown: {}", e),
                Err(e) if e.is_panic() => error!("Task panicked during shutdown: {e:?}"),
                Err(_) => {}
            }
        }
    })
    .await;
    if joined.is_err() {
        warn!("Timed out waiting for tasks to finish cleanly. Aborting the rest.");
        ctx.tasks.shutdown().await;
    }
    info!("Bridge shutdown complete.");

    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
