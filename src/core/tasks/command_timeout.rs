// src/core/tasks/command_timeout.rs

//! Background sweep that expires commands the base board never answered.

use crate::core::dispatcher::CommandDispatcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Upper bound on the sweep period, so short timeouts are still honoured promptly.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_millis(250);

/// A task that periodically clears a pending command whose response never came.
pub struct CommandTimeoutTask {
    dispatcher: Arc<CommandDispatcher>,
}

impl CommandTimeoutTask {
    pub fn new(dispatcher: Arc<CommandDispatcher>) -> Self {
        Self { dispatcher }
    }

    fn sweep_interval(&self) -> Duration {
        (self.dispatcher.response_timeout() / 4)
            .clamp(Duration::from_millis(10), MAX_SWEEP_INTERVAL)
    }

    /// Runs the main loop for the sweeper.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(self.sweep_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        debug!("Command timeout sweeper started.");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Some(expired) = self.dispatcher.expire_stale() {
                        debug!("Cleared timed out command '{}'.", expired.text);
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Command timeout sweeper shutting down.");
                    return;
                }
            }
        }
    }
}
