// src/core/state/core.rs

//! Defines the central `BridgeState` struct, holding all state shared between the
//! endpoints, the shell and any embedding caller.

use super::endpoint::{EndpointInfo, EndpointRegistry, EndpointStatus};
use super::sensors::SensorReading;
use super::shutdown::ShutdownSignal;
use super::stats::{EndpointStats, StatsState};
use super::store::{DeviceMap, SharedStore};
use crate::config::Config;
use crate::core::Role;
use crate::core::dispatcher::{Accepted, CommandDispatcher, CommandEvent, PendingCommand};
use crate::core::errors::CommandError;
use crate::core::payload::CommandResponse;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, reload};

pub type LogReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

/// The handle collaborators hold on to.
pub type BridgeHandle = Arc<BridgeState>;

/// The central struct holding all shared, process-wide state.
/// It is wrapped in an `Arc` and passed to every endpoint task, session and the
/// shell; nothing here is reachable as an ambient global.
#[derive(Debug)]
pub struct BridgeState {
    /// The validated configuration. Immutable after startup.
    pub config: Arc<Config>,
    /// Device map, broadcast nodes, sensor readings and the last command response.
    pub store: Arc<SharedStore>,
    /// Outbound commands and response matching for the CommandHandler endpoint.
    pub dispatcher: Arc<CommandDispatcher>,
    /// Connection status of each endpoint.
    pub endpoints: EndpointRegistry,
    /// Per-endpoint counters.
    pub stats: StatsState,
    /// Stops every task when triggered.
    pub shutdown: ShutdownSignal,
    /// A handle to the logging filter, allowing the shell to change log levels.
    pub log_reload_handle: Option<Arc<LogReloadHandle>>,
    session_id_counter: AtomicU64,
}

impl BridgeState {
    /// Builds the shared state from a validated configuration.
    pub fn new(config: Config, log_reload_handle: Option<Arc<LogReloadHandle>>) -> Self {
        let store = Arc::new(SharedStore::new(config.sensor_buffer_capacity));
        let dispatcher = Arc::new(CommandDispatcher::new(
            store.clone(),
            config.command_timeout(),
        ));
        Self {
            config: Arc::new(config),
            store,
            dispatcher,
            endpoints: EndpointRegistry::new(),
            stats: StatsState::new(),
            shutdown: ShutdownSignal::new(),
            log_reload_handle,
            session_id_counter: AtomicU64::new(0),
        }
    }

    /// Allocates a process-unique session id.
    pub fn next_session_id(&self) -> u64 {
        self.session_id_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    // --- Collaborator interface ---

    pub fn submit_command(&self, text: &str) -> Result<Accepted, CommandError> {
        self.dispatcher.submit(text)
    }

    pub fn pending_command(&self) -> Option<PendingCommand> {
        self.dispatcher.pending()
    }

    pub fn subscribe_command_events(&self) -> broadcast::Receiver<CommandEvent> {
        self.dispatcher.subscribe()
    }

    pub fn snapshot_devices(&self) -> DeviceMap {
        self.store.snapshot_devices()
    }

    pub fn snapshot_broadcast_nodes(&self) -> Vec<String> {
        self.store.snapshot_broadcast_nodes()
    }

    pub fn snapshot_sensor_readings(&self, limit: usize) -> Vec<SensorReading> {
        self.store.snapshot_sensor_readings(limit)
    }

    pub fn snapshot_last_response(&self) -> Option<CommandResponse> {
        self.store.snapshot_last_response()
    }

    pub fn endpoint_status(&self, role: Role) -> EndpointStatus {
        self.endpoints.status(role)
    }

    /// Status of all three endpoints, in role order.
    pub fn endpoint_statuses(&self) -> [(Role, EndpointStatus); 3] {
        [Role::NodeUpdate, Role::CommandHandler, Role::RealtimeData]
            .map(|role| (role, self.endpoints.status(role)))
    }

    pub fn endpoint_info(&self, role: Role) -> EndpointInfo {
        self.endpoints.info(role)
    }

    pub fn stats(&self, role: Role) -> EndpointStats {
        self.stats.get(role)
    }

    /// Starts the shutdown sequence. Safe to call any number of times from any task.
    pub fn request_shutdown(&self) {
        if self.shutdown.trigger() {
            info!("Shutdown requested.");
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_requested()
    }
}
