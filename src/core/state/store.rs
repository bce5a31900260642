// src/core/state/store.rs

//! Defines `SharedStore`, the lock-guarded containers that decouple endpoint I/O
//! from the shell and display.
//!
//! Every operation takes exactly one internal lock for its own duration and every
//! read returns an independent copy, so a reader rendering a snapshot never holds
//! up a session writing the next update.

use super::sensors::{SensorBuffer, SensorReading};
use crate::core::payload::{CommandResponse, DeviceStatus};
use indexmap::IndexMap;
use parking_lot::Mutex;

pub type DeviceMap = IndexMap<String, DeviceStatus>;

/// Devices and broadcast nodes are updated together by a NodeUpdate frame, so they
/// share one lock.
#[derive(Debug, Default)]
struct NodeState {
    devices: DeviceMap,
    broadcast_nodes: Vec<String>,
}

#[derive(Debug)]
pub struct SharedStore {
    nodes: Mutex<NodeState>,
    sensors: Mutex<SensorBuffer>,
    last_response: Mutex<Option<CommandResponse>>,
}

impl SharedStore {
    pub fn new(sensor_capacity: usize) -> Self {
        Self {
            nodes: Mutex::new(NodeState::default()),
            sensors: Mutex::new(SensorBuffer::new(sensor_capacity)),
            last_response: Mutex::new(None),
        }
    }

    /// Replaces the device map wholesale.
    pub fn replace_devices(&self, devices: DeviceMap) {
        self.nodes.lock().devices = devices;
    }

    /// Replaces the broadcast node list wholesale.
    pub fn replace_broadcast_nodes(&self, nodes: Vec<String>) {
        self.nodes.lock().broadcast_nodes = nodes;
    }

    /// Replaces both halves of the node state as one logical update.
    pub fn replace_node_state(&self, devices: DeviceMap, nodes: Vec<String>) {
        let mut guard = self.nodes.lock();
        guard.devices = devices;
        guard.broadcast_nodes = nodes;
    }

    /// Appends a reading, evicting the oldest when the buffer is full.
    /// Returns true if a reading was evicted.
    pub fn append_sensor_reading(&self, reading: SensorReading) -> bool {
        self.sensors.lock().push(reading).is_some()
    }

    pub fn set_last_response(&self, response: CommandResponse) {
        *self.last_response.lock() = Some(response);
    }

    pub fn snapshot_devices(&self) -> DeviceMap {
        self.nodes.lock().devices.clone()
    }

    pub fn snapshot_broadcast_nodes(&self) -> Vec<String> {
        self.nodes.lock().broadcast_nodes.clone()
    }

    /// Both halves of the node state, captured under one lock.
    pub fn snapshot_node_state(&self) -> (DeviceMap, Vec<String>) {
        let guard = self.nodes.lock();
        (guard.devices.clone(), guard.broadcast_nodes.clone())
    }

    /// The most recent `limit` readings, oldest first.
    pub fn snapshot_sensor_readings(&self, limit: usize) -> Vec<SensorReading> {
        self.sensors.lock().latest(limit)
    }

    pub fn snapshot_last_response(&self) -> Option<CommandResponse> {
        self.last_response.lock().clone()
    }

    pub fn sensor_reading_count(&self) -> usize {
        self.sensors.lock().len()
    }

    pub fn sensor_capacity(&self) -> usize {
        self.sensors.lock().capacity()
    }

    pub fn sensor_readings_evicted(&self) -> u64 {
        self.sensors.lock().evicted()
    }

    pub fn clear_sensor_readings(&self) {
        self.sensors.lock().clear();
    }
}
