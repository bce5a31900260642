// src/core/state/mod.rs

//! Defines the central `BridgeState` struct and all related state components.

mod core;
mod endpoint;
mod sensors;
mod shutdown;
mod stats;
mod store;

pub use self::core::{BridgeHandle, BridgeState, LogReloadHandle};
pub use endpoint::{EndpointInfo, EndpointRegistry, EndpointStatus};
pub use sensors::{DEFAULT_SENSOR_CAPACITY, SensorBuffer, SensorReading};
pub use shutdown::ShutdownSignal;
pub use stats::{EndpointStats, StatsState};
pub use store::{DeviceMap, SharedStore};
