// src/core/payload/mod.rs

//! Payload schemas carried inside frames, one module per endpoint role.

pub mod node_update;
pub mod response;
pub mod sensor;

pub use node_update::{DeviceStatus, NodeUpdate};
pub use response::{CommandResponse, Inbound, classify_inbound};
pub use sensor::{SensorValue, parse_sensor_frame};
