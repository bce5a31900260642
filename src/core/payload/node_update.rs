// src/core/payload/node_update.rs

//! Parses NodeUpdate frames into a full device/broadcast-node state.
//!
//! Two encodings are accepted:
//! - JSON: `{"devices": {"dev1": "active"}, "broadcast_nodes": ["node1"]}`
//! - simple: `dev1:active,dev2:deactive|node1,node2`

use crate::core::BridgeError;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Connection status reported by the base board for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceStatus {
    Active,
    Deactive,
}

impl DeviceStatus {
    pub fn is_active(self) -> bool {
        self == DeviceStatus::Active
    }
}

impl FromStr for DeviceStatus {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("active") {
            Ok(DeviceStatus::Active)
        } else if trimmed.eq_ignore_ascii_case("deactive") {
            Ok(DeviceStatus::Deactive)
        } else {
            Err(BridgeError::UnknownDeviceStatus(trimmed.to_string()))
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStatus::Active => f.write_str("active"),
            DeviceStatus::Deactive => f.write_str("deactive"),
        }
    }
}

// Accepts any casing, so it cannot be a plain derive.
impl<'de> Deserialize<'de> for DeviceStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The complete device state carried by one NodeUpdate frame.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeUpdate {
    pub devices: IndexMap<String, DeviceStatus>,
    pub broadcast_nodes: Vec<String>,
}

impl NodeUpdate {
    /// Parses a frame payload, trying JSON first and the simple format second.
    pub fn parse(text: &str) -> Result<Self, BridgeError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(BridgeError::MalformedPayload("empty node update".into()));
        }
        match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(value) => Ok(serde_json::from_value(value)?),
            Err(_) => Self::parse_simple(trimmed),
        }
    }

    /// Parses `dev:status,dev:status|node,node`. Both halves must be present,
    /// although either may be empty.
    fn parse_simple(text: &str) -> Result<Self, BridgeError> {
        let (devices_part, nodes_part) = text.split_once('|').ok_or_else(|| {
            BridgeError::MalformedPayload("simple node update is missing the '|' separator".into())
        })?;

        let mut devices = IndexMap::new();
        for entry in devices_part.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (device_id, status) = entry.split_once(':').ok_or_else(|| {
                BridgeError::MalformedPayload(format!("device entry '{entry}' has no ':'"))
            })?;
            let device_id = device_id.trim();
            if device_id.is_empty() {
                return Err(BridgeError::MalformedPayload(format!(
                    "device entry '{entry}' has an empty id"
                )));
            }
            devices.insert(device_id.to_string(), status.parse()?);
        }

        let broadcast_nodes = nodes_part
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            devices,
            broadcast_nodes,
        })
    }

    pub fn active_count(&self) -> usize {
        self.devices.values().filter(|s| s.is_active()).count()
    }
}
