// src/core/handler/node_update.rs

use crate::core::BridgeError;
use crate::core::payload::NodeUpdate;
use crate::core::state::SharedStore;
use tracing::{debug, info};

/// Parses a NodeUpdate frame and replaces the stored node state with it.
pub fn apply(store: &SharedStore, text: &str) -> Result<(), BridgeError> {
    let update = NodeUpdate::parse(text)?;
    info!(
        "Node update applied: {} devices ({} active), {} broadcast nodes.",
        update.devices.len(),
        update.active_count(),
        update.broadcast_nodes.len()
    );
    for (device_id, status) in &update.devices {
        debug!("  {}: {}", device_id, status);
    }
    store.replace_node_state(update.devices, update.broadcast_nodes);
    Ok(())
}
