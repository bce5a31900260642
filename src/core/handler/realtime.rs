// src/core/handler/realtime.rs

use crate::core::BridgeError;
use crate::core::payload::parse_sensor_frame;
use crate::core::state::{SensorReading, SharedStore};
use chrono::Local;
use tracing::debug;

/// Parses a RealtimeData frame and appends one reading per key.
/// Returns the number of readings appended.
pub fn apply(store: &SharedStore, text: &str) -> Result<usize, BridgeError> {
    let readings = parse_sensor_frame(text)?;
    let captured_at = Local::now();
    let count = readings.len();

    let mut evicted = 0;
    for (device_id, value) in readings {
        let reading = SensorReading {
            device_id,
            value,
            captured_at,
        };
        if store.append_sensor_reading(reading) {
            evicted += 1;
        }
    }

    debug!(
        "Stored {} sensor readings ({} evicted, {} buffered).",
        count,
        evicted,
        store.sensor_reading_count()
    );
    Ok(count)
}
