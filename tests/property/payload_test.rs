// tests/property/payload_test.rs

//! Property-based tests for payload parsing and the sensor ring buffer.

use boardlink::core::payload::{DeviceStatus, NodeUpdate, SensorValue, parse_sensor_frame};
use boardlink::core::state::{SensorBuffer, SensorReading};
use chrono::Local;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn status() -> impl Strategy<Value = DeviceStatus> {
    prop_oneof![Just(DeviceStatus::Active), Just(DeviceStatus::Deactive)]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 500,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_simple_node_update_parses_every_entry(
        devices in prop::collection::btree_map("dev[a-zA-Z0-9]{1,12}", status(), 0..16),
        nodes in prop::collection::vec("node[0-9]{1,4}", 0..8)
    ) {
        let device_part: Vec<String> = devices
            .iter()
            .map(|(id, status)| format!("{id}:{status}"))
            .collect();
        let text = format!("{}|{}", device_part.join(","), nodes.join(","));

        let update = NodeUpdate::parse(&text).unwrap();
        let parsed: BTreeMap<String, DeviceStatus> = update.devices.into_iter().collect();
        prop_assert_eq!(parsed, devices);
        prop_assert_eq!(update.broadcast_nodes, nodes);
    }

    #[test]
    fn test_json_node_update_matches_simple_form(
        devices in prop::collection::btree_map("dev[a-z0-9]{1,8}", status(), 1..8)
    ) {
        let json = serde_json::json!({
            "devices": devices.iter().map(|(k, v)| (k.clone(), v.to_string())).collect::<BTreeMap<_, _>>(),
            "broadcast_nodes": ["n1"],
        })
        .to_string();
        let simple: Vec<String> = devices.iter().map(|(k, v)| format!("{k}:{v}")).collect();
        let simple = format!("{}|n1", simple.join(","));

        prop_assert_eq!(NodeUpdate::parse(&json).unwrap(), NodeUpdate::parse(&simple).unwrap());
    }

    #[test]
    fn test_numeric_sensor_values_parse_as_numbers(
        readings in prop::collection::vec(("s[a-z0-9]{1,8}", -100_000i32..100_000), 1..16)
    ) {
        let text = readings
            .iter()
            .map(|(id, v)| format!("{id}:{v}"))
            .collect::<Vec<_>>()
            .join(",");

        let parsed = parse_sensor_frame(&text).unwrap();
        prop_assert_eq!(parsed.len(), readings.len());
        for ((id, value), (expected_id, expected)) in parsed.iter().zip(&readings) {
            prop_assert_eq!(id, expected_id);
            prop_assert_eq!(value, &SensorValue::Number(*expected as f64));
        }
    }

    #[test]
    fn test_sensor_buffer_never_exceeds_capacity(
        capacity in 1usize..64,
        pushes in 0usize..256
    ) {
        let mut buffer = SensorBuffer::new(capacity);
        for i in 0..pushes {
            buffer.push(SensorReading {
                device_id: format!("d{i}"),
                value: SensorValue::Number(i as f64),
                captured_at: Local::now(),
            });
            prop_assert!(buffer.len() <= capacity);
        }

        prop_assert_eq!(buffer.len(), pushes.min(capacity));
        prop_assert_eq!(buffer.evicted(), pushes.saturating_sub(capacity) as u64);
        if let Some(last) = buffer.latest(1).pop() {
            prop_assert_eq!(last.device_id, format!("d{}", pushes - 1));
        }
    }
}
