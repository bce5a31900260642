// tests/integration/realtime_test.rs

use super::test_helpers::{TestBridge, prefixed, send, test_config, wait_until};
use boardlink::core::Role;
use boardlink::core::payload::SensorValue;
use std::time::Duration;

#[tokio::test]
async fn test_raw_sensor_frame_is_stored() {
    let bridge = TestBridge::start().await;
    let mut board = bridge.connect(Role::RealtimeData).await;

    send(&mut board, br#"{"21001A0012505037": "1195.0", "dev2": "open"}"#).await;
    assert!(wait_until(|| bridge.handle.store.sensor_reading_count() == 2).await);

    let readings = bridge.handle.snapshot_sensor_readings(10);
    assert_eq!(readings[0].device_id, "21001A0012505037");
    assert_eq!(readings[0].value, SensorValue::Number(1195.0));
    assert_eq!(readings[1].value, SensorValue::Text("open".to_string()));
    // Readings from one frame share a timestamp.
    assert_eq!(readings[0].captured_at, readings[1].captured_at);

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_buffer_evicts_oldest_readings() {
    let mut config = test_config();
    config.sensor_buffer_capacity = 3;
    let bridge = TestBridge::with_config(config).await;
    let mut board = bridge.connect(Role::RealtimeData).await;

    let mut bytes = prefixed(b"a:1,b:2");
    bytes.extend_from_slice(&prefixed(br#"{"c": 3, "d": 4, "e": 5}"#));
    send(&mut board, &bytes).await;

    assert!(wait_until(|| bridge.handle.stats(Role::RealtimeData).frames_received == 2).await);
    let ids: Vec<String> = bridge
        .handle
        .snapshot_sensor_readings(10)
        .into_iter()
        .map(|r| r.device_id)
        .collect();
    assert_eq!(ids, vec!["c", "d", "e"]);
    assert_eq!(bridge.handle.store.sensor_readings_evicted(), 2);

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_nested_values_are_discarded() {
    let bridge = TestBridge::start().await;
    let mut board = bridge.connect(Role::RealtimeData).await;

    send(&mut board, &prefixed(br#"{"dev1": {"t": 1}}"#)).await;
    send(&mut board, &prefixed(br#"{"dev1": 7}"#)).await;

    assert!(wait_until(|| bridge.handle.stats(Role::RealtimeData).frames_received == 2).await);
    assert_eq!(bridge.handle.stats(Role::RealtimeData).frames_discarded, 1);
    let readings = bridge.handle.snapshot_sensor_readings(10);
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].value, SensorValue::Number(7.0));

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_length_header_split_across_writes() {
    let bridge = TestBridge::start().await;
    let mut board = bridge.connect(Role::RealtimeData).await;

    let frame = prefixed(b"temp:21.5");
    send(&mut board, &frame[..2]).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    send(&mut board, &frame[2..]).await;

    assert!(wait_until(|| bridge.handle.store.sensor_reading_count() == 1).await);
    let readings = bridge.handle.snapshot_sensor_readings(10);
    assert_eq!(readings[0].device_id, "temp");
    assert_eq!(readings[0].value, SensorValue::Number(21.5));
    assert_eq!(bridge.handle.stats(Role::RealtimeData).frames_discarded, 0);

    // The session stays length-prefixed for later frames.
    send(&mut board, &prefixed(b"hum:40")).await;
    assert!(wait_until(|| bridge.handle.store.sensor_reading_count() == 2).await);
    assert_eq!(bridge.handle.snapshot_sensor_readings(1)[0].device_id, "hum");

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_short_raw_message_is_stored_after_detection_wait() {
    let mut config = test_config();
    config.endpoints.realtime_data.read_timeout_secs = 1;
    let bridge = TestBridge::with_config(config).await;
    let mut board = bridge.connect(Role::RealtimeData).await;

    send(&mut board, b"a:1").await;

    assert!(wait_until(|| bridge.handle.store.sensor_reading_count() == 1).await);
    let readings = bridge.handle.snapshot_sensor_readings(1);
    assert_eq!(readings[0].device_id, "a");
    assert_eq!(readings[0].value, SensorValue::Number(1.0));

    bridge.shutdown().await.unwrap();
}
