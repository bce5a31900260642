// tests/integration/lifecycle_test.rs

use super::test_helpers::{
    TestBridge, prefixed, read_raw, send, test_config, wait_for_close, wait_until,
};
use boardlink::BridgeServer;
use boardlink::core::Role;
use boardlink::core::state::EndpointStatus;
use tokio::net::TcpListener;

#[tokio::test]
async fn test_all_endpoints_listen_on_start() {
    let bridge = TestBridge::start().await;
    let statuses = bridge.handle.endpoint_statuses();
    assert_eq!(statuses.len(), 3);
    for (_, status) in statuses {
        assert_eq!(status, EndpointStatus::Listening);
    }
    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bind_failure_only_stops_that_endpoint() {
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = test_config();
    config.endpoints.realtime_data.port = occupied.local_addr().unwrap().port();

    let bridge = TestBridge::with_config(config).await;
    assert_eq!(
        bridge.handle.endpoint_status(Role::RealtimeData),
        EndpointStatus::NotStarted
    );
    assert!(bridge.handle.endpoint_info(Role::RealtimeData).local_addr.is_none());

    // The other two endpoints serve normally.
    let mut board = bridge.connect(Role::NodeUpdate).await;
    send(&mut board, &prefixed(b"dev1:active|n1")).await;
    assert!(wait_until(|| bridge.handle.snapshot_devices().contains_key("dev1")).await);

    let mut commands = bridge.connect(Role::CommandHandler).await;
    assert!(wait_until(|| bridge.handle.dispatcher.is_connected()).await);
    bridge.handle.submit_command("GN").unwrap();
    assert_eq!(read_raw(&mut commands, 2).await, "GN");

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_startup_fails_when_no_endpoint_binds() {
    let mut occupied = Vec::new();
    let mut config = test_config();
    for role in [Role::NodeUpdate, Role::CommandHandler, Role::RealtimeData] {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        config.endpoints.get_mut(role).port = listener.local_addr().unwrap().port();
        occupied.push(listener);
    }

    let result = BridgeServer::bind(config, None).await;
    let err = result.err().expect("binding only occupied ports must fail");
    assert!(err.to_string().contains("No endpoint could be bound"));
}

#[tokio::test]
async fn test_reconnect_is_isolated_per_endpoint() {
    let bridge = TestBridge::start().await;
    let _realtime = bridge.connect(Role::RealtimeData).await;
    let board = bridge.connect(Role::NodeUpdate).await;
    bridge
        .wait_for_status(Role::NodeUpdate, EndpointStatus::Connected)
        .await;

    drop(board);
    bridge
        .wait_for_status(Role::NodeUpdate, EndpointStatus::Listening)
        .await;
    assert_eq!(
        bridge.handle.endpoint_status(Role::RealtimeData),
        EndpointStatus::Connected
    );
    assert_eq!(
        bridge.handle.endpoint_status(Role::CommandHandler),
        EndpointStatus::Listening
    );

    let mut board = bridge.connect(Role::NodeUpdate).await;
    send(&mut board, &prefixed(b"dev1:active|")).await;
    assert!(wait_until(|| bridge.handle.snapshot_devices().contains_key("dev1")).await);
    assert_eq!(bridge.handle.stats(Role::NodeUpdate).sessions_accepted, 2);

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_over_limit_frame_closes_session() {
    let mut config = test_config();
    config.max_frame_len = 64;
    let bridge = TestBridge::with_config(config).await;
    let mut board = bridge.connect(Role::RealtimeData).await;

    send(&mut board, &prefixed(b"a:1")).await;
    assert!(wait_until(|| bridge.handle.store.sensor_reading_count() == 1).await);

    send(&mut board, &1000u32.to_be_bytes()).await;
    assert!(wait_for_close(&mut board).await);
    assert_eq!(bridge.handle.stats(Role::RealtimeData).framing_errors, 1);

    // The endpoint accepts a new base board afterwards.
    let mut board = bridge.connect(Role::RealtimeData).await;
    send(&mut board, &prefixed(b"b:2")).await;
    assert!(wait_until(|| bridge.handle.store.sensor_reading_count() == 2).await);

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_utf8_frame_closes_session() {
    let bridge = TestBridge::start().await;
    let mut board = bridge.connect(Role::NodeUpdate).await;

    send(&mut board, &prefixed(&[0xff, 0xfe, 0xfd])).await;
    assert!(wait_for_close(&mut board).await);
    assert_eq!(bridge.handle.stats(Role::NodeUpdate).framing_errors, 1);
    bridge
        .wait_for_status(Role::NodeUpdate, EndpointStatus::Listening)
        .await;

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_silent_session_times_out() {
    let mut config = test_config();
    config.endpoints.node_update.read_timeout_secs = 1;
    let bridge = TestBridge::with_config(config).await;
    let mut board = bridge.connect(Role::NodeUpdate).await;

    assert!(wait_for_close(&mut board).await);
    bridge
        .wait_for_status(Role::NodeUpdate, EndpointStatus::Listening)
        .await;

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_incomplete_length_header_falls_back_to_raw_text() {
    let mut config = test_config();
    config.endpoints.realtime_data.read_timeout_secs = 1;
    let bridge = TestBridge::with_config(config).await;
    let mut board = bridge.connect(Role::RealtimeData).await;

    // Declares 20 bytes but only 6 ever arrive.
    let mut bytes = 20u32.to_be_bytes().to_vec();
    bytes.extend_from_slice(b"ab:1.5");
    send(&mut board, &bytes).await;

    assert!(wait_until(|| bridge.handle.stats(Role::RealtimeData).frames_received == 1).await);
    assert_eq!(bridge.handle.stats(Role::RealtimeData).framing_errors, 0);
    let readings = bridge.handle.snapshot_sensor_readings(1);
    assert_eq!(readings.len(), 1);
    assert!(readings[0].device_id.ends_with("ab"));

    bridge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_sessions_and_joins_tasks() {
    let bridge = TestBridge::start().await;
    let mut board = bridge.connect(Role::CommandHandler).await;

    let handle = bridge.handle.clone();
    let concurrent = tokio::spawn(async move { handle.request_shutdown() });
    bridge.handle.request_shutdown();
    concurrent.await.unwrap();

    assert!(bridge.handle.is_shutting_down());
    assert!(wait_for_close(&mut board).await);
    bridge.shutdown().await.unwrap();
}
