// tests/integration/test_helpers.rs

//! Test helpers for running a real bridge on loopback and playing the base board.

use boardlink::BridgeServer;
use boardlink::config::Config;
use boardlink::core::Role;
use boardlink::core::state::{BridgeHandle, EndpointStatus};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, reload};

/// How long `wait_until` polls before giving up.
pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// A bridge serving on ephemeral loopback ports.
pub struct TestBridge {
    pub handle: BridgeHandle,
    /// `None` for an endpoint that could not be bound.
    addrs: [Option<SocketAddr>; 3],
    task: JoinHandle<anyhow::Result<()>>,
}

/// A configuration suitable for tests: loopback, ephemeral ports, no shell.
pub fn test_config() -> Config {
    let mut config = Config::default();
    for role in [Role::NodeUpdate, Role::CommandHandler, Role::RealtimeData] {
        let endpoint = config.endpoints.get_mut(role);
        endpoint.host = "127.0.0.1".to_string();
        endpoint.port = 0;
        endpoint.read_timeout_secs = 5;
    }
    config.command_timeout_secs = 5;
    config.shell.enabled = false;
    config
}

impl TestBridge {
    pub async fn start() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let (filter, _reload_handle) = reload::Layer::new(EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();

        let server = BridgeServer::bind(config, None)
            .await
            .expect("Failed to bind test bridge");
        let addrs = [Role::NodeUpdate, Role::CommandHandler, Role::RealtimeData]
            .map(|role| server.local_addr(role));
        let handle = server.handle();
        let task = tokio::spawn(server.run());

        let bridge = Self {
            handle,
            addrs,
            task,
        };
        for role in [Role::NodeUpdate, Role::CommandHandler, Role::RealtimeData] {
            if bridge.addr_of(role).is_some() {
                bridge.wait_for_status(role, EndpointStatus::Listening).await;
            }
        }
        bridge
    }

    fn addr_of(&self, role: Role) -> Option<SocketAddr> {
        match role {
            Role::NodeUpdate => self.addrs[0],
            Role::CommandHandler => self.addrs[1],
            Role::RealtimeData => self.addrs[2],
        }
    }

    pub fn addr(&self, role: Role) -> SocketAddr {
        self.addr_of(role)
            .unwrap_or_else(|| panic!("{role} endpoint is not bound"))
    }

    /// Connects as the base board and waits until the endpoint reports the session.
    pub async fn connect(&self, role: Role) -> TcpStream {
        let before = self.handle.stats(role).sessions_accepted;
        let stream = TcpStream::connect(self.addr(role))
            .await
            .expect("Failed to connect to endpoint");
        assert!(
            wait_until(|| self.handle.stats(role).sessions_accepted > before).await,
            "{role} endpoint never accepted the connection"
        );
        stream
    }

    pub async fn wait_for_status(&self, role: Role, status: EndpointStatus) {
        assert!(
            wait_until(|| self.handle.endpoint_status(role) == status).await,
            "{role} endpoint never reached {status}"
        );
    }

    /// Requests shutdown and waits for every task to be joined.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.handle.request_shutdown();
        tokio::time::timeout(WAIT_LIMIT, self.task)
            .await
            .expect("bridge did not shut down in time")
            .expect("bridge task panicked")
    }
}

/// Polls `condition` every 10 ms until it holds or `WAIT_LIMIT` passes.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Builds a length-prefixed frame.
pub fn prefixed(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Writes bytes as the base board.
pub async fn send(stream: &mut TcpStream, bytes: &[u8]) {
    stream.write_all(bytes).await.expect("write failed");
    stream.flush().await.expect("flush failed");
}

/// Reads one length-prefixed frame sent by the bridge.
pub async fn read_prefixed(stream: &mut TcpStream) -> String {
    let mut header = [0u8; 4];
    tokio::time::timeout(WAIT_LIMIT, stream.read_exact(&mut header))
        .await
        .expect("timed out reading frame header")
        .expect("read failed");
    let mut payload = vec![0u8; u32::from_be_bytes(header) as usize];
    tokio::time::timeout(WAIT_LIMIT, stream.read_exact(&mut payload))
        .await
        .expect("timed out reading frame payload")
        .expect("read failed");
    String::from_utf8(payload).expect("frame is not UTF-8")
}

/// Reads exactly `len` raw bytes sent by the bridge.
pub async fn read_raw(stream: &mut TcpStream, len: usize) -> String {
    let mut buf = vec![0u8; len];
    tokio::time::timeout(WAIT_LIMIT, stream.read_exact(&mut buf))
        .await
        .expect("timed out reading raw bytes")
        .expect("read failed");
    String::from_utf8(buf).expect("raw bytes are not UTF-8")
}

/// True once the bridge has closed the connection.
pub async fn wait_for_close(stream: &mut TcpStream) -> bool {
    let mut buf = [0u8; 64];
    loop {
        match tokio::time::timeout(WAIT_LIMIT, stream.read(&mut buf)).await {
            Ok(Ok(0)) | Ok(Err(_)) => return true,
            Ok(Ok(_)) => continue,
            Err(_) => return false,
        }
    }
}
