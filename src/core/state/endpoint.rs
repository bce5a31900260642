// src/core/state/endpoint.rs

//! Tracks the connection status of each endpoint.

use crate::core::Role;
use chrono::{DateTime, Local};
use parking_lot::RwLock;
use std::fmt;
use std::net::SocketAddr;

/// Lifecycle of one endpoint as seen by collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointStatus {
    /// Waiting in accept for the base board.
    Listening,
    /// A session is open.
    Connected,
    /// The last session just closed; the endpoint is about to listen again.
    Disconnected,
    /// The listener could not be bound at startup. The endpoint never serves.
    NotStarted,
}

impl fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointStatus::Listening => f.write_str("Listening"),
            EndpointStatus::Connected => f.write_str("Connected"),
            EndpointStatus::Disconnected => f.write_str("Disconnected"),
            EndpointStatus::NotStarted => f.write_str("Not started"),
        }
    }
}

/// Status plus details about the current peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    pub role: Role,
    pub status: EndpointStatus,
    pub local_addr: Option<SocketAddr>,
    pub peer_addr: Option<SocketAddr>,
    pub session_id: Option<u64>,
    /// When `status` last changed.
    pub since: DateTime<Local>,
}

impl EndpointInfo {
    fn new(role: Role) -> Self {
        Self {
            role,
            status: EndpointStatus::Disconnected,
            local_addr: None,
            peer_addr: None,
            session_id: None,
            since: Local::now(),
        }
    }
}

#[derive(Debug)]
pub struct EndpointRegistry {
    endpoints: [RwLock<EndpointInfo>; 3],
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self {
            endpoints: [
                RwLock::new(EndpointInfo::new(Role::NodeUpdate)),
                RwLock::new(EndpointInfo::new(Role::CommandHandler)),
                RwLock::new(EndpointInfo::new(Role::RealtimeData)),
            ],
        }
    }

    fn slot(&self, role: Role) -> &RwLock<EndpointInfo> {
        &self.endpoints[role.index()]
    }

    pub fn set_local_addr(&self, role: Role, addr: SocketAddr) {
        self.slot(role).write().local_addr = Some(addr);
    }

    pub fn set_not_started(&self, role: Role) {
        let mut info = self.slot(role).write();
        info.status = EndpointStatus::NotStarted;
        info.local_addr = None;
        info.since = Local::now();
    }

    pub fn set_listening(&self, role: Role) {
        let mut info = self.slot(role).write();
        info.status = EndpointStatus::Listening;
        info.peer_addr = None;
        info.session_id = None;
        info.since = Local::now();
    }

    pub fn set_connected(&self, role: Role, session_id: u64, peer_addr: SocketAddr) {
        let mut info = self.slot(role).write();
        info.status = EndpointStatus::Connected;
        info.peer_addr = Some(peer_addr);
        info.session_id = Some(session_id);
        info.since = Local::now();
    }

    /// Marks the endpoint disconnected, but only if `session_id` is still the
    /// current session.
    pub fn set_disconnected(&self, role: Role, session_id: u64) {
        let mut info = self.slot(role).write();
        if info.session_id == Some(session_id) {
            info.status = EndpointStatus::Disconnected;
            info.peer_addr = None;
            info.session_id = None;
            info.since = Local::now();
        }
    }

    pub fn status(&self, role: Role) -> EndpointStatus {
        self.slot(role).read().status
    }

    pub fn info(&self, role: Role) -> EndpointInfo {
        self.slot(role).read().clone()
    }
}
