// src/connection/session.rs

//! Defines the state associated with a single base board session.

use crate::core::{BridgeError, FramingMode, Role};
use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

/// Holds the state specific to a single session.
#[derive(Debug)]
pub struct SessionState {
    pub session_id: u64,
    pub role: Role,
    pub addr: SocketAddr,
    /// `None` until the first bytes have been classified.
    pub mode: Option<FramingMode>,
    /// Set while a partial or plausible length header waits for the rest of its
    /// frame. If the frame has not completed by then, the stream is raw text.
    pub detection_deadline: Option<tokio::time::Instant>,
    pub frames_received: u64,
    pub opened_at: Instant,
}

impl SessionState {
    pub(crate) fn new(session_id: u64, role: Role, addr: SocketAddr) -> Self {
        Self {
            session_id,
            role,
            addr,
            mode: None,
            detection_deadline: None,
            frames_received: 0,
            opened_at: Instant::now(),
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone)]
pub enum CloseReason {
    /// The base board closed its end.
    PeerClosed,
    /// Nothing arrived within the endpoint's read timeout.
    ReadTimeout,
    /// The byte stream could not be framed; there is no way to resynchronize.
    FramingError(BridgeError),
    /// A socket read or write failed.
    Io(BridgeError),
    /// The process is shutting down.
    Shutdown,
}

impl CloseReason {
    /// True for closes caused by a fault rather than normal operation.
    pub fn is_error(&self) -> bool {
        match self {
            CloseReason::PeerClosed | CloseReason::Shutdown => false,
            CloseReason::Io(e) => !e.is_normal_disconnect(),
            CloseReason::ReadTimeout | CloseReason::FramingError(_) => true,
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed => f.write_str("closed by peer"),
            CloseReason::ReadTimeout => f.write_str("read timed out"),
            CloseReason::FramingError(e) => write!(f, "framing error: {e}"),
            CloseReason::Io(e) => write!(f, "{e}"),
            CloseReason::Shutdown => f.write_str("shutdown"),
        }
    }
}
