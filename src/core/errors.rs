// src/core/errors.rs

//! Defines the error types shared by the framing, payload and dispatch layers.

use std::sync::Arc;
use thiserror::Error;

/// The main error enum for everything that can go wrong on a session.
/// The I/O variant holds an `Arc` so the error stays `Clone`.
#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Frame length {len} exceeds the limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    #[error("Frame payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Unknown device status '{0}'")]
    UnknownDeviceStatus(String),
}

impl BridgeError {
    /// True for disconnects that are part of normal operation and only merit debug logs.
    pub fn is_normal_disconnect(&self) -> bool {
        matches!(self, BridgeError::Io(arc_err) if matches!(
            arc_err.kind(),
            std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof
                | std::io::ErrorKind::ConnectionAborted
        ))
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(e: std::io::Error) -> Self {
        BridgeError::Io(Arc::new(e))
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::MalformedPayload(e.to_string())
    }
}

/// Reasons a command submission is refused. These are returned to the submitter
/// as values and never affect the endpoint.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    #[error("no base board is connected to the command endpoint")]
    NoActiveConnection,

    #[error("a command is already awaiting a response")]
    CommandAlreadyPending,

    #[error("command text is empty")]
    EmptyCommand,
}
