// src/core/mod.rs

//! The central module containing the framing, payload and shared-state logic of the
//! bridge.

pub mod dispatcher;
pub mod errors;
pub mod handler;
pub mod payload;
pub mod protocol;
pub mod role;
pub mod state;
pub mod tasks;

pub use dispatcher::{Accepted, CommandDispatcher, CommandEvent, PendingCommand, PendingState};
pub use errors::{BridgeError, CommandError};
pub use protocol::{Frame, FramingMode};
pub use role::Role;
