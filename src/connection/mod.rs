// src/connection/mod.rs

//! Manages the lifecycle of a single base board TCP session: framing detection,
//! frame routing, outbound command writes and endpoint status bookkeeping.

mod guard;
mod handler;
mod session;

pub use guard::ConnectionGuard;
pub use handler::ConnectionHandler;
pub use session::{CloseReason, SessionState};
