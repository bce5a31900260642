// src/core/handler/mod.rs

//! Routes decoded frames to the logic of the endpoint role they arrived on.

pub mod node_update;
pub mod realtime;

use crate::core::protocol::Frame;
use crate::core::state::BridgeState;
use crate::core::{BridgeError, Role};

/// What happened to a frame after routing.
#[derive(Debug)]
pub enum FrameOutcome {
    Applied,
    /// The payload was malformed and dropped. The session stays open.
    Discarded(BridgeError),
}

/// Hands a frame to its role's handler. Frames are handled one at a time, in the
/// order the session received them.
pub fn route_frame(state: &BridgeState, role: Role, frame: &Frame) -> FrameOutcome {
    let result = match role {
        Role::NodeUpdate => node_update::apply(&state.store, frame.text()),
        Role::RealtimeData => realtime::apply(&state.store, frame.text()).map(|_| ()),
        Role::CommandHandler => {
            state.dispatcher.on_inbound_frame(frame.text());
            Ok(())
        }
    };
    match result {
        Ok(()) => FrameOutcome::Applied,
        Err(e) => FrameOutcome::Discarded(e),
    }
}
