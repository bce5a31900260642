// src/core/role.rs

//! The three endpoint roles the base board connects to.

use strum_macros::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Role {
    /// Device status map and broadcast node list.
    #[strum(serialize = "Node Update")]
    NodeUpdate,
    /// Operator commands out, JSON responses in.
    #[strum(serialize = "Command Handler")]
    CommandHandler,
    /// Continuous sensor readings.
    #[strum(serialize = "Real-time Data")]
    RealtimeData,
}

impl Role {
    /// Dense index used by per-role tables.
    pub(crate) fn index(self) -> usize {
        match self {
            Role::NodeUpdate => 0,
            Role::CommandHandler => 1,
            Role::RealtimeData => 2,
        }
    }
}
