// src/lib.rs

pub mod config;
pub mod connection;
pub mod core;
pub mod server;
pub mod shell;

// Re-export
pub use crate::core::state::BridgeHandle;
pub use crate::server::BridgeServer;
