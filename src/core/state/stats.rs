// src/core/state/stats.rs

//! Contains state definitions and logic for per-endpoint statistics.

use crate::core::Role;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a single endpoint.
#[derive(Debug, Default)]
struct EndpointCounters {
    /// The number of base board connections accepted since startup.
    sessions_accepted: AtomicU64,
    /// The number of complete frames decoded.
    frames_received: AtomicU64,
    /// Frames whose payload could not be parsed and was dropped.
    frames_discarded: AtomicU64,
    /// Sessions closed because the byte stream could not be framed.
    framing_errors: AtomicU64,
}

/// A point-in-time copy of one endpoint's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndpointStats {
    pub sessions_accepted: u64,
    pub frames_received: u64,
    pub frames_discarded: u64,
    pub framing_errors: u64,
}

/// Holds all statistics, indexed by endpoint role.
#[derive(Debug, Default)]
pub struct StatsState {
    endpoints: [EndpointCounters; 3],
}

impl StatsState {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, role: Role) -> &EndpointCounters {
        &self.endpoints[role.index()]
    }

    /// Atomically increments the number of sessions accepted on `role`.
    pub fn increment_sessions(&self, role: Role) {
        self.counters(role)
            .sessions_accepted
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_frames_received(&self, role: Role) {
        self.counters(role)
            .frames_received
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_frames_discarded(&self, role: Role) {
        self.counters(role)
            .frames_discarded
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_framing_errors(&self, role: Role) {
        self.counters(role)
            .framing_errors
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Gets a copy of the counters for `role`.
    pub fn get(&self, role: Role) -> EndpointStats {
        let c = self.counters(role);
        EndpointStats {
            sessions_accepted: c.sessions_accepted.load(Ordering::Relaxed),
            frames_received: c.frames_received.load(Ordering::Relaxed),
            frames_discarded: c.frames_discarded.load(Ordering::Relaxed),
            framing_errors: c.framing_errors.load(Ordering::Relaxed),
        }
    }
}
