// src/core/state/sensors.rs

//! The bounded ring buffer of sensor readings.

use crate::core::payload::SensorValue;
use chrono::{DateTime, Local};
use std::collections::VecDeque;

/// Default number of readings kept before the oldest are evicted.
pub const DEFAULT_SENSOR_CAPACITY: usize = 1000;

/// One value reported by the base board for one device.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub device_id: String,
    pub value: SensorValue,
    pub captured_at: DateTime<Local>,
}

/// A FIFO ring buffer. Not synchronized on its own; `SharedStore` wraps it in a lock.
#[derive(Debug)]
pub struct SensorBuffer {
    readings: VecDeque<SensorReading>,
    capacity: usize,
    evicted: u64,
}

impl SensorBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    /// Appends a reading, evicting the oldest one when full.
    /// Returns the evicted reading, if any.
    pub fn push(&mut self, reading: SensorReading) -> Option<SensorReading> {
        let evicted = if self.readings.len() == self.capacity {
            self.evicted += 1;
            self.readings.pop_front()
        } else {
            None
        };
        self.readings.push_back(reading);
        evicted
    }

    /// Copies out the most recent `limit` readings, oldest first.
    pub fn latest(&self, limit: usize) -> Vec<SensorReading> {
        let skip = self.readings.len().saturating_sub(limit);
        self.readings.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total readings evicted since startup.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }
}
