// src/core/tasks/mod.rs

pub mod command_timeout;
