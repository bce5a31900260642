// src/config.rs

//! Manages bridge configuration: loading, defaults and validation.

use crate::core::Role;
use crate::core::protocol::DEFAULT_MAX_FRAME_LEN;
use crate::core::state::DEFAULT_SENSOR_CAPACITY;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::warn;

/// Settings for one listening endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// How long a session waits for data before it is considered dead.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

impl EndpointConfig {
    fn with_port(port: u16) -> Self {
        Self {
            host: default_host(),
            port,
            read_timeout_secs: default_read_timeout_secs(),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn bind_addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_read_timeout_secs() -> u64 {
    10
}
fn default_node_update_endpoint() -> EndpointConfig {
    EndpointConfig::with_port(8001)
}
fn default_command_handler_endpoint() -> EndpointConfig {
    EndpointConfig::with_port(8002)
}
fn default_realtime_data_endpoint() -> EndpointConfig {
    EndpointConfig::with_port(8003)
}

/// The three endpoints, one per role.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EndpointsConfig {
    #[serde(default = "default_node_update_endpoint")]
    pub node_update: EndpointConfig,
    #[serde(default = "default_command_handler_endpoint")]
    pub command_handler: EndpointConfig,
    #[serde(default = "default_realtime_data_endpoint")]
    pub realtime_data: EndpointConfig,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            node_update: default_node_update_endpoint(),
            command_handler: default_command_handler_endpoint(),
            realtime_data: default_realtime_data_endpoint(),
        }
    }
}

impl EndpointsConfig {
    pub fn get(&self, role: Role) -> &EndpointConfig {
        match role {
            Role::NodeUpdate => &self.node_update,
            Role::CommandHandler => &self.command_handler,
            Role::RealtimeData => &self.realtime_data,
        }
    }

    pub fn get_mut(&mut self, role: Role) -> &mut EndpointConfig {
        match role {
            Role::NodeUpdate => &mut self.node_update,
            Role::CommandHandler => &mut self.command_handler,
            Role::RealtimeData => &mut self.realtime_data,
        }
    }
}

/// Settings for the interactive shell.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Reads operator commands from stdin when true.
    #[serde(default = "default_shell_enabled")]
    pub enabled: bool,
    /// Number of readings shown by `sensors` when no count is given.
    #[serde(default = "default_sensor_display_count")]
    pub sensor_display_count: usize,
}

fn default_shell_enabled() -> bool {
    true
}
fn default_sensor_display_count() -> usize {
    5
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            enabled: default_shell_enabled(),
            sensor_display_count: default_sensor_display_count(),
        }
    }
}

/// A raw representation of the config file before validation and resolution.
#[derive(Deserialize)]
struct RawConfig {
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    endpoints: EndpointsConfig,
    #[serde(default = "default_sensor_buffer_capacity")]
    sensor_buffer_capacity: usize,
    /// Falls back to the command endpoint's read timeout when unset.
    command_timeout_secs: Option<u64>,
    #[serde(default = "default_max_frame_len")]
    max_frame_len: usize,
    #[serde(default)]
    shell: ShellConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_sensor_buffer_capacity() -> usize {
    DEFAULT_SENSOR_CAPACITY
}
fn default_max_frame_len() -> usize {
    DEFAULT_MAX_FRAME_LEN
}

/// Represents the final, validated bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub log_level: String,
    pub endpoints: EndpointsConfig,
    pub sensor_buffer_capacity: usize,
    pub command_timeout_secs: u64,
    pub max_frame_len: usize,
    pub shell: ShellConfig,
}

impl Default for Config {
    fn default() -> Self {
        let endpoints = EndpointsConfig::default();
        Self {
            log_level: default_log_level(),
            command_timeout_secs: endpoints.command_handler.read_timeout_secs,
            endpoints,
            sensor_buffer_capacity: default_sensor_buffer_capacity(),
            max_frame_len: default_max_frame_len(),
            shell: ShellConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance by reading and parsing a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents).with_context(|| format!("Invalid config in '{path}'"))
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let raw_config: RawConfig =
            toml::from_str(contents).context("Failed to parse TOML configuration")?;

        let command_timeout_secs = raw_config
            .command_timeout_secs
            .unwrap_or(raw_config.endpoints.command_handler.read_timeout_secs);

        let config = Config {
            log_level: raw_config.log_level,
            endpoints: raw_config.endpoints,
            sensor_buffer_capacity: raw_config.sensor_buffer_capacity,
            command_timeout_secs,
            max_frame_len: raw_config.max_frame_len,
            shell: raw_config.shell,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Validates the resolved configuration to ensure logical consistency.
    pub fn validate(&self) -> Result<()> {
        for role in [Role::NodeUpdate, Role::CommandHandler, Role::RealtimeData] {
            let endpoint = self.endpoints.get(role);
            if endpoint.host.trim().is_empty() {
                return Err(anyhow!("{role} endpoint host cannot be empty"));
            }
            if endpoint.read_timeout_secs == 0 {
                return Err(anyhow!("{role} endpoint read_timeout_secs cannot be 0"));
            }
        }

        let ports = [
            &self.endpoints.node_update,
            &self.endpoints.command_handler,
            &self.endpoints.realtime_data,
        ];
        for (i, a) in ports.iter().enumerate() {
            for b in ports.iter().skip(i + 1) {
                // Port 0 asks the OS for an ephemeral port and never collides.
                if a.port != 0 && a.port == b.port && a.host == b.host {
                    return Err(anyhow!(
                        "endpoints cannot share the address {}:{}",
                        a.host,
                        a.port
                    ));
                }
            }
        }

        if self.sensor_buffer_capacity == 0 {
            return Err(anyhow!("sensor_buffer_capacity cannot be 0"));
        }
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs cannot be 0"));
        }
        if self.max_frame_len == 0 || self.max_frame_len > u32::MAX as usize {
            return Err(anyhow!(
                "max_frame_len must be between 1 and {} bytes",
                u32::MAX
            ));
        }
        if self.max_frame_len > 16 * DEFAULT_MAX_FRAME_LEN {
            warn!(
                "large max_frame_len setting: {} bytes. Raw-text detection becomes less reliable.",
                self.max_frame_len
            );
        }
        Ok(())
    }
}
