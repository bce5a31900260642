// src/shell.rs

//! The operator shell. Lines typed on stdin are either local inspection commands or
//! text to forward to the base board through the CommandHandler endpoint.

use crate::core::Role;
use crate::core::state::BridgeState;
use crate::core::{CommandEvent, PendingState};
use std::fmt::Write as _;
use std::io::BufRead;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Status,
    Devices,
    /// Show the most recent readings; `None` uses the configured default count.
    Sensors(Option<usize>),
    Response,
    Pending,
    Clear,
    /// Replace the log filter, e.g. `log boardlink=debug`.
    Log(String),
    Exit,
    /// Anything else is sent to the base board verbatim.
    Submit(String),
    /// A known command with bad arguments.
    Invalid(String),
    Empty,
}

impl ShellCommand {
    /// Parses one input line. Command keywords are case-insensitive.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ShellCommand::Empty;
        }
        let (keyword, rest) = match line.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (line, ""),
        };

        match keyword.to_ascii_lowercase().as_str() {
            "help" if rest.is_empty() => ShellCommand::Help,
            "status" if rest.is_empty() => ShellCommand::Status,
            "devices" if rest.is_empty() => ShellCommand::Devices,
            "response" if rest.is_empty() => ShellCommand::Response,
            "pending" if rest.is_empty() => ShellCommand::Pending,
            "clear" if rest.is_empty() => ShellCommand::Clear,
            "exit" | "quit" if rest.is_empty() => ShellCommand::Exit,
            "sensors" => {
                if rest.is_empty() {
                    return ShellCommand::Sensors(None);
                }
                match rest.parse::<usize>() {
                    Ok(n) if n > 0 => ShellCommand::Sensors(Some(n)),
                    _ => ShellCommand::Invalid(format!(
                        "'{rest}' is not a positive count. Usage: sensors [n]"
                    )),
                }
            }
            "log" => {
                if rest.is_empty() {
                    ShellCommand::Invalid("Usage: log <filter>".to_string())
                } else {
                    ShellCommand::Log(rest.to_string())
                }
            }
            _ => ShellCommand::Submit(line.to_string()),
        }
    }
}

/// What the shell loop should do after a command ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellOutcome {
    Continue(String),
    Exit,
}

/// The interactive operator shell.
pub struct Shell {
    state: Arc<BridgeState>,
}

impl Shell {
    pub fn new(state: Arc<BridgeState>) -> Self {
        Self { state }
    }

    /// Reads stdin until shutdown. Command events are printed as they arrive so the
    /// operator sees responses and timeouts without polling.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut lines = Some(spawn_stdin_reader());
        let mut events = self.state.subscribe_command_events();

        println!("\n[Command Input] Ready to accept commands. Type 'help' for available commands.");
        loop {
            if self.state.is_shutting_down() {
                break;
            }
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                line = recv_line(&mut lines) => match line {
                    Some(line) => {
                        match self.execute(ShellCommand::parse(&line)) {
                            ShellOutcome::Continue(output) => {
                                if !output.is_empty() {
                                    println!("{output}");
                                }
                            }
                            ShellOutcome::Exit => {
                                println!("[Command Input] Exiting...");
                                break;
                            }
                        }
                    }
                    None => {
                        info!("Stdin closed; the shell no longer reads commands.");
                        lines = None;
                    }
                },
                event = events.recv() => match event {
                    Ok(event) => {
                        if let Some(output) = render_event(&event) {
                            println!("{output}");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!("Shell missed {} command events.", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        debug!("Shell task stopped.");
    }

    /// Runs one command and returns the text to show the operator.
    pub fn execute(&self, command: ShellCommand) -> ShellOutcome {
        let output = match command {
            ShellCommand::Empty => String::new(),
            ShellCommand::Help => render_help(),
            ShellCommand::Status => self.render_status(),
            ShellCommand::Devices => self.render_devices(),
            ShellCommand::Sensors(count) => {
                self.render_sensors(count.unwrap_or(self.state.config.shell.sensor_display_count))
            }
            ShellCommand::Response => self.render_last_response(),
            ShellCommand::Pending => self.render_pending(),
            ShellCommand::Clear => {
                self.state.store.clear_sensor_readings();
                "[Real-time Data] Sensor data cleared".to_string()
            }
            ShellCommand::Log(filter) => self.set_log_filter(&filter),
            ShellCommand::Exit => {
                self.state.request_shutdown();
                return ShellOutcome::Exit;
            }
            ShellCommand::Submit(text) => match self.state.submit_command(&text) {
                Ok(accepted) => format!("[Command Handler] Command queued: {}", accepted.text),
                Err(e) => format!("[Command Input] Error: {e}"),
            },
            ShellCommand::Invalid(message) => format!("[Command Input] {message}"),
        };
        ShellOutcome::Continue(output)
    }

    fn render_status(&self) -> String {
        let mut out = format!("\n{RULE}\nEndpoint Status:\n");
        for role in Role::iter() {
            let info = self.state.endpoint_info(role);
            let stats = self.state.stats(role);
            let peer = info
                .peer_addr
                .map(|addr| format!(" from {addr}"))
                .unwrap_or_default();
            let local = info
                .local_addr
                .map(|addr| addr.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "  {role:<16} {local:<22} {}{peer} since {}",
                info.status,
                info.since.format("%H:%M:%S")
            );
            let _ = writeln!(
                out,
                "  {:<16} sessions={} frames={} discarded={} framing_errors={}",
                "",
                stats.sessions_accepted,
                stats.frames_received,
                stats.frames_discarded,
                stats.framing_errors
            );
        }
        let _ = writeln!(
            out,
            "  Sensor readings: {}/{} ({} evicted)",
            self.state.store.sensor_reading_count(),
            self.state.store.sensor_capacity(),
            self.state.store.sensor_readings_evicted()
        );
        out.push_str(RULE);
        out
    }

    fn render_devices(&self) -> String {
        let (devices, nodes) = self.state.store.snapshot_node_state();
        let mut out = format!("\n{RULE}\nConnected Devices:\n");
        if devices.is_empty() {
            out.push_str("  No devices connected\n");
        }
        for (device_id, status) in &devices {
            let icon = if status.is_active() { "+" } else { "-" };
            let _ = writeln!(out, "  {icon} {device_id}: {status}");
        }
        out.push_str("\nAvailable Broadcast Nodes:\n");
        if nodes.is_empty() {
            out.push_str("  No broadcast nodes available\n");
        }
        for node in &nodes {
            let _ = writeln!(out, "  * {node}");
        }
        out.push_str(RULE);
        out
    }

    fn render_sensors(&self, count: usize) -> String {
        let readings = self.state.snapshot_sensor_readings(count);
        let mut out = format!(
            "\n{RULE}\nTotal data points stored: {}\n{THIN_RULE}\n",
            self.state.store.sensor_reading_count()
        );
        if readings.is_empty() {
            out.push_str("  No sensor data received yet\n");
        }
        for reading in &readings {
            let _ = writeln!(
                out,
                "  {}  {}: {}",
                reading.captured_at.format("%Y-%m-%d %H:%M:%S%.3f"),
                reading.device_id,
                reading.value
            );
        }
        out.push_str(RULE);
        out
    }

    fn render_last_response(&self) -> String {
        match self.state.snapshot_last_response() {
            Some(response) => {
                let mut out = format!(
                    "\n{RULE}\nLast response from node {} at {}:\n",
                    response.node_id,
                    response.received_at.format("%Y-%m-%d %H:%M:%S")
                );
                for (field, value) in &response.fields {
                    let _ = writeln!(out, "  {field}: {value}");
                }
                out.push_str(RULE);
                out
            }
            None => "[Command Handler] No response received yet".to_string(),
        }
    }

    fn render_pending(&self) -> String {
        match self.state.pending_command() {
            Some(pending) => {
                let state = match pending.state {
                    PendingState::Sent => "queued",
                    PendingState::AwaitingResponse => "awaiting response",
                };
                format!(
                    "[Command Handler] '{}' {} for {:.1}s (issued {})",
                    pending.text,
                    state,
                    pending.elapsed().as_secs_f64(),
                    pending.issued_at.format("%H:%M:%S")
                )
            }
            None => "[Command Handler] No command pending".to_string(),
        }
    }

    fn set_log_filter(&self, filter: &str) -> String {
        let Some(handle) = &self.state.log_reload_handle else {
            return "[Command Input] Log filter cannot be changed in this process".to_string();
        };
        let new_filter = match EnvFilter::try_new(filter) {
            Ok(f) => f,
            Err(e) => return format!("[Command Input] Invalid log filter '{filter}': {e}"),
        };
        match handle.reload(new_filter) {
            Ok(()) => {
                info!("Log filter changed to '{}'.", filter);
                format!("[Command Input] Log filter set to '{filter}'")
            }
            Err(e) => {
                warn!("Failed to reload log filter: {}", e);
                format!("[Command Input] Failed to change log filter: {e}")
            }
        }
    }
}

fn render_help() -> String {
    format!(
        "\n{RULE}\n\
         Available Commands:\n  \
         <command>     - Send command to base board\n  \
         status        - Show endpoint status and counters\n  \
         devices       - Show connected devices and broadcast nodes\n  \
         sensors [n]   - Show the n most recent sensor readings\n  \
         response      - Show the last command response\n  \
         pending       - Show the outstanding command, if any\n  \
         clear         - Discard stored sensor readings\n  \
         log <filter>  - Change the log filter, e.g. 'log debug'\n  \
         help          - Show this help message\n  \
         exit/quit     - Exit the application\n\
         {RULE}"
    )
}

/// Renders a dispatcher event for the operator. Unsolicited traffic is only logged.
pub fn render_event(event: &CommandEvent) -> Option<String> {
    match event {
        CommandEvent::Sent { .. } | CommandEvent::Unsolicited { .. } => None,
        CommandEvent::Resolved { command, response } => {
            let fields = response
                .status_fields()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            Some(match command {
                Some(command) => format!(
                    "[Command Handler] Response to '{}' from node {}: {}",
                    command, response.node_id, fields
                ),
                None => format!(
                    "[Command Handler] Response from node {}: {}",
                    response.node_id, fields
                ),
            })
        }
        CommandEvent::TimedOut { text, waited } => Some(format!(
            "[Command Handler] Timeout waiting for response to '{}' after {:.1}s",
            text,
            waited.as_secs_f64()
        )),
        CommandEvent::Abandoned { text } => Some(format!(
            "[Command Handler] Connection lost before '{text}' was answered"
        )),
    }
}

/// Reads stdin on a dedicated OS thread, since stdin reads block and cannot be
/// cancelled. The thread is never joined; it ends with the process.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    let spawned = std::thread::Builder::new()
        .name("shell-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("Stdin read failed: {}", e);
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        warn!("Failed to start stdin reader thread: {}", e);
    }
    rx
}

async fn recv_line(lines: &mut Option<mpsc::Receiver<String>>) -> Option<String> {
    match lines {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
