// src/core/dispatcher.rs

//! Defines the `CommandDispatcher`, which funnels operator commands into the active
//! CommandHandler session and matches inbound responses against them.
//!
//! The wire format carries no request id, so at most one command may be in flight.
//! Any response that arrives while a command is awaiting one resolves it, whether or
//! not it was really produced by that command.

use crate::core::errors::CommandError;
use crate::core::payload::{CommandResponse, Inbound, classify_inbound};
use crate::core::state::SharedStore;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Capacity of the per-session outbound queue. Only one command is ever pending,
/// so this never fills in practice.
const OUTBOUND_QUEUE_CAPACITY: usize = 4;
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    /// Queued for the session but not yet written to the socket.
    Sent,
    /// Written; waiting for the base board to answer.
    AwaitingResponse,
}

/// The single outstanding command.
#[derive(Debug, Clone)]
pub struct PendingCommand {
    pub text: String,
    pub issued_at: DateTime<Local>,
    pub state: PendingState,
    started: Instant,
}

impl PendingCommand {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Receipt for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub text: String,
    pub issued_at: DateTime<Local>,
}

/// Notifications for the shell and display layers.
#[derive(Debug, Clone)]
pub enum CommandEvent {
    /// The command was written to the base board.
    Sent { text: String },
    /// A response arrived. `command` is the pending command it resolved, if any.
    Resolved {
        command: Option<String>,
        response: CommandResponse,
    },
    /// No response arrived in time; a new command may be submitted.
    TimedOut { text: String, waited: Duration },
    /// The session closed while the command was outstanding.
    Abandoned { text: String },
    /// An inbound frame that did not match the response schema.
    Unsolicited { text: String },
}

struct ActiveSession {
    session_id: u64,
    outbound_tx: mpsc::Sender<String>,
}

#[derive(Default)]
struct DispatcherInner {
    session: Option<ActiveSession>,
    pending: Option<PendingCommand>,
}

pub struct CommandDispatcher {
    inner: Mutex<DispatcherInner>,
    store: Arc<SharedStore>,
    response_timeout: Duration,
    events: broadcast::Sender<CommandEvent>,
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("CommandDispatcher")
            .field("session", &inner.session.as_ref().map(|s| s.session_id))
            .field("pending", &inner.pending)
            .field("response_timeout", &self.response_timeout)
            .finish()
    }
}

impl CommandDispatcher {
    pub fn new(store: Arc<SharedStore>, response_timeout: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(DispatcherInner::default()),
            store,
            response_timeout,
            events,
        }
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CommandEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: CommandEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Registers a new CommandHandler session and returns the queue of commands it
    /// must write. Any state left over from a previous session is dropped.
    pub fn attach(&self, session_id: u64) -> mpsc::Receiver<String> {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let abandoned = {
            let mut inner = self.inner.lock();
            inner.session = Some(ActiveSession {
                session_id,
                outbound_tx,
            });
            inner.pending.take()
        };
        if let Some(pending) = abandoned {
            self.emit(CommandEvent::Abandoned { text: pending.text });
        }
        debug!("Session {} attached to the command dispatcher.", session_id);
        outbound_rx
    }

    /// Unregisters `session_id`. A pending command can no longer be answered and is
    /// abandoned.
    pub fn detach(&self, session_id: u64) {
        let abandoned = {
            let mut inner = self.inner.lock();
            if inner.session.as_ref().map(|s| s.session_id) != Some(session_id) {
                return;
            }
            inner.session = None;
            inner.pending.take()
        };
        if let Some(pending) = abandoned {
            warn!(
                "Command '{}' abandoned: session {} closed before a response arrived.",
                pending.text, session_id
            );
            self.emit(CommandEvent::Abandoned { text: pending.text });
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().session.is_some()
    }

    pub fn pending(&self) -> Option<PendingCommand> {
        self.inner.lock().pending.clone()
    }

    /// Queues `text` for the active session.
    pub fn submit(&self, text: &str) -> Result<Accepted, CommandError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommandError::EmptyCommand);
        }

        let mut inner = self.inner.lock();
        let expired = self.take_expired(&mut inner);
        let result = Self::enqueue(&mut inner, text);
        drop(inner);

        if let Some(event) = expired {
            self.emit(event);
        }
        let accepted = result?;
        info!("Command queued: {}", accepted.text);
        Ok(accepted)
    }

    fn enqueue(inner: &mut DispatcherInner, text: &str) -> Result<Accepted, CommandError> {
        let session = inner
            .session
            .as_ref()
            .ok_or(CommandError::NoActiveConnection)?;
        if inner.pending.is_some() {
            return Err(CommandError::CommandAlreadyPending);
        }
        session
            .outbound_tx
            .try_send(text.to_string())
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => CommandError::CommandAlreadyPending,
                mpsc::error::TrySendError::Closed(_) => CommandError::NoActiveConnection,
            })?;

        let pending = PendingCommand {
            text: text.to_string(),
            issued_at: Local::now(),
            state: PendingState::Sent,
            started: Instant::now(),
        };
        let accepted = Accepted {
            text: pending.text.clone(),
            issued_at: pending.issued_at,
        };
        inner.pending = Some(pending);
        Ok(accepted)
    }

    /// Called by the session once `text` has been written to the socket.
    pub fn mark_written(&self, session_id: u64, text: &str) {
        {
            let mut inner = self.inner.lock();
            if inner.session.as_ref().map(|s| s.session_id) != Some(session_id) {
                return;
            }
            match inner.pending.as_mut() {
                Some(pending) if pending.state == PendingState::Sent && pending.text == text => {
                    pending.state = PendingState::AwaitingResponse;
                }
                _ => return,
            }
        }
        debug!("Command written, awaiting response: {}", text);
        self.emit(CommandEvent::Sent {
            text: text.to_string(),
        });
    }

    /// Routes one inbound CommandHandler frame.
    pub fn on_inbound_frame(&self, text: &str) {
        match classify_inbound(text) {
            Inbound::Response(response) => {
                let resolved = {
                    let mut inner = self.inner.lock();
                    let awaiting = inner
                        .pending
                        .as_ref()
                        .is_some_and(|p| p.state == PendingState::AwaitingResponse);
                    if awaiting {
                        inner.pending.take().map(|p| p.text)
                    } else {
                        None
                    }
                };
                match &resolved {
                    Some(command) => info!(
                        "Response from node {} resolved command '{}'.",
                        response.node_id, command
                    ),
                    None => info!(
                        "Response from node {} arrived with no command pending.",
                        response.node_id
                    ),
                }
                self.store.set_last_response(response.clone());
                self.emit(CommandEvent::Resolved {
                    command: resolved,
                    response,
                });
            }
            Inbound::Unsolicited(text) => {
                debug!("Unsolicited frame on command endpoint: {}", text);
                self.emit(CommandEvent::Unsolicited { text });
            }
        }
    }

    /// Clears the pending command if it has outlived the response timeout.
    /// Returns the expired command.
    pub fn expire_stale(&self) -> Option<PendingCommand> {
        let (event, expired) = {
            let mut inner = self.inner.lock();
            let snapshot = inner.pending.clone();
            match self.take_expired(&mut inner) {
                Some(event) => (event, snapshot),
                None => return None,
            }
        };
        self.emit(event);
        expired
    }

    /// Removes an expired pending command while the caller holds the lock and
    /// returns the event to publish once the lock is released.
    fn take_expired(&self, inner: &mut DispatcherInner) -> Option<CommandEvent> {
        let expired = inner
            .pending
            .as_ref()
            .is_some_and(|p| p.started.elapsed() >= self.response_timeout);
        if !expired {
            return None;
        }
        let pending = inner.pending.take()?;
        let waited = pending.started.elapsed();
        warn!(
            "Command '{}' timed out after {:?} without a response.",
            pending.text, waited
        );
        Some(CommandEvent::TimedOut {
            text: pending.text,
            waited,
        })
    }
}
