// src/connection/handler.rs

//! Defines the `ConnectionHandler` which manages the full lifecycle of one base
//! board session: framing detection, the read loop, and outbound command writes.

use super::guard::ConnectionGuard;
use super::session::{CloseReason, SessionState};
use crate::core::Role;
use crate::core::handler::{FrameOutcome, route_frame};
use crate::core::protocol::{Detection, Frame, FrameCodec, FramingMode, classify};
use crate::core::state::BridgeState;
use bytes::BytesMut;
use futures::SinkExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tokio_util::codec::{Decoder, FramedWrite};
use tracing::{debug, info, warn};

const READ_BUFFER_CAPACITY: usize = 4096;

/// The next step for the session's main loop to take.
enum NextAction {
    Continue,
    Close(CloseReason),
}

/// Manages the full lifecycle of a session. The handler exclusively owns the socket;
/// the command dispatcher reaches it only through the outbound queue.
pub struct ConnectionHandler {
    reader: OwnedReadHalf,
    writer: FramedWrite<OwnedWriteHalf, FrameCodec>,
    /// Set once the framing mode is known.
    decoder: Option<FrameCodec>,
    read_buf: BytesMut,
    state: Arc<BridgeState>,
    session: SessionState,
    outbound_rx: Option<mpsc::Receiver<String>>,
    read_timeout: Duration,
    max_frame_len: usize,
}

impl ConnectionHandler {
    /// Creates a new `ConnectionHandler` for an accepted socket.
    pub fn new(
        socket: TcpStream,
        addr: SocketAddr,
        role: Role,
        state: Arc<BridgeState>,
        session_id: u64,
    ) -> Self {
        if let Err(e) = socket.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
        }
        let max_frame_len = state.config.max_frame_len;
        let read_timeout = state.config.endpoints.get(role).read_timeout();
        let (reader, writer) = socket.into_split();

        Self {
            reader,
            // Until detection, outbound frames go out as raw text.
            writer: FramedWrite::new(
                writer,
                FrameCodec::new(FramingMode::RawText, max_frame_len),
            ),
            decoder: None,
            read_buf: BytesMut::with_capacity(READ_BUFFER_CAPACITY),
            state,
            session: SessionState::new(session_id, role, addr),
            outbound_rx: None,
            read_timeout,
            max_frame_len,
        }
    }

    /// The main event loop for the session. Returns why the session closed; the
    /// socket is closed when the handler is dropped.
    pub async fn run(mut self, shutdown_rx: &mut broadcast::Receiver<()>) -> CloseReason {
        let role = self.session.role;
        let _guard = ConnectionGuard::new(
            self.state.clone(),
            role,
            self.session.session_id,
            self.session.addr,
        );
        if role == Role::CommandHandler {
            self.outbound_rx = Some(self.state.dispatcher.attach(self.session.session_id));
        }

        let mut read_deadline = Instant::now() + self.read_timeout;
        let reason = loop {
            if self.state.is_shutting_down() {
                break CloseReason::Shutdown;
            }

            let wait_until = match self.session.detection_deadline {
                Some(detect_by) => detect_by.min(read_deadline),
                None => read_deadline,
            };

            let action = tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Session {} received shutdown signal.", self.session.session_id);
                    NextAction::Close(CloseReason::Shutdown)
                }
                Some(command) = recv_outbound(&mut self.outbound_rx) => {
                    self.write_command(command).await
                }
                result = tokio::time::timeout_at(wait_until, self.reader.read_buf(&mut self.read_buf)) => {
                    match result {
                        Ok(Ok(0)) => self.on_peer_closed(),
                        Ok(Ok(n)) => {
                            read_deadline = Instant::now() + self.read_timeout;
                            self.on_bytes_read(n)
                        }
                        Ok(Err(e)) => NextAction::Close(CloseReason::Io(e.into())),
                        Err(_) => self.on_deadline(),
                    }
                }
            };

            if let NextAction::Close(reason) = action {
                break reason;
            }
        };

        self.log_close(&reason);
        reason
    }

    /// Classifies the stream if needed, then handles every complete frame buffered.
    fn on_bytes_read(&mut self, n: usize) -> NextAction {
        debug!(
            "Session {}: read {} bytes ({} buffered).",
            self.session.session_id,
            n,
            self.read_buf.len()
        );
        if self.decoder.is_none() {
            match classify(&self.read_buf, self.max_frame_len) {
                Detection::Decided(mode) => self.set_mode(mode),
                Detection::AwaitingHeader => {
                    debug!(
                        "Session {}: {} bytes so far, waiting for a full length header.",
                        self.session.session_id,
                        self.read_buf.len()
                    );
                    self.start_detection_deadline();
                    return NextAction::Continue;
                }
                Detection::AwaitingPayload { declared } => {
                    debug!(
                        "Session {}: length header declares {} bytes, waiting for payload.",
                        self.session.session_id, declared
                    );
                    self.start_detection_deadline();
                    return NextAction::Continue;
                }
            }
        }
        self.drain_frames()
    }

    /// Starts the wait for the rest of an incomplete header or payload. The deadline
    /// is set once per session and is not extended by later reads.
    fn start_detection_deadline(&mut self) {
        if self.session.detection_deadline.is_none() {
            self.session.detection_deadline = Some(Instant::now() + self.read_timeout);
        }
    }

    /// Handles the read deadline. A session still deciding its framing falls back to
    /// raw text; otherwise the peer has gone quiet for too long.
    fn on_deadline(&mut self) -> NextAction {
        if self.decoder.is_none() && !self.read_buf.is_empty() {
            self.set_mode(FramingMode::RawText);
            return self.drain_frames();
        }
        NextAction::Close(CloseReason::ReadTimeout)
    }

    /// The peer closed its end. Bytes still waiting on detection form one final
    /// raw-text frame.
    fn on_peer_closed(&mut self) -> NextAction {
        if self.decoder.is_none() && !self.read_buf.is_empty() {
            self.set_mode(FramingMode::RawText);
            if let NextAction::Close(reason) = self.drain_frames() {
                return NextAction::Close(reason);
            }
        }
        NextAction::Close(CloseReason::PeerClosed)
    }

    fn set_mode(&mut self, mode: FramingMode) {
        info!(
            "Session {} from {} uses {} framing.",
            self.session.session_id, self.session.addr, mode
        );
        self.session.mode = Some(mode);
        self.session.detection_deadline = None;
        self.decoder = Some(FrameCodec::new(mode, self.max_frame_len));
        *self.writer.encoder_mut() = FrameCodec::new(mode, self.max_frame_len);
    }

    fn drain_frames(&mut self) -> NextAction {
        loop {
            let decoded = match self.decoder.as_mut() {
                Some(decoder) => decoder.decode(&mut self.read_buf),
                None => return NextAction::Continue,
            };
            match decoded {
                Ok(Some(frame)) => self.handle_frame(frame),
                Ok(None) => return NextAction::Continue,
                Err(e) => {
                    self.state.stats.increment_framing_errors(self.session.role);
                    return NextAction::Close(CloseReason::FramingError(e));
                }
            }
        }
    }

    fn handle_frame(&mut self, frame: Frame) {
        let role = self.session.role;
        self.session.frames_received += 1;
        self.state.stats.increment_frames_received(role);
        debug!(
            "Session {}: received frame of {} bytes.",
            self.session.session_id,
            frame.len()
        );

        if let FrameOutcome::Discarded(e) = route_frame(&self.state, role, &frame) {
            self.state.stats.increment_frames_discarded(role);
            warn!("Discarding malformed frame: {}", e);
            debug!("Raw data: {}", frame.text());
        }
    }

    async fn write_command(&mut self, command: String) -> NextAction {
        if let Err(e) = self.writer.send(command.as_str()).await {
            return NextAction::Close(CloseReason::Io(e));
        }
        info!("Command sent to base board: {}", command);
        self.state
            .dispatcher
            .mark_written(self.session.session_id, &command);
        NextAction::Continue
    }

    fn log_close(&self, reason: &CloseReason) {
        let lifetime = self.session.opened_at.elapsed();
        if reason.is_error() {
            warn!(
                "Session {} from {} closed after {:?} and {} frames: {}",
                self.session.session_id,
                self.session.addr,
                lifetime,
                self.session.frames_received,
                reason
            );
        } else {
            info!(
                "Session {} from {} closed after {:?} and {} frames: {}",
                self.session.session_id,
                self.session.addr,
                lifetime,
                self.session.frames_received,
                reason
            );
        }
    }
}

/// Waits for the next outbound command. Sessions without a queue never yield one.
async fn recv_outbound(rx: &mut Option<mpsc::Receiver<String>>) -> Option<String> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
