// src/core/protocol/detect.rs

//! One-shot classifier that picks the framing mode of a session from its first bytes.

use super::frame::{FramingMode, LENGTH_HEADER_LEN, read_length_header};

/// Outcome of inspecting the bytes buffered so far on a fresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    Decided(FramingMode),
    /// Fewer than four bytes have arrived, so the length header is not complete yet.
    AwaitingHeader,
    /// A plausible length header was seen but its payload has not fully arrived.
    /// The caller keeps reading until the payload completes or the read timeout
    /// elapses, in which case the stream is raw text.
    AwaitingPayload { declared: usize },
}

/// Classifies the first bytes of a session.
///
/// The stream is length-prefixed only if the first four bytes, read as a big-endian
/// `u32`, declare a length within `max_frame_len` and that many bytes follow. A
/// header split across reads is waited for the same way as an incomplete payload.
pub fn classify(buf: &[u8], max_frame_len: usize) -> Detection {
    let Some(declared) = read_length_header(buf) else {
        return Detection::AwaitingHeader;
    };
    if declared > max_frame_len {
        return Detection::Decided(FramingMode::RawText);
    }
    if buf.len() >= LENGTH_HEADER_LEN + declared {
        Detection::Decided(FramingMode::LengthPrefixed)
    } else {
        Detection::AwaitingPayload { declared }
    }
}
