// src/core/protocol/frame.rs

//! Implements the base board frame structure and the corresponding `Encoder` and
//! `Decoder` for both framing modes.
//!
//! ```text
//! length-prefixed:  ┌────────────────┬──────────────────┐
//!                   │ u32 big-endian │ L bytes of UTF-8 │
//!                   └────────────────┴──────────────────┘
//! raw-text:         the bytes of one socket read, no header
//! ```

use crate::core::BridgeError;
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Size of the big-endian length header in length-prefixed mode.
pub const LENGTH_HEADER_LEN: usize = 4;

/// Frames above this size are rejected unless the configuration says otherwise.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024; // 1 MiB

/// One logical message exchanged with the base board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    text: String,
}

impl Frame {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The decoded payload.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Payload length in bytes, excluding any length header.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// How frames are delimited on a session. Chosen once, on the first read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum FramingMode {
    LengthPrefixed,
    RawText,
}

/// The result of a single decode attempt over a byte slice.
#[derive(Debug, PartialEq, Eq)]
pub enum Decoded {
    Frame { frame: Frame, consumed: usize },
    NeedMoreData,
}

/// A `tokio_util::codec` implementation that decodes and encodes `Frame`s in a
/// fixed `FramingMode`.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    mode: FramingMode,
    max_frame_len: usize,
}

impl FrameCodec {
    pub fn new(mode: FramingMode, max_frame_len: usize) -> Self {
        Self {
            mode,
            max_frame_len,
        }
    }

    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    /// Attempts to decode one frame from the front of `src` without consuming it.
    ///
    /// In raw-text mode everything buffered is one frame, because the caller only
    /// ever hands over the bytes of a single socket read.
    pub fn decode_next(&self, src: &[u8]) -> Result<Decoded, BridgeError> {
        match self.mode {
            FramingMode::LengthPrefixed => self.decode_length_prefixed(src),
            FramingMode::RawText => {
                if src.is_empty() {
                    return Ok(Decoded::NeedMoreData);
                }
                Ok(Decoded::Frame {
                    frame: Frame::new(String::from_utf8_lossy(src)),
                    consumed: src.len(),
                })
            }
        }
    }

    fn decode_length_prefixed(&self, src: &[u8]) -> Result<Decoded, BridgeError> {
        let Some(declared) = read_length_header(src) else {
            return Ok(Decoded::NeedMoreData);
        };
        if declared > self.max_frame_len {
            return Err(BridgeError::FrameTooLarge {
                len: declared,
                max: self.max_frame_len,
            });
        }

        let total = LENGTH_HEADER_LEN + declared;
        if src.len() < total {
            return Ok(Decoded::NeedMoreData);
        }

        let payload = std::str::from_utf8(&src[LENGTH_HEADER_LEN..total])
            .map_err(|_| BridgeError::InvalidUtf8)?;
        Ok(Decoded::Frame {
            frame: Frame::new(payload),
            consumed: total,
        })
    }
}

/// Reads the big-endian length header, if four bytes are available.
pub(crate) fn read_length_header(src: &[u8]) -> Option<usize> {
    let header: [u8; LENGTH_HEADER_LEN] = src.get(..LENGTH_HEADER_LEN)?.try_into().ok()?;
    Some(u32::from_be_bytes(header) as usize)
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = BridgeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode_next(src)? {
            Decoded::Frame { frame, consumed } => {
                src.advance(consumed);
                Ok(Some(frame))
            }
            Decoded::NeedMoreData => {
                // Reserve room for the rest of a partially received frame.
                if self.mode == FramingMode::LengthPrefixed
                    && let Some(declared) = read_length_header(src)
                {
                    src.reserve((LENGTH_HEADER_LEN + declared).saturating_sub(src.len()));
                }
                Ok(None)
            }
        }
    }
}

impl Encoder<&str> for FrameCodec {
    type Error = BridgeError;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match self.mode {
            FramingMode::LengthPrefixed => {
                if item.len() > self.max_frame_len {
                    return Err(BridgeError::FrameTooLarge {
                        len: item.len(),
                        max: self.max_frame_len,
                    });
                }
                dst.reserve(LENGTH_HEADER_LEN + item.len());
                dst.put_u32(item.len() as u32);
                dst.extend_from_slice(item.as_bytes());
            }
            FramingMode::RawText => dst.extend_from_slice(item.as_bytes()),
        }
        Ok(())
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = BridgeError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&str>>::encode(self, item.text(), dst)
    }
}
