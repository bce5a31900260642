// src/core/protocol/mod.rs

pub mod detect;
pub mod frame;
pub use detect::{Detection, classify};
pub use frame::{DEFAULT_MAX_FRAME_LEN, Decoded, Frame, FrameCodec, FramingMode};
