// tests/property/codec_test.rs

//! Property-based tests for frame decoding and mode detection.

use boardlink::core::BridgeError;
use boardlink::core::protocol::{Decoded, Detection, FrameCodec, FramingMode, classify};
use bytes::BytesMut;
use proptest::prelude::*;
use tokio_util::codec::Decoder;

const MAX: usize = 4096;

fn prefixed(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 500,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_decode_yields_payload_and_consumes_header_plus_length(
        payload in ".{0,512}",
        trailing in prop::collection::vec(any::<u8>(), 0..32)
    ) {
        let codec = FrameCodec::new(FramingMode::LengthPrefixed, MAX);
        let mut bytes = prefixed(payload.as_bytes());
        bytes.extend_from_slice(&trailing);

        match codec.decode_next(&bytes).unwrap() {
            Decoded::Frame { frame, consumed } => {
                prop_assert_eq!(frame.text(), payload.as_str());
                prop_assert_eq!(consumed, 4 + payload.len());
            }
            Decoded::NeedMoreData => prop_assert!(false, "complete frame not decoded"),
        }
    }

    #[test]
    fn test_truncated_frame_needs_more_data(
        payload in prop::collection::vec(any::<u8>(), 1..256),
        cut in any::<prop::sample::Index>()
    ) {
        let codec = FrameCodec::new(FramingMode::LengthPrefixed, MAX);
        let bytes = prefixed(&payload);
        let cut = cut.index(bytes.len());
        prop_assert_eq!(codec.decode_next(&bytes[..cut]).unwrap(), Decoded::NeedMoreData);
    }

    #[test]
    fn test_over_limit_length_is_an_error(declared in (MAX as u32 + 1)..=u32::MAX) {
        let codec = FrameCodec::new(FramingMode::LengthPrefixed, MAX);
        let err = codec.decode_next(&declared.to_be_bytes()).unwrap_err();
        let is_too_large = matches!(err, BridgeError::FrameTooLarge { .. });
        prop_assert!(is_too_large);
    }

    #[test]
    fn test_invalid_utf8_is_an_error(
        prefix in "[a-z]{0,16}",
        bad in 0xf8u8..=0xff
    ) {
        let codec = FrameCodec::new(FramingMode::LengthPrefixed, MAX);
        let mut payload = prefix.into_bytes();
        payload.push(bad);
        let err = codec.decode_next(&prefixed(&payload)).unwrap_err();
        prop_assert!(matches!(err, BridgeError::InvalidUtf8));
    }

    #[test]
    fn test_frames_survive_arbitrary_chunking(
        payloads in prop::collection::vec("[ -~]{0,64}", 1..8),
        chunk in 1usize..16
    ) {
        let mut stream = Vec::new();
        for payload in &payloads {
            stream.extend_from_slice(&prefixed(payload.as_bytes()));
        }

        let mut codec = FrameCodec::new(FramingMode::LengthPrefixed, MAX);
        let mut buf = BytesMut::new();
        let mut decoded = Vec::new();
        for piece in stream.chunks(chunk) {
            buf.extend_from_slice(piece);
            while let Some(frame) = codec.decode(&mut buf).unwrap() {
                decoded.push(frame.text().to_string());
            }
        }
        prop_assert_eq!(decoded, payloads);
        prop_assert!(buf.is_empty());
    }

    #[test]
    fn test_json_objects_detect_as_raw_text(key in "[a-zA-Z0-9]{1,16}", value in "[ -~]{0,32}") {
        let text = serde_json::json!({ key: value }).to_string();
        prop_assert_eq!(classify(text.as_bytes(), MAX), Detection::Decided(FramingMode::RawText));
    }

    #[test]
    fn test_complete_prefixed_frames_detect_as_length_prefixed(
        payload in prop::collection::vec(any::<u8>(), 0..512)
    ) {
        prop_assert_eq!(
            classify(&prefixed(&payload), MAX),
            Detection::Decided(FramingMode::LengthPrefixed)
        );
    }

    #[test]
    fn test_raw_text_frame_is_the_whole_read(bytes in prop::collection::vec(any::<u8>(), 1..256)) {
        let codec = FrameCodec::new(FramingMode::RawText, MAX);
        match codec.decode_next(&bytes).unwrap() {
            Decoded::Frame { frame, consumed } => {
                prop_assert_eq!(consumed, bytes.len());
                let expected = String::from_utf8_lossy(&bytes).into_owned();
                prop_assert_eq!(frame.text(), expected.as_str());
            }
            Decoded::NeedMoreData => prop_assert!(false, "raw bytes not decoded"),
        }
    }
}
