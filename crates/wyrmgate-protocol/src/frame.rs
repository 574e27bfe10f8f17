//! Length-prefixed framing over a raw byte stream.
//!
//! Wire layout of one frame:
//!
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ len: u16 LE  │ body: `len` bytes            │
//! └──────────────┴──────────────────────────────┘
//! ```
//!
//! `len` counts the body only, never the header. The body is opaque here;
//! one layer up it is ciphertext.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder};

use crate::FramingError;

/// Size of the length header in bytes.
pub const HEADER_LEN: usize = 2;

/// Default body limit: the largest value of a signed 16-bit length, which
/// is what existing clients emit.
pub const DEFAULT_MAX_FRAME_LEN: u16 = i16::MAX as u16;

/// Framing limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Largest accepted body length. A header declaring more is rejected
    /// with [`FramingError::FrameTooLarge`].
    pub max_frame_len: u16,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

/// Splits a byte stream into frames and wraps payloads into frames.
///
/// Implements `tokio_util`'s [`Decoder`] and [`Encoder`], so it can drive a
/// `Framed` stream directly. It can also be fed a buffer by hand through
/// [`FrameCodec::frames`]. Decoding is restartable: an incomplete trailing
/// frame stays in the buffer until more bytes arrive.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_len: usize,
}

impl FrameCodec {
    /// Creates a codec enforcing the given limits.
    pub fn new(config: FrameConfig) -> Self {
        Self {
            max_frame_len: config.max_frame_len as usize,
        }
    }

    /// Returns the configured body limit.
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// Encodes one payload into a standalone frame.
    pub fn encode_frame(&self, payload: &[u8]) -> Result<Bytes, FramingError> {
        let mut dst = BytesMut::with_capacity(HEADER_LEN + payload.len());
        self.write_frame(payload, &mut dst)?;
        Ok(dst.freeze())
    }

    /// Returns an iterator over every complete frame currently in `buf`.
    ///
    /// Consumed frames are removed from `buf`; a partial trailing frame is
    /// left in place. The iterator ends after the first error.
    pub fn frames<'a>(&'a mut self, buf: &'a mut BytesMut) -> Frames<'a> {
        Frames {
            codec: self,
            buf,
            failed: false,
        }
    }

    fn write_frame(&self, payload: &[u8], dst: &mut BytesMut) -> Result<(), FramingError> {
        self.check_len(payload.len())?;
        dst.reserve(HEADER_LEN + payload.len());
        // `check_len` guarantees the length fits: max_frame_len <= u16::MAX.
        dst.put_u16_le(payload.len() as u16);
        dst.extend_from_slice(payload);
        Ok(())
    }

    fn check_len(&self, len: usize) -> Result<(), FramingError> {
        if len > self.max_frame_len {
            return Err(FramingError::FrameTooLarge {
                declared: len,
                max: self.max_frame_len,
            });
        }
        Ok(())
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(FrameConfig::default())
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = FramingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, FramingError> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        let declared = u16::from_le_bytes([src[0], src[1]]) as usize;
        self.check_len(declared)?;

        let total = HEADER_LEN + declared;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        Ok(Some(src.split_to(declared).freeze()))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = FramingError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), FramingError> {
        self.write_frame(&item, dst)
    }
}

impl Encoder<&[u8]> for FrameCodec {
    type Error = FramingError;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), FramingError> {
        self.write_frame(item, dst)
    }
}

/// Iterator returned by [`FrameCodec::frames`].
pub struct Frames<'a> {
    codec: &'a mut FrameCodec,
    buf: &'a mut BytesMut,
    failed: bool,
}

impl Iterator for Frames<'_> {
    type Item = Result<Bytes, FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.codec.decode(self.buf) {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec_with_max(max: u16) -> FrameCodec {
        FrameCodec::new(FrameConfig { max_frame_len: max })
    }

    #[test]
    fn test_default_config_max_is_signed_short_limit() {
        assert_eq!(FrameConfig::default().max_frame_len, 32767);
        assert_eq!(FrameCodec::default().max_frame_len(), 32767);
    }

    #[test]
    fn test_encode_frame_writes_little_endian_header() {
        let codec = FrameCodec::default();
        let frame = codec.encode_frame(b"abc").unwrap();
        assert_eq!(frame.as_ref(), &[3, 0, b'a', b'b', b'c']);
    }

    #[test]
    fn test_encode_frame_empty_payload_is_header_only() {
        let codec = FrameCodec::default();
        let frame = codec.encode_frame(b"").unwrap();
        assert_eq!(frame.as_ref(), &[0, 0]);
    }

    #[test]
    fn test_encode_frame_oversized_payload_returns_error() {
        let codec = codec_with_max(4);
        let result = codec.encode_frame(b"12345");
        assert!(matches!(
            result,
            Err(FramingError::FrameTooLarge { declared: 5, max: 4 })
        ));
    }

    #[test]
    fn test_decode_partial_header_waits_for_more() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::from(&[5u8][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 1, "partial header must stay buffered");
    }

    #[test]
    fn test_decode_partial_body_waits_then_completes() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::from(&[4u8, 0, b'w', b'y'][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 4);

        buf.extend_from_slice(b"rm");
        let frame = codec.decode(&mut buf).unwrap().expect("complete frame");
        assert_eq!(frame.as_ref(), b"wyrm");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_oversized_declared_length_fails_before_body_arrives() {
        // Header alone declares 0x0100 = 256 bytes; no body sent yet.
        let mut codec = codec_with_max(255);
        let mut buf = BytesMut::from(&[0u8, 1][..]);
        let result = codec.decode(&mut buf);
        assert!(matches!(
            result,
            Err(FramingError::FrameTooLarge { declared: 256, max: 255 })
        ));
    }

    #[test]
    fn test_frames_yields_all_complete_frames_and_keeps_tail() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[1, 0, b'a']);
        buf.extend_from_slice(&[2, 0, b'b', b'c']);
        buf.extend_from_slice(&[3, 0, b'd']); // incomplete

        let frames: Vec<Bytes> = codec
            .frames(&mut buf)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(frames, vec![Bytes::from_static(b"a"), Bytes::from_static(b"bc")]);
        assert_eq!(buf.as_ref(), &[3, 0, b'd']);
    }

    #[test]
    fn test_frames_stops_after_error() {
        let mut codec = codec_with_max(1);
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[1, 0, b'a']);
        buf.extend_from_slice(&[9, 0]);
        buf.extend_from_slice(&[1, 0, b'z']);

        let mut frames = codec.frames(&mut buf);
        assert!(matches!(frames.next(), Some(Ok(_))));
        assert!(matches!(frames.next(), Some(Err(FramingError::FrameTooLarge { .. }))));
        assert!(frames.next().is_none());
    }

    #[test]
    fn test_encoder_appends_to_existing_buffer() {
        let mut codec = FrameCodec::default();
        let mut dst = BytesMut::new();
        codec.encode(Bytes::from_static(b"x"), &mut dst).unwrap();
        codec.encode(&b"yz"[..], &mut dst).unwrap();
        assert_eq!(dst.as_ref(), &[1, 0, b'x', 2, 0, b'y', b'z']);
    }

    #[test]
    fn test_frame_config_deserializes_with_defaults() {
        let config: FrameConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, FrameConfig::default());

        let config: FrameConfig =
            serde_json::from_str(r#"{"max_frame_len": 1024}"#).unwrap();
        assert_eq!(config.max_frame_len, 1024);
    }
}
