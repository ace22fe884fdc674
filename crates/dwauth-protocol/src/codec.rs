//! Stream reassembly and outbound encoding.
//!
//! TCP delivers a byte stream, not messages. A single read may hold half a
//! frame, exactly one frame, or several frames back to back. The
//! [`FrameCodec`] keeps an accumulation buffer per connection and cuts
//! complete frames off its front:
//!
//! ```text
//! loop:
//!   < 2 bytes buffered            → wait for more
//!   length == 0 or > max frame    → drop the whole buffer (violation)
//!   < length bytes buffered       → wait for more
//!   otherwise                     → split off `length` bytes, decrypt, emit
//! ```
//!
//! There is no delimiter to resynchronize on, so a bad length throws away
//! everything buffered and the client has to start over from a clean frame.
//!
//! The length header is never encrypted, which is what lets reassembly run
//! on ciphertext: each frame is decrypted only once it is complete.

use bytes::{Bytes, BytesMut};
use dwauth_cipher::Cipher;

use crate::{Frame, ProtocolError, hex_dump};

/// Size of the length prefix.
const LENGTH_PREFIX: usize = 2;

/// Limits applied by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecLimits {
    /// Largest frame accepted or produced, header included.
    pub max_frame_size: usize,

    /// Largest accumulation buffer. A read that would grow the buffer past
    /// this discards it.
    pub max_buffer_size: usize,

    /// Protocol violations tolerated before the connection should be
    /// closed. `None` tolerates any number.
    pub max_violations: Option<u32>,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_frame_size: 8 * 1024,
            max_buffer_size: 128 * 1024,
            max_violations: Some(8),
        }
    }
}

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// Per-connection reassembly state.
#[derive(Debug)]
pub struct FrameCodec {
    cipher: Cipher,
    limits: CodecLimits,
    buffer: BytesMut,
    violations: u32,
    last_violation: Option<ProtocolError>,
}

impl FrameCodec {
    pub fn new(cipher: Cipher, limits: CodecLimits) -> Self {
        Self {
            cipher,
            limits,
            buffer: BytesMut::new(),
            violations: 0,
            last_violation: None,
        }
    }

    /// Appends freshly received bytes and returns every frame completed by
    /// them, in stream order. Incomplete trailing bytes stay buffered.
    pub fn feed(&mut self, incoming: &[u8]) -> Vec<Frame> {
        if self.buffer.len() + incoming.len() > self.limits.max_buffer_size {
            tracing::warn!(
                buffered = self.buffer.len(),
                incoming = incoming.len(),
                max = self.limits.max_buffer_size,
                "accumulation buffer overflow, discarding"
            );
            self.buffer.clear();
            return Vec::new();
        }
        self.buffer.extend_from_slice(incoming);

        let mut frames = Vec::new();
        while self.buffer.len() >= LENGTH_PREFIX {
            let len = u16::from_le_bytes([self.buffer[0], self.buffer[1]]);
            if len == 0 || len as usize > self.limits.max_frame_size {
                let err = ProtocolError::InvalidLength(len);
                tracing::warn!(
                    error = %err,
                    max = self.limits.max_frame_size,
                    discarded = self.buffer.len(),
                    "discarding buffer"
                );
                self.buffer.clear();
                self.record_violation(err);
                break;
            }
            if self.buffer.len() < len as usize {
                break;
            }

            let mut raw = self.buffer.split_to(len as usize);
            self.cipher.decrypt(&mut raw);
            let raw = raw.freeze();
            match Frame::decode(raw.clone()) {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    tracing::warn!(error = %e, "undecodable frame\n{}", hex_dump(&raw));
                    self.record_violation(e);
                }
            }
        }
        frames
    }

    /// Bytes received but not yet resolved into a frame.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Protocol violations seen so far.
    pub fn violations(&self) -> u32 {
        self.violations
    }

    /// The most recent violation, if any.
    pub fn last_violation(&self) -> Option<&ProtocolError> {
        self.last_violation.as_ref()
    }

    /// Returns the error to close the connection with, once the violation
    /// limit has been reached.
    pub fn check_violations(&self) -> Result<(), ProtocolError> {
        match self.limits.max_violations {
            Some(max) if self.violations >= max => {
                Err(ProtocolError::TooManyViolations(self.violations))
            }
            _ => Ok(()),
        }
    }

    fn record_violation(&mut self, err: ProtocolError) {
        self.violations += 1;
        self.last_violation = Some(err);
    }
}

// ---------------------------------------------------------------------------
// FrameEncoder
// ---------------------------------------------------------------------------

/// Turns outbound frames into ready-to-write ciphertext.
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    cipher: Cipher,
    max_frame_size: usize,
}

impl FrameEncoder {
    pub fn new(cipher: Cipher, max_frame_size: usize) -> Self {
        Self {
            cipher,
            max_frame_size,
        }
    }

    /// Encodes and encrypts one frame.
    pub fn encode(&self, frame: &Frame) -> Result<Bytes, ProtocolError> {
        let len = frame.wire_len();
        if len > self.max_frame_size {
            return Err(ProtocolError::FrameTooLarge {
                len,
                max: self.max_frame_size,
            });
        }
        let mut buf = frame.encode()?;
        self.cipher.encrypt(&mut buf);
        Ok(buf.freeze())
    }

    /// The cipher applied to outbound frames.
    pub fn cipher(&self) -> &Cipher {
        &self.cipher
    }
}

#[cfg(test)]
mod tests {
    use dwauth_cipher::CipherSwitch;

    use super::*;

    fn plain_codec() -> FrameCodec {
        FrameCodec::new(
            Cipher::new(CipherSwitch::in_memory(false)),
            CodecLimits::default(),
        )
    }

    fn wire(frame: &Frame) -> Vec<u8> {
        frame.encode().unwrap().to_vec()
    }

    #[test]
    fn test_feed_single_frame() {
        let mut codec = plain_codec();
        let frame = Frame::new(3301, vec![1, 2, 3]);
        let out = codec.feed(&wire(&frame));
        assert_eq!(out, vec![frame]);
        assert!(codec.buffered().is_empty());
    }

    #[test]
    fn test_feed_multiple_frames_one_read() {
        let mut codec = plain_codec();
        let a = Frame::new(1, vec![9]);
        let b = Frame::new(2, vec![]);
        let c = Frame::new(-1, vec![7; 12]);
        let mut bytes = wire(&a);
        bytes.extend(wire(&b));
        bytes.extend(wire(&c));
        assert_eq!(codec.feed(&bytes), vec![a, b, c]);
    }

    #[test]
    fn test_feed_partial_frame_waits() {
        let mut codec = plain_codec();
        let frame = Frame::new(1701, vec![5; 10]);
        let bytes = wire(&frame);
        assert!(codec.feed(&bytes[..1]).is_empty());
        assert!(codec.feed(&bytes[1..6]).is_empty());
        assert_eq!(codec.buffered().len(), 6);
        assert_eq!(codec.feed(&bytes[6..]), vec![frame]);
        assert!(codec.buffered().is_empty());
    }

    #[test]
    fn test_feed_keeps_unconsumed_tail() {
        let mut codec = plain_codec();
        let frame = Frame::new(1, vec![1]);
        let mut bytes = wire(&frame);
        bytes.extend_from_slice(&[10, 0, 0xAA]);
        assert_eq!(codec.feed(&bytes), vec![frame]);
        assert_eq!(codec.buffered(), &[10, 0, 0xAA]);
    }

    #[test]
    fn test_feed_zero_length_discards_buffer() {
        let mut codec = plain_codec();
        assert!(codec.feed(&[0, 0, 1, 2, 3]).is_empty());
        assert!(codec.buffered().is_empty());
        assert_eq!(codec.violations(), 1);
        assert!(matches!(codec.last_violation(), Some(ProtocolError::InvalidLength(0))));
    }

    #[test]
    fn test_feed_oversized_length_then_resync() {
        let mut codec = plain_codec();
        let bogus = [0xFF, 0xFF, 1, 2, 3, 4];
        assert!(codec.feed(&bogus).is_empty());
        assert!(codec.buffered().is_empty());
        assert!(matches!(
            codec.last_violation(),
            Some(ProtocolError::InvalidLength(0xFFFF))
        ));

        let frame = Frame::new(1702, vec![4, 0, 0, 0]);
        assert_eq!(codec.feed(&wire(&frame)), vec![frame]);
    }

    #[test]
    fn test_feed_frames_before_bad_length_survive() {
        let mut codec = plain_codec();
        let frame = Frame::new(1, vec![1, 2]);
        let mut bytes = wire(&frame);
        bytes.extend_from_slice(&[0, 0, 9, 9]);
        assert_eq!(codec.feed(&bytes), vec![frame]);
        assert!(codec.buffered().is_empty());
    }

    #[test]
    fn test_feed_header_only_frame_is_violation() {
        let mut codec = plain_codec();
        assert!(codec.feed(&[3, 0, 1]).is_empty());
        assert_eq!(codec.violations(), 1);
        assert!(matches!(
            codec.last_violation(),
            Some(ProtocolError::BufferUnderflow { needed: 4, available: 3 })
        ));
        assert!(codec.buffered().is_empty());
    }

    #[test]
    fn test_feed_buffer_overflow_discards_everything() {
        let mut codec = FrameCodec::new(
            Cipher::new(CipherSwitch::in_memory(false)),
            CodecLimits {
                max_frame_size: 64,
                max_buffer_size: 16,
                max_violations: None,
            },
        );
        assert!(codec.feed(&[40, 0, 1, 2, 3, 4, 5, 6, 7, 8]).is_empty());
        assert_eq!(codec.buffered().len(), 10);
        assert!(codec.feed(&[0u8; 8]).is_empty());
        assert!(codec.buffered().is_empty());

        // Fresh state afterwards.
        let frame = Frame::new(5, vec![1]);
        assert_eq!(codec.feed(&wire(&frame)), vec![frame]);
    }

    #[test]
    fn test_check_violations_limit() {
        let mut codec = FrameCodec::new(
            Cipher::new(CipherSwitch::in_memory(false)),
            CodecLimits {
                max_violations: Some(2),
                ..CodecLimits::default()
            },
        );
        codec.feed(&[0, 0]);
        assert!(codec.check_violations().is_ok());
        codec.feed(&[0, 0]);
        assert!(matches!(
            codec.check_violations(),
            Err(ProtocolError::TooManyViolations(2))
        ));
    }

    #[test]
    fn test_check_violations_unlimited() {
        let mut codec = FrameCodec::new(
            Cipher::new(CipherSwitch::in_memory(false)),
            CodecLimits {
                max_violations: None,
                ..CodecLimits::default()
            },
        );
        for _ in 0..100 {
            codec.feed(&[0, 0]);
        }
        assert!(codec.check_violations().is_ok());
    }

    #[test]
    fn test_encoder_output_decodes_through_codec() {
        let cipher = Cipher::new(CipherSwitch::in_memory(true));
        let encoder = FrameEncoder::new(cipher.clone(), 8192);
        let mut codec = FrameCodec::new(cipher, CodecLimits::default());

        let frame = Frame::new(3301, b"payload bytes".to_vec());
        let bytes = encoder.encode(&frame).unwrap();
        assert_ne!(&bytes[2..], &wire(&frame)[2..]);
        assert_eq!(codec.feed(&bytes), vec![frame]);
    }

    #[test]
    fn test_encoder_rejects_oversized_frame() {
        let encoder = FrameEncoder::new(Cipher::new(CipherSwitch::in_memory(false)), 16);
        let frame = Frame::new(1, vec![0; 13]);
        assert!(matches!(
            encoder.encode(&frame),
            Err(ProtocolError::FrameTooLarge { len: 17, max: 16 })
        ));
    }
}
