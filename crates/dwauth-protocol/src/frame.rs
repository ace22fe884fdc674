//! The frame: one complete protocol message.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{PacketReader, ProtocolError};

/// One decoded protocol message.
///
/// On the wire:
///
/// ```text
/// offset 0: u16 length     total bytes including this header
/// offset 2: i16 opcode     negative = transport-reserved
/// offset 4: payload[length - 4]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    opcode: i16,
    payload: Bytes,
}

impl Frame {
    /// Size of the length + opcode header.
    pub const HEADER_LEN: usize = 4;

    /// Largest frame the `u16` length field can describe.
    pub const MAX_WIRE_LEN: usize = u16::MAX as usize;

    /// Creates a frame from an opcode and payload.
    pub fn new(opcode: i16, payload: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    /// The frame's opcode.
    pub fn opcode(&self) -> i16 {
        self.opcode
    }

    /// The bytes after the header.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Total encoded size, header included.
    pub fn wire_len(&self) -> usize {
        Self::HEADER_LEN + self.payload.len()
    }

    /// A reader positioned at the start of the payload.
    pub fn reader(&self) -> PacketReader {
        PacketReader::new(self.payload.clone())
    }

    /// Encodes the frame, header included, in plaintext.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        let len = self.wire_len();
        if len > Self::MAX_WIRE_LEN {
            return Err(ProtocolError::FrameTooLarge {
                len,
                max: Self::MAX_WIRE_LEN,
            });
        }
        let mut buf = BytesMut::with_capacity(len);
        buf.put_u16_le(len as u16);
        buf.put_i16_le(self.opcode);
        buf.put_slice(&self.payload);
        Ok(buf)
    }

    /// Parses one complete plaintext frame, header included.
    ///
    /// The declared length must match `raw.len()` exactly; the frame codec
    /// guarantees that for everything it hands out.
    pub fn decode(mut raw: Bytes) -> Result<Self, ProtocolError> {
        if raw.len() < Self::HEADER_LEN {
            return Err(ProtocolError::BufferUnderflow {
                needed: Self::HEADER_LEN,
                available: raw.len(),
            });
        }
        let declared = raw.get_u16_le();
        if declared as usize != raw.len() + 2 {
            return Err(ProtocolError::LengthMismatch {
                declared,
                actual: raw.len() + 2,
            });
        }
        let opcode = raw.get_i16_le();
        Ok(Self {
            opcode,
            payload: raw,
        })
    }
}
