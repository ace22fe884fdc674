//! Typed field access inside a frame payload.
//!
//! All integers are little-endian. Strings are encoded as
//! `u8 size | size ASCII bytes | 0x00`; a size of zero carries no bytes at
//! all, not even the terminator.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{Frame, ProtocolError};

/// Longest string the `u8` size prefix can describe.
const MAX_STRING_LEN: usize = u8::MAX as usize;

/// Reads fields from a payload, front to back.
#[derive(Debug, Clone)]
pub struct PacketReader {
    buf: Bytes,
}

impl PacketReader {
    pub fn new(payload: Bytes) -> Self {
        Self { buf: payload }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, needed: usize) -> Result<(), ProtocolError> {
        if self.buf.remaining() < needed {
            return Err(ProtocolError::BufferUnderflow {
                needed,
                available: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<(), ProtocolError> {
        self.ensure(n)?;
        self.buf.advance(n);
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_i16(&mut self) -> Result<i16, ProtocolError> {
        self.ensure(2)?;
        Ok(self.buf.get_i16_le())
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes, ProtocolError> {
        self.ensure(n)?;
        Ok(self.buf.split_to(n))
    }

    /// Reads a size-prefixed, NUL-terminated ASCII string.
    ///
    /// Trailing NULs are stripped. Bytes outside ASCII decode as `?`.
    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let size = self.read_u8()? as usize;
        if size == 0 {
            return Ok(String::new());
        }
        let raw = self.read_bytes(size + 1)?;
        let text: String = raw
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { '?' })
            .collect();
        Ok(text.trim_end_matches('\0').to_string())
    }
}

/// Builds a payload field by field.
#[derive(Debug, Default)]
pub struct PacketWriter {
    buf: BytesMut,
}

impl PacketWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.buf.put_u16_le(value);
        self
    }

    pub fn write_i16(&mut self, value: i16) -> &mut Self {
        self.buf.put_i16_le(value);
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.buf.put_u32_le(value);
        self
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.buf.put_i32_le(value);
        self
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.put_slice(bytes);
        self
    }

    /// Writes a size-prefixed, NUL-terminated ASCII string.
    ///
    /// Non-ASCII characters are written as `?`; anything past 255 bytes is
    /// cut off.
    pub fn write_string(&mut self, value: &str) -> &mut Self {
        let ascii: Vec<u8> = value
            .chars()
            .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
            .take(MAX_STRING_LEN)
            .collect();
        self.buf.put_u8(ascii.len() as u8);
        if !ascii.is_empty() {
            self.buf.put_slice(&ascii);
            self.buf.put_u8(0);
        }
        self
    }

    /// Payload bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Wraps the payload in a frame.
    pub fn into_frame(self, opcode: i16) -> Frame {
        Frame::new(opcode, self.buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(bytes: &'static [u8]) -> PacketReader {
        PacketReader::new(Bytes::from_static(bytes))
    }

    #[test]
    fn test_read_string_strips_terminator() {
        let mut r = reader(&[5, b'a', b'l', b'i', b'c', b'e', 0, 0xFF]);
        assert_eq!(r.read_string().unwrap(), "alice");
        assert_eq!(r.remaining(), 1);
    }

    #[test]
    fn test_read_string_zero_size_consumes_only_prefix() {
        let mut r = reader(&[0, 7]);
        assert_eq!(r.read_string().unwrap(), "");
        assert_eq!(r.read_u8().unwrap(), 7);
    }

    #[test]
    fn test_read_string_truncated_underflows() {
        let mut r = reader(&[4, b'a', b'b']);
        assert!(matches!(
            r.read_string(),
            Err(ProtocolError::BufferUnderflow { needed: 5, available: 2 })
        ));
    }

    #[test]
    fn test_read_string_non_ascii_replaced() {
        let mut r = reader(&[2, b'o', 0xE9, 0]);
        assert_eq!(r.read_string().unwrap(), "o?");
    }

    #[test]
    fn test_write_string_layout() {
        let mut w = PacketWriter::new();
        w.write_string("ab").write_string("");
        let frame = w.into_frame(1);
        assert_eq!(&frame.payload()[..], &[2, b'a', b'b', 0, 0]);
    }

    #[test]
    fn test_write_string_truncates_long_values() {
        let long = "x".repeat(300);
        let mut w = PacketWriter::new();
        w.write_string(&long);
        assert_eq!(w.len(), 1 + 255 + 1);
        let mut r = w.into_frame(1).reader();
        assert_eq!(r.read_string().unwrap().len(), 255);
    }

    #[test]
    fn test_integers_little_endian() {
        let mut w = PacketWriter::new();
        w.write_u16(0x1234).write_i32(-2).write_u32(7);
        let mut r = w.into_frame(0).reader();
        assert_eq!(r.read_u8().unwrap(), 0x34);
        assert_eq!(r.read_u8().unwrap(), 0x12);
        assert_eq!(r.read_i32().unwrap(), -2);
        assert_eq!(r.read_u32().unwrap(), 7);
        assert!(r.read_u8().is_err());
    }

    #[test]
    fn test_skip_past_end_errors() {
        let mut r = reader(&[1, 2, 3]);
        assert!(r.skip(4).is_err());
        r.skip(3).unwrap();
        assert_eq!(r.remaining(), 0);
    }
}
