//! Outbound packet capability plus little-endian packet builders.
//!
//! The session layer only needs one thing from an outbound packet: its
//! bytes. That is the [`SendablePacket`] trait. Each packet kind is its own
//! type implementing it; there is no base packet class.
//!
//! [`PacketWriter`] and [`PacketReader`] are conveniences for dispatchers
//! that speak the classic layout: little-endian primitives and strings
//! prefixed by a `u16` byte length.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::ProtocolError;

/// Anything that can be turned into a plaintext payload for sending.
pub trait SendablePacket: Send + Sync {
    /// Produces the plaintext bytes of this packet.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the packet cannot be encoded.
    fn serialize(&self) -> Result<Bytes, ProtocolError>;
}

impl SendablePacket for Bytes {
    fn serialize(&self) -> Result<Bytes, ProtocolError> {
        Ok(self.clone())
    }
}

impl SendablePacket for Vec<u8> {
    fn serialize(&self) -> Result<Bytes, ProtocolError> {
        Ok(Bytes::copy_from_slice(self))
    }
}

impl SendablePacket for &'static [u8] {
    fn serialize(&self) -> Result<Bytes, ProtocolError> {
        Ok(Bytes::from_static(self))
    }
}

// ---------------------------------------------------------------------------
// PacketWriter
// ---------------------------------------------------------------------------

/// Builds a packet body field by field.
///
/// ```rust
/// use wyrmgate_protocol::{PacketWriter, SendablePacket};
///
/// let mut packet = PacketWriter::new();
/// packet.write_u16(1).write_string("hello").unwrap();
///
/// let bytes = packet.serialize().unwrap();
/// assert_eq!(&bytes[..4], &[1, 0, 5, 0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PacketWriter {
    buf: BytesMut,
}

impl PacketWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    pub fn write_bool(&mut self, value: bool) -> &mut Self {
        self.write_u8(u8::from(value))
    }

    pub fn write_u16(&mut self, value: u16) -> &mut Self {
        self.buf.put_u16_le(value);
        self
    }

    pub fn write_i16(&mut self, value: i16) -> &mut Self {
        self.buf.put_i16_le(value);
        self
    }

    pub fn write_i32(&mut self, value: i32) -> &mut Self {
        self.buf.put_i32_le(value);
        self
    }

    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        self.buf.put_i64_le(value);
        self
    }

    pub fn write_f32(&mut self, value: f32) -> &mut Self {
        self.buf.put_f32_le(value);
        self
    }

    pub fn write_f64(&mut self, value: f64) -> &mut Self {
        self.buf.put_f64_le(value);
        self
    }

    /// Appends raw bytes with no length prefix.
    pub fn write_bytes(&mut self, value: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(value);
        self
    }

    /// Appends a UTF-8 string prefixed by its byte length as `u16`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::StringTooLong`] if the string exceeds
    /// `u16::MAX` bytes. Nothing is written in that case.
    pub fn write_string(&mut self, value: &str) -> Result<&mut Self, ProtocolError> {
        let len = u16::try_from(value.len())
            .map_err(|_| ProtocolError::StringTooLong(value.len()))?;
        self.buf.put_u16_le(len);
        self.buf.extend_from_slice(value.as_bytes());
        Ok(self)
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consumes the writer and returns the finished body.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

impl SendablePacket for PacketWriter {
    fn serialize(&self) -> Result<Bytes, ProtocolError> {
        Ok(Bytes::copy_from_slice(&self.buf))
    }
}

// ---------------------------------------------------------------------------
// PacketReader
// ---------------------------------------------------------------------------

/// Reads fields from a received plaintext payload.
///
/// Every read checks the remaining length first, so a short packet from a
/// hostile client produces [`ProtocolError::Truncated`] instead of a panic.
#[derive(Debug, Clone)]
pub struct PacketReader {
    buf: Bytes,
}

impl PacketReader {
    /// Wraps a payload for reading.
    pub fn new(payload: Bytes) -> Self {
        Self { buf: payload }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, needed: usize) -> Result<(), ProtocolError> {
        if self.buf.remaining() < needed {
            return Err(ProtocolError::Truncated {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_i16(&mut self) -> Result<i16, ProtocolError> {
        self.ensure(2)?;
        Ok(self.buf.get_i16_le())
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_i64(&mut self) -> Result<i64, ProtocolError> {
        self.ensure(8)?;
        Ok(self.buf.get_i64_le())
    }

    pub fn read_f32(&mut self) -> Result<f32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_f32_le())
    }

    pub fn read_f64(&mut self) -> Result<f64, ProtocolError> {
        self.ensure(8)?;
        Ok(self.buf.get_f64_le())
    }

    /// Reads exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<Bytes, ProtocolError> {
        self.ensure(len)?;
        Ok(self.buf.split_to(len))
    }

    /// Reads a `u16`-length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let len = self.read_u16()? as usize;
        let raw = self.read_bytes(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
    }
}
