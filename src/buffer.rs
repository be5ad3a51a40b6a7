use alloc::vec::Vec;

use crate::read::ByteReader;
use crate::wire::key;
use crate::{DecodeError, WireType};

/// ZigZag-encode a signed 32 bit integer.
pub const fn zigzag_encode32(val: i32) -> u32 {
    ((val << 1) ^ (val >> 31)) as u32
}

/// ZigZag-encode a signed 64 bit integer.
pub const fn zigzag_encode64(val: i64) -> u64 {
    ((val << 1) ^ (val >> 63)) as u64
}

/// Inverse of [`zigzag_encode32`].
pub const fn zigzag_decode32(u: u32) -> i32 {
    ((u >> 1) as i32) ^ -((u & 1) as i32)
}

/// Inverse of [`zigzag_encode64`].
pub const fn zigzag_decode64(u: u64) -> i64 {
    ((u >> 1) as i64) ^ -((u & 1) as i64)
}

/// Growable byte sequence that protobuf values are written to and read from.
///
/// Writes append to the end. Reads consume from the front, and a failed read consumes nothing.
/// Two buffers are equal when their bytes are equal.
#[derive(Clone, Default, PartialEq, Eq, Hash, Debug)]
pub struct ByteBuffer {
    bytes: Vec<u8>,
}

impl ByteBuffer {
    /// Create an empty [`ByteBuffer`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the bytes written so far.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take the bytes out of the buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Drop everything written after the first `len` bytes.
    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    /// Run `f`, discarding whatever it wrote if it fails.
    pub(crate) fn atomically<T, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E> {
        let start = self.len();
        let res = f(self);
        if res.is_err() {
            self.truncate(start);
        }
        res
    }

    /// Write raw bytes without any framing.
    pub fn write_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Write a base-128 varint, least significant group first.
    pub fn write_varint(&mut self, mut val: u64) -> &mut Self {
        loop {
            let mut part = val & 0x7F;
            let rest = val >> 7;
            if rest != 0 {
                part |= 0x80
            }

            self.bytes.push(part as u8);

            if rest == 0 {
                return self;
            }
            val = rest
        }
    }

    /// Write the 64-bit two's-complement pattern of `val` as a varint.
    ///
    /// Negative values always take 10 bytes.
    pub fn write_signed_varint(&mut self, val: i64) -> &mut Self {
        self.write_varint(val as u64)
    }

    pub fn write_bool(&mut self, val: bool) -> &mut Self {
        self.write_varint(val as u64)
    }

    pub fn write_zigzag32(&mut self, val: i32) -> &mut Self {
        self.write_varint(zigzag_encode32(val) as u64)
    }

    pub fn write_zigzag64(&mut self, val: i64) -> &mut Self {
        self.write_varint(zigzag_encode64(val))
    }

    pub fn write_fixed32(&mut self, val: u32) -> &mut Self {
        self.write_raw(&val.to_le_bytes())
    }

    pub fn write_fixed64(&mut self, val: u64) -> &mut Self {
        self.write_raw(&val.to_le_bytes())
    }

    pub fn write_sfixed32(&mut self, val: i32) -> &mut Self {
        self.write_raw(&val.to_le_bytes())
    }

    pub fn write_sfixed64(&mut self, val: i64) -> &mut Self {
        self.write_raw(&val.to_le_bytes())
    }

    pub fn write_float(&mut self, val: f32) -> &mut Self {
        self.write_raw(&val.to_le_bytes())
    }

    pub fn write_double(&mut self, val: f64) -> &mut Self {
        self.write_raw(&val.to_le_bytes())
    }

    /// Write a varint length followed by `bytes`.
    pub fn write_length_delimited(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_varint(bytes.len() as u64).write_raw(bytes)
    }

    /// Write the key of a field.
    pub fn write_key(&mut self, number: u32, wire_type: WireType) -> &mut Self {
        self.write_varint(key(number, wire_type))
    }

    /// Run a read against the front of the buffer and drop the bytes it consumed.
    pub(crate) fn consume<T>(&mut self, f: impl FnOnce(&mut ByteReader<'_>) -> Result<T, DecodeError>) -> Result<T, DecodeError> {
        let mut r = ByteReader::new(&self.bytes);
        let res = f(&mut r)?;
        let used = self.bytes.len() - r.remaining();
        self.bytes.drain(..used);
        Ok(res)
    }

    pub fn read_varint(&mut self) -> Result<u64, DecodeError> {
        self.consume(|r| r.read_varint())
    }

    pub fn read_signed_varint(&mut self) -> Result<i64, DecodeError> {
        self.consume(|r| r.read_signed_varint())
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        self.consume(|r| r.read_bool())
    }

    pub fn read_zigzag32(&mut self) -> Result<i32, DecodeError> {
        self.consume(|r| r.read_zigzag32())
    }

    pub fn read_zigzag64(&mut self) -> Result<i64, DecodeError> {
        self.consume(|r| r.read_zigzag64())
    }

    pub fn read_fixed32(&mut self) -> Result<u32, DecodeError> {
        self.consume(|r| r.read_fixed32())
    }

    pub fn read_fixed64(&mut self) -> Result<u64, DecodeError> {
        self.consume(|r| r.read_fixed64())
    }

    pub fn read_sfixed32(&mut self) -> Result<i32, DecodeError> {
        self.consume(|r| r.read_sfixed32())
    }

    pub fn read_sfixed64(&mut self) -> Result<i64, DecodeError> {
        self.consume(|r| r.read_sfixed64())
    }

    pub fn read_float(&mut self) -> Result<f32, DecodeError> {
        self.consume(|r| r.read_float())
    }

    pub fn read_double(&mut self) -> Result<f64, DecodeError> {
        self.consume(|r| r.read_double())
    }

    /// Read a varint length, then exactly that many raw bytes.
    pub fn read_length_delimited(&mut self) -> Result<Vec<u8>, DecodeError> {
        self.consume(|r| r.read_length_delimited().map(<[u8]>::to_vec))
    }

    /// Read a field key.
    pub fn read_key(&mut self) -> Result<(u32, WireType), DecodeError> {
        self.consume(|r| r.read_key())
    }

    /// A reader over the unconsumed bytes. Reading from it leaves the buffer untouched.
    pub fn reader(&self) -> ByteReader<'_> {
        ByteReader::new(&self.bytes)
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self { bytes: bytes.to_vec() }
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq<[u8]> for ByteBuffer {
    fn eq(&self, other: &[u8]) -> bool {
        self.bytes == other
    }
}

impl PartialEq<&[u8]> for ByteBuffer {
    fn eq(&self, other: &&[u8]) -> bool {
        self.bytes == *other
    }
}

impl<const N: usize> PartialEq<[u8; N]> for ByteBuffer {
    fn eq(&self, other: &[u8; N]) -> bool {
        self.bytes == other
    }
}

impl<const N: usize> PartialEq<&[u8; N]> for ByteBuffer {
    fn eq(&self, other: &&[u8; N]) -> bool {
        self.bytes == *other
    }
}
