//! Primitive binary encoding shared by values and sequences.
//!
//! Unsigned integers are LEB128 varints, signed integers are zigzag varints,
//! floats are 8 big-endian bytes, strings are length-prefixed UTF-8.

use tessera_types::{Format, Hash};
use tessera_types::hash::HASH_LEN;

use crate::error::{ValueError, ValueResult};

/// Longest valid encoding of a `u64` varint.
const MAX_VARINT_BYTES: usize = 10;

/// Deepest run of collections nested inline that a reader accepts.
pub const MAX_NESTING: usize = 128;

// =============================================================================
// ENCODING
// =============================================================================

/// Byte sink for encoding values under one binary format.
#[derive(Debug, Clone)]
pub struct Writer {
    buf: Vec<u8>,
    format: Format,
}

impl Writer {
    pub fn new(format: Format) -> Self {
        Self {
            buf: Vec::new(),
            format,
        }
    }

    /// The format this writer encodes under.
    pub fn format(&self) -> Format {
        self.format
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    #[inline]
    pub fn write_hash(&mut self, hash: &Hash) {
        self.buf.extend_from_slice(hash.as_bytes());
    }

    /// Writes an unsigned varint (LEB128).
    #[inline]
    pub fn write_varint(&mut self, mut value: u64) {
        let mut buf = [0u8; MAX_VARINT_BYTES];
        let mut len = 0;
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            buf[len] = byte;
            len += 1;
            if value == 0 {
                break;
            }
        }
        self.buf.extend_from_slice(&buf[..len]);
    }

    /// Writes a signed varint (zigzag encoded).
    pub fn write_signed_varint(&mut self, value: i64) {
        self.write_varint(zigzag_encode(value));
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_bits().to_be_bytes());
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_varint(s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Bounds-checked reader over an encoded buffer.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    format: Format,
    depth: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], format: Format) -> Self {
        Self {
            data,
            pos: 0,
            format,
            depth: 0,
        }
    }

    /// The format the buffer was written under.
    pub fn format(&self) -> Format {
        self.format
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining_len(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Step into a nested collection body. Fails once [`MAX_NESTING`]
    /// levels are open.
    pub fn enter_nested(&mut self) -> ValueResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(ValueError::Decode(format!(
                "collections nested deeper than {MAX_NESTING} levels"
            )));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave_nested(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    #[inline]
    pub fn read_byte(&mut self, context: &'static str) -> ValueResult<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(ValueError::UnexpectedEof { context })?;
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> ValueResult<&'a [u8]> {
        if n > self.remaining_len() {
            return Err(ValueError::UnexpectedEof { context });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_hash(&mut self, context: &'static str) -> ValueResult<Hash> {
        let bytes = self.read_bytes(HASH_LEN, context)?;
        Hash::from_slice(bytes).map_err(|e| ValueError::Decode(e.to_string()))
    }

    /// Reads an unsigned varint (LEB128).
    pub fn read_varint(&mut self, context: &'static str) -> ValueResult<u64> {
        let mut result: u64 = 0;
        let mut shift = 0;
        for _ in 0..MAX_VARINT_BYTES {
            let byte = self.read_byte(context)?;
            let value = (byte & 0x7F) as u64;
            if shift == 63 && value > 1 {
                return Err(ValueError::Decode(format!("varint overflow in {context}")));
            }
            result |= value << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
        Err(ValueError::Decode(format!("varint too long in {context}")))
    }

    pub fn read_signed_varint(&mut self, context: &'static str) -> ValueResult<i64> {
        Ok(zigzag_decode(self.read_varint(context)?))
    }

    /// Reads a varint used as an element count, rejecting counts that could
    /// not possibly fit in the remaining input.
    pub fn read_count(&mut self, min_item_len: usize, context: &'static str) -> ValueResult<usize> {
        let count = self.read_varint(context)?;
        let max = (self.remaining_len() / min_item_len.max(1)) as u64;
        if count > max {
            return Err(ValueError::Decode(format!(
                "{context}: count {count} exceeds remaining input"
            )));
        }
        Ok(count as usize)
    }

    pub fn read_f64(&mut self, context: &'static str) -> ValueResult<f64> {
        let bytes = self.read_bytes(8, context)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(f64::from_bits(u64::from_be_bytes(arr)))
    }

    pub fn read_string(&mut self, context: &'static str) -> ValueResult<String> {
        let len = self.read_count(1, context)?;
        let bytes = self.read_bytes(len, context)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| ValueError::Decode(format!("invalid UTF-8 in {context}")))
    }
}

// =============================================================================
// ZIGZAG ENCODING
// =============================================================================

/// Maps negative numbers to odd positive numbers:
/// 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
#[inline]
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline]
pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}
