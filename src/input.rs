//! Byte source for the reader engines, with the push/pop byte-limit stack
//! that enforces container framing.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::types::WireType;
use crate::varint;

/// A cursor over an input slice. A *limit* bounds how far reads may advance;
/// entering a container pushes a tighter limit covering exactly its declared
/// payload, and leaving restores the old one. Reads past the current limit
/// fail with [`Error::EndOfInput`] even when more bytes exist beyond it.
#[derive(Clone, Debug)]
pub struct DsonInput<'de> {
    data: &'de [u8],
    pos: usize,
    limit: usize,
}

impl<'de> DsonInput<'de> {
    pub fn new(data: &'de [u8]) -> DsonInput<'de> {
        DsonInput {
            data,
            pos: 0,
            limit: data.len(),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left before the current limit.
    pub fn remaining(&self) -> usize {
        self.limit - self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos == self.limit
    }

    /// Bound reads to the next `len` bytes, returning the old limit so it can
    /// be restored by [`pop_limit`](DsonInput::pop_limit). Fails if the
    /// region would run past the bytes actually present.
    pub fn push_limit(&mut self, len: usize) -> Result<usize> {
        let new_limit = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.limit)
            .ok_or(Error::EndOfInput)?;
        let old = self.limit;
        self.limit = new_limit;
        Ok(old)
    }

    /// Restore a limit returned by [`push_limit`](DsonInput::push_limit).
    pub fn pop_limit(&mut self, old: usize) {
        debug_assert!(old >= self.limit && old <= self.data.len());
        self.limit = old;
    }

    /// Remember the current position for a later [`reset`](DsonInput::reset).
    pub fn mark(&self) -> usize {
        self.pos
    }

    /// Rewind to a previously marked position within the current limit.
    pub fn reset(&mut self, mark: usize) {
        debug_assert!(mark <= self.pos);
        self.pos = mark;
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        if self.at_end() {
            return Err(Error::EndOfInput);
        }
        let b = self.data[self.pos];
        self.pos += 1;
        Ok(b)
    }

    pub fn read_raw(&mut self, len: usize) -> Result<&'de [u8]> {
        if self.remaining() < len {
            return Err(Error::EndOfInput);
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_fixed32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_raw(4)?))
    }

    pub fn read_fixed64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_raw(8)?))
    }

    pub fn read_float(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.read_raw(4)?))
    }

    pub fn read_double(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.read_raw(8)?))
    }

    pub fn read_uint64(&mut self) -> Result<u64> {
        let mut result = 0u64;
        let mut shift = 0usize;
        loop {
            let byte = self.read_u8()?;
            if shift == 63 && byte > 1 {
                return Err(Error::InvalidVarint);
            }
            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift > 63 {
                return Err(Error::InvalidVarint);
            }
        }
    }

    pub fn read_uint32(&mut self) -> Result<u32> {
        let v = self.read_uint64()?;
        if v > u32::MAX as u64 {
            return Err(Error::InvalidVarint);
        }
        Ok(v as u32)
    }

    /// Decode an i32 under the given wire type. The plain and unsigned varint
    /// forms both truncate the 64-bit decode, which inverts the matching
    /// encodes exactly.
    pub fn read_int32(&mut self, wire: WireType) -> Result<i32> {
        Ok(match wire {
            WireType::VarInt | WireType::Uint => self.read_uint64()? as i32,
            WireType::Sint => varint::unzigzag32(self.read_uint32()?),
            WireType::Fixed => self.read_fixed32()? as i32,
        })
    }

    pub fn read_int64(&mut self, wire: WireType) -> Result<i64> {
        Ok(match wire {
            WireType::VarInt | WireType::Uint => self.read_uint64()? as i64,
            WireType::Sint => varint::unzigzag64(self.read_uint64()?),
            WireType::Fixed => self.read_fixed64()? as i64,
        })
    }

    /// `uint32 length + utf8 bytes`, borrowed from the input.
    pub fn read_str(&mut self) -> Result<&'de str> {
        let len = self.read_uint32()? as usize;
        let bytes = self.read_raw(len)?;
        std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        if self.remaining() < len {
            return Err(Error::EndOfInput);
        }
        self.pos += len;
        Ok(())
    }

    /// Skip one varint without decoding it; returns how many bytes it took.
    pub fn skip_varint(&mut self) -> Result<usize> {
        for count in 1..=varint::MAX_VARINT_LEN {
            if self.read_u8()? & 0x80 == 0 {
                return Ok(count);
            }
        }
        Err(Error::InvalidVarint)
    }
}
