//! Position-tracked byte sink for the writer engines.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::types::WireType;
use crate::varint;

/// An append-only byte buffer that also supports patching a fixed32 that was
/// already written, which is how container lengths get filled in after the
/// fact. All fixed-width encodings are little-endian.
#[derive(Clone, Debug, Default)]
pub struct DsonOutput {
    buf: Vec<u8>,
}

impl DsonOutput {
    pub fn new() -> DsonOutput {
        DsonOutput { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> DsonOutput {
        DsonOutput {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_fixed32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_fixed64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_float(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_double(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_uint32(&mut self, v: u32) {
        varint::write_u32(&mut self.buf, v);
    }

    pub fn write_uint64(&mut self, v: u64) {
        varint::write_u64(&mut self.buf, v);
    }

    /// Encode an i32 under the requested wire type.
    pub fn write_int32(&mut self, v: i32, wire: WireType) {
        match wire {
            // Sign-extends, matching the 64-bit decode path.
            WireType::VarInt => varint::write_u64(&mut self.buf, v as i64 as u64),
            WireType::Uint => varint::write_u64(&mut self.buf, v as u32 as u64),
            WireType::Sint => varint::write_u64(&mut self.buf, varint::zigzag32(v) as u64),
            WireType::Fixed => self.write_fixed32(v as u32),
        }
    }

    /// Encode an i64 under the requested wire type.
    pub fn write_int64(&mut self, v: i64, wire: WireType) {
        match wire {
            WireType::VarInt | WireType::Uint => varint::write_u64(&mut self.buf, v as u64),
            WireType::Sint => varint::write_u64(&mut self.buf, varint::zigzag64(v)),
            WireType::Fixed => self.write_fixed64(v as u64),
        }
    }

    /// `uint32 length + utf8 bytes`.
    pub fn write_string(&mut self, s: &str) -> Result<()> {
        if s.len() > u32::MAX as usize {
            return Err(Error::OutOfRange("string longer than u32::MAX bytes"));
        }
        self.write_uint32(s.len() as u32);
        self.write_raw(s.as_bytes());
        Ok(())
    }

    /// Overwrite a fixed32 previously written at `pos`.
    ///
    /// Only ever called with an offset the engine recorded itself, so a bad
    /// offset is a bug and panics via the slice index.
    pub fn patch_fixed32(&mut self, pos: usize, v: u32) {
        LittleEndian::write_u32(&mut self.buf[pos..pos + 4], v);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}
