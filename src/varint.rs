//! LEB128 variable-length integers and ZigZag mapping.
//!
//! Each byte carries seven value bits; the high bit marks continuation. A u64
//! never takes more than ten bytes. Reading lives on [`DsonInput`], which
//! enforces the byte-limit stack; this module holds the write side and the
//! pure sign mappings.
//!
//! [`DsonInput`]: crate::input::DsonInput

/// Longest legal varint (a u64 with all bits set).
pub const MAX_VARINT_LEN: usize = 10;

pub fn write_u64(buf: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        buf.push((v as u8) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

pub fn write_u32(buf: &mut Vec<u8>, v: u32) {
    write_u64(buf, v as u64);
}

pub fn zigzag32(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

pub fn unzigzag32(v: u32) -> i32 {
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

pub fn zigzag64(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

pub fn unzigzag64(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

/// Encoded size of a u64 varint, in bytes.
pub fn size_u64(v: u64) -> usize {
    let data_bits = 64 - (v | 1).leading_zeros() as usize;
    data_bits.div_ceil(7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::DsonInput;

    #[test]
    fn encode_decode_u64() {
        let cases = [
            0u64,
            1,
            127,
            128,
            0x3FFF,
            0x4000,
            0xFFFF_FFFF,
            0x1_0000_0000,
            u64::MAX,
        ];
        for v in cases {
            let mut buf = Vec::new();
            write_u64(&mut buf, v);
            assert_eq!(buf.len(), size_u64(v));
            let mut input = DsonInput::new(&buf);
            assert_eq!(input.read_uint64().unwrap(), v);
            assert!(input.at_end());
        }
    }

    #[test]
    fn zigzag_round_trip() {
        for v in [0i32, 1, -1, 2, -2, i32::MIN, i32::MAX] {
            assert_eq!(unzigzag32(zigzag32(v)), v);
        }
        for v in [0i64, 1, -1, 63, -64, i64::MIN, i64::MAX] {
            assert_eq!(unzigzag64(zigzag64(v)), v);
        }
        // Small magnitudes of either sign stay small.
        assert!(zigzag32(-1) == 1);
        assert!(zigzag32(1) == 2);
    }
}
