//! Bit-packing for the one-byte full type, the packed field number, and the
//! 64-bit class guid. All pure and stateless.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::types::FieldKey;

/// Highest legal inheritance depth.
pub const MAX_IDEP: u8 = 7;
/// Highest legal field ordinal within a declaring class.
pub const MAX_LNUMBER: u16 = 8191;
/// Namespace byte reserved to mean "no class id".
pub const NAMESPACE_ABSENT: u8 = 255;

/// Pack a type tag and wire bits into the full-type byte: bits 7-3 carry the
/// type, bits 2-0 the wire selector.
pub fn make_full_type(dson_type: u8, wire: u8) -> u8 {
    (dson_type << 3) | (wire & 0x07)
}

/// Split a full-type byte into `(type tag, wire bits)`.
pub fn split_full_type(full: u8) -> (u8, u8) {
    (full >> 3, full & 0x07)
}

/// Pack `(idep, lnumber)` into a full number. `idep` occupies the low bits.
pub fn make_full_number(idep: u8, lnumber: u16) -> u32 {
    ((lnumber as u32) << 3) | (idep as u32)
}

/// Split a full number into `(idep, lnumber)`.
pub fn split_full_number(full: u32) -> (u8, u16) {
    ((full & 0x07) as u8, (full >> 3) as u16)
}

/// Compare two packed full numbers by declared ordering: idep first, then
/// lnumber. Because idep sits in the low bits, comparing the packed integers
/// directly would get this wrong.
pub fn compare_full_number(a: u32, b: u32) -> Ordering {
    let (a_idep, a_lnumber) = split_full_number(a);
    let (b_idep, b_lnumber) = split_full_number(b);
    a_idep.cmp(&b_idep).then(a_lnumber.cmp(&b_lnumber))
}

/// Pack a namespace and local class id into the 64-bit class guid.
pub fn make_class_guid(namespace: u8, lclass_id: u32) -> u64 {
    ((namespace as u64) << 32) | (lclass_id as u64)
}

/// Split a class guid into `(namespace, lclass_id)`.
pub fn split_class_guid(guid: u64) -> (u8, u32) {
    ((guid >> 32) as u8, guid as u32)
}

/// A field identity for the binary flavor: the inheritance depth of the
/// declaring class plus the field's ordinal within it.
///
/// Ordering is lexicographic on `(idep, lnumber)`, which is *not* the numeric
/// order of [`full_number`](FieldNumber::full_number).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldNumber {
    idep: u8,
    lnumber: u16,
}

impl FieldNumber {
    pub const ZERO: FieldNumber = FieldNumber { idep: 0, lnumber: 0 };

    pub fn new(idep: u8, lnumber: u16) -> Result<FieldNumber> {
        if idep > MAX_IDEP {
            return Err(Error::OutOfRange("idep must be in [0, 7]"));
        }
        if lnumber > MAX_LNUMBER {
            return Err(Error::OutOfRange("lnumber must be in [0, 8191]"));
        }
        Ok(FieldNumber { idep, lnumber })
    }

    /// A field declared by the root class, identified by ordinal alone.
    pub fn of(lnumber: u16) -> Result<FieldNumber> {
        FieldNumber::new(0, lnumber)
    }

    /// Decode a packed full number, range-checking both components.
    pub fn from_full(full: u32) -> Result<FieldNumber> {
        if (full >> 3) > MAX_LNUMBER as u32 {
            return Err(Error::OutOfRange("lnumber must be in [0, 8191]"));
        }
        let (idep, lnumber) = split_full_number(full);
        FieldNumber::new(idep, lnumber)
    }

    pub fn full_number(self) -> u32 {
        make_full_number(self.idep, self.lnumber)
    }

    pub fn idep(self) -> u8 {
        self.idep
    }

    pub fn lnumber(self) -> u16 {
        self.lnumber
    }
}

impl Ord for FieldNumber {
    fn cmp(&self, other: &FieldNumber) -> Ordering {
        self.idep
            .cmp(&other.idep)
            .then(self.lnumber.cmp(&other.lnumber))
    }
}

impl PartialOrd for FieldNumber {
    fn partial_cmp(&self, other: &FieldNumber) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FieldKey for FieldNumber {
    type Ref<'a> = FieldNumber;

    fn from_ref(r: FieldNumber) -> FieldNumber {
        r
    }

    fn eq_ref(&self, r: FieldNumber) -> bool {
        *self == r
    }
}

/// Class identity for the binary flavor. The namespace byte 255 is reserved
/// as the on-wire "absent" sentinel, so it can never appear here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BinClassId {
    pub namespace: u8,
    pub lclass_id: u32,
}

impl BinClassId {
    pub fn new(namespace: u8, lclass_id: u32) -> Result<BinClassId> {
        if namespace == NAMESPACE_ABSENT {
            return Err(Error::OutOfRange("namespace must be in [0, 254]"));
        }
        Ok(BinClassId {
            namespace,
            lclass_id,
        })
    }

    pub fn to_guid(self) -> u64 {
        make_class_guid(self.namespace, self.lclass_id)
    }

    pub fn from_guid(guid: u64) -> Result<BinClassId> {
        let (namespace, lclass_id) = split_class_guid(guid);
        BinClassId::new(namespace, lclass_id)
    }
}
