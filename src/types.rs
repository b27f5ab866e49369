use std::fmt;

use crate::error::{Error, Result};

/// Subtype for plain binary payloads.
pub const SUBTYPE_GENERAL: u8 = 0;
/// Reserved subtype marking an externally framed message blob embedded as
/// binary. The blob carries no redundant inner length.
pub const SUBTYPE_MESSAGE: u8 = 0x7F;

/// Value kind tag. Occupies bits 7-3 of the full-type byte, so tags 0-31 are
/// representable; only the ones below are assigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DsonType {
    EndOfObject,
    Int32,
    Int64,
    Float,
    Double,
    Boolean,
    String,
    Null,
    Binary,
    ExtInt32,
    ExtInt64,
    ExtString,
    Reference,
    Header,
    Array,
    Object,
}

impl DsonType {
    /// Construct a type from its numeric tag.
    pub fn from_u8(n: u8) -> Result<DsonType> {
        Ok(match n {
            0 => DsonType::EndOfObject,
            1 => DsonType::Int32,
            2 => DsonType::Int64,
            3 => DsonType::Float,
            4 => DsonType::Double,
            5 => DsonType::Boolean,
            6 => DsonType::String,
            7 => DsonType::Null,
            8 => DsonType::Binary,
            9 => DsonType::ExtInt32,
            10 => DsonType::ExtInt64,
            11 => DsonType::ExtString,
            12 => DsonType::Reference,
            13 => DsonType::Header,
            14 => DsonType::Array,
            15 => DsonType::Object,
            _ => return Err(Error::UnsupportedType(n)),
        })
    }

    /// The numeric tag for this type.
    pub fn into_u8(self) -> u8 {
        match self {
            DsonType::EndOfObject => 0,
            DsonType::Int32 => 1,
            DsonType::Int64 => 2,
            DsonType::Float => 3,
            DsonType::Double => 4,
            DsonType::Boolean => 5,
            DsonType::String => 6,
            DsonType::Null => 7,
            DsonType::Binary => 8,
            DsonType::ExtInt32 => 9,
            DsonType::ExtInt64 => 10,
            DsonType::ExtString => 11,
            DsonType::Reference => 12,
            DsonType::Header => 13,
            DsonType::Array => 14,
            DsonType::Object => 15,
        }
    }

    /// ARRAY and OBJECT are containers; HEADER is container-shaped but never
    /// itself contains a HEADER.
    pub fn is_container(self) -> bool {
        matches!(self, DsonType::Array | DsonType::Object | DsonType::Header)
    }

    /// Only the integer kinds carry a meaningful wire type; every other kind
    /// is written with wire bits 0 and ignores whatever bits arrive.
    pub fn has_wire_type(self) -> bool {
        matches!(
            self,
            DsonType::Int32 | DsonType::Int64 | DsonType::ExtInt32 | DsonType::ExtInt64
        )
    }
}

impl From<DsonType> for u8 {
    fn from(val: DsonType) -> u8 {
        val.into_u8()
    }
}

/// Integer wire encoding selector. Occupies bits 2-0 of the full-type byte.
/// Values 4-7 are representable but unassigned; they only fail when an
/// integer decode actually has to interpret them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WireType {
    /// Plain varint; negative values sign-extend to ten bytes.
    VarInt,
    /// Unsigned-optimized varint; the value is reinterpreted as unsigned.
    Uint,
    /// ZigZag varint; small magnitudes of either sign stay short.
    Sint,
    /// Fixed-width little-endian.
    Fixed,
}

impl WireType {
    pub fn from_u8(n: u8) -> Result<WireType> {
        Ok(match n {
            0 => WireType::VarInt,
            1 => WireType::Uint,
            2 => WireType::Sint,
            3 => WireType::Fixed,
            _ => return Err(Error::UnsupportedType(n)),
        })
    }

    pub fn into_u8(self) -> u8 {
        match self {
            WireType::VarInt => 0,
            WireType::Uint => 1,
            WireType::Sint => 2,
            WireType::Fixed => 3,
        }
    }
}

impl From<WireType> for u8 {
    fn from(val: WireType) -> u8 {
        val.into_u8()
    }
}

/// A reference value: a pointer to an object elsewhere, identified by an
/// optional namespace and a local id, with application-defined type and
/// policy words.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectRef {
    pub namespace: String,
    pub local_id: String,
    pub ref_type: u32,
    pub policy: u32,
}

impl ObjectRef {
    pub fn new(namespace: &str, local_id: &str, ref_type: u32, policy: u32) -> ObjectRef {
        ObjectRef {
            namespace: namespace.to_string(),
            local_id: local_id.to_string(),
            ref_type,
            policy,
        }
    }
}

/// A field key for one flavor of the wire format: a packed field number for
/// the binary flavor, an interned string for the document flavor.
pub trait FieldKey: Clone + fmt::Debug {
    /// Borrowed form accepted at the writer/reader call surface.
    type Ref<'a>: Copy + fmt::Debug;

    fn from_ref(r: Self::Ref<'_>) -> Self;
    fn eq_ref(&self, r: Self::Ref<'_>) -> bool;
}
