use thiserror::Error;

use crate::context::ContextType;
use crate::types::DsonType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every way a read/write session can fail.
///
/// The wire format is a deterministic synchronous protocol, so any of these is
/// fatal to the current session: it signals either a caller bug (the state
/// machine was driven in an illegal order) or corrupted data. There is no
/// partial recovery; closing the writer/reader afterward remains safe.
#[derive(Error, Debug)]
pub enum Error {
    /// An operation was invoked while the engine was in a state that does not
    /// permit it, e.g. a value write while a field name was expected.
    #[error("state violation: expected {expected}, was {actual}")]
    StateViolation {
        expected: &'static str,
        actual: &'static str,
    },
    /// A container-closing call did not match the kind of container currently
    /// open, or a container operation was attempted at an illegal nesting.
    #[error("context mismatch: expected {expected:?}, was {actual:?}")]
    ContextMismatch {
        expected: ContextType,
        actual: ContextType,
    },
    /// The value on the wire is not of the type the caller asked for.
    #[error("type mismatch: expected {expected:?}, was {actual:?}")]
    TypeMismatch {
        expected: DsonType,
        actual: DsonType,
    },
    /// The field key on the wire disagrees with the key the caller expected.
    #[error("name mismatch: expected {expected}, was {actual}")]
    NameMismatch { expected: String, actual: String },
    /// Descending into another container would exceed the configured depth.
    #[error("recursion limit of {0} exceeded")]
    RecursionLimit(usize),
    /// A container's declared length was not fully consumed before closing.
    #[error("container has {0} trailing bytes")]
    TrailingBytes(usize),
    /// A binary/extension subtype other than the one required was found.
    #[error("unsupported subtype {0}")]
    UnsupportedSubtype(u32),
    /// A type or wire-type tag outside the closed set was found.
    #[error("unsupported type tag {0}")]
    UnsupportedType(u8),
    /// The input ended before the declared data did.
    #[error("unexpected end of input")]
    EndOfInput,
    /// A varint ran past the width of its target integer.
    #[error("varint wider than the target integer")]
    InvalidVarint,
    /// String bytes were not valid UTF-8.
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    /// A field component or length was outside its legal range.
    #[error("value out of range: {0}")]
    OutOfRange(&'static str),
    /// The bytes on the wire are structurally impossible.
    #[error("invalid data: {0}")]
    InvalidData(&'static str),
}
