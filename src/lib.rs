//! A self-describing binary data-interchange format with symmetric streaming
//! writer and reader engines.
//!
//! A document is a sequence of typed entries. Each entry opens with a
//! *full-type byte* packing the value kind ([`DsonType`]) with a wire
//! selector ([`WireType`]) for integers; containers (OBJECT, ARRAY, and the
//! metadata-carrying HEADER) frame their payload with a fixed32 length and an
//! optional class id, and close with an END_OF_OBJECT byte. Writer and reader
//! walk the same state machine, so a stream produced by [`DsonWriter`] is
//! consumed call-for-call by [`DsonReader`].
//!
//! The format comes in two flavors that differ only in how field keys and
//! class ids are spelled:
//!
//! - **binary** ([`BinWriter`]/[`BinReader`]): keys are packed
//!   [`FieldNumber`]s and class ids are `(namespace, local id)` pairs. Most
//!   compact, and supports peeking a value's shape without consuming it.
//! - **document** ([`DocWriter`]/[`DocReader`]): keys and class ids are
//!   strings, for streams meant to outlive any one schema numbering.
//!
//! Value writes accept an optional key so `write_string(Some(name), ..)`
//! covers the common case in one call; passing `None` inside a name-keyed
//! container is a state violation unless the key was supplied separately via
//! `write_name`. Reads mirror this: passing the expected key verifies it
//! against the wire.
//!
//! # Example
//!
//! ```
//! use dson::{BinEncoder, BinReader, DsonType, DsonWriter, FieldNumber};
//!
//! # fn main() -> dson::Result<()> {
//! let name = FieldNumber::of(1)?;
//! let mut w = DsonWriter::new(BinEncoder::new());
//! w.write_start_object(None, None)?;
//! w.write_string(Some(name), "hello")?;
//! w.write_end_object()?;
//! let bytes = w.finish()?;
//!
//! let mut r = BinReader::from_slice(&bytes);
//! r.read_start_object()?;
//! assert_eq!(r.read_str(Some(name))?, "hello");
//! assert_eq!(r.read_dson_type()?, DsonType::EndOfObject);
//! r.read_end_object()?;
//! # Ok(()) }
//! ```

pub mod binary;
pub mod bits;
pub mod context;
pub mod document;
pub mod error;
pub mod input;
pub mod output;
pub mod reader;
pub mod types;
pub mod varint;
pub mod writer;

/// Containers deeper than this fail with [`Error::RecursionLimit`] unless a
/// different limit is configured.
pub const DEFAULT_RECURSION_LIMIT: usize = 32;

pub use binary::{BinDecoder, BinEncoder, BinReader, BinWriter, ValueSummary};
pub use bits::{BinClassId, FieldNumber, MAX_IDEP, MAX_LNUMBER, NAMESPACE_ABSENT};
pub use context::{ContextType, ReaderState, WriterState};
pub use document::{DocDecoder, DocEncoder, DocReader, DocWriter};
pub use error::{Error, Result};
pub use input::DsonInput;
pub use output::DsonOutput;
pub use reader::{Decoder, DsonReader};
pub use types::{
    DsonType, FieldKey, ObjectRef, WireType, SUBTYPE_GENERAL, SUBTYPE_MESSAGE,
};
pub use writer::{DsonWriter, Encoder};
