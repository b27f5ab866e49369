//! The binary flavor: packed field numbers for keys and `(namespace,
//! lclass_id)` pairs for class ids.
//!
//! On the wire a key is the varint of [`FieldNumber::full_number`], and a
//! class id is one namespace byte followed by a fixed32 local id, with the
//! reserved byte 255 alone standing for "no class id". This flavor also
//! supports peeking a value's shape without consuming it, which the
//! string-keyed flavor does not.

use crate::bits::{BinClassId, FieldNumber, NAMESPACE_ABSENT};
use crate::context::ReaderState;
use crate::error::{Error, Result};
use crate::input::DsonInput;
use crate::output::DsonOutput;
use crate::reader::{Decoder, DsonReader};
use crate::types::{DsonType, WireType};
use crate::writer::{DsonWriter, Encoder};

/// Writer over the binary flavor.
pub type BinWriter = DsonWriter<BinEncoder>;
/// Reader over the binary flavor.
pub type BinReader<'de> = DsonReader<'de, BinDecoder<'de>>;

#[derive(Debug, Default)]
pub struct BinEncoder {
    out: DsonOutput,
}

impl BinEncoder {
    pub fn new() -> BinEncoder {
        BinEncoder {
            out: DsonOutput::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> BinEncoder {
        BinEncoder {
            out: DsonOutput::with_capacity(capacity),
        }
    }
}

impl Encoder for BinEncoder {
    type Name = FieldNumber;
    type ClassId = BinClassId;

    fn out(&mut self) -> &mut DsonOutput {
        &mut self.out
    }

    fn position(&self) -> usize {
        self.out.position()
    }

    fn into_out(self) -> DsonOutput {
        self.out
    }

    fn emit_name(&mut self, name: &FieldNumber) -> Result<()> {
        self.out.write_uint32(name.full_number());
        Ok(())
    }

    fn emit_class_id(&mut self, class_id: Option<&BinClassId>) -> Result<()> {
        match class_id {
            None => self.out.write_u8(NAMESPACE_ABSENT),
            Some(id) => {
                self.out.write_u8(id.namespace);
                self.out.write_fixed32(id.lclass_id);
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct BinDecoder<'de> {
    input: DsonInput<'de>,
}

impl<'de> BinDecoder<'de> {
    pub fn new(data: &'de [u8]) -> BinDecoder<'de> {
        BinDecoder {
            input: DsonInput::new(data),
        }
    }
}

impl<'de> Decoder<'de> for BinDecoder<'de> {
    type Name = FieldNumber;
    type ClassId = BinClassId;

    fn input(&mut self) -> &mut DsonInput<'de> {
        &mut self.input
    }

    fn fetch_name(&mut self) -> Result<FieldNumber> {
        FieldNumber::from_full(self.input.read_uint32()?)
    }

    fn skip_name(&mut self) -> Result<()> {
        self.input.skip_varint()?;
        Ok(())
    }

    fn fetch_class_id(&mut self) -> Result<Option<BinClassId>> {
        let namespace = self.input.read_u8()?;
        if namespace == NAMESPACE_ABSENT {
            return Ok(None);
        }
        let lclass_id = self.input.read_fixed32()?;
        Ok(Some(BinClassId::new(namespace, lclass_id)?))
    }
}

/// Shape of a value learned by [`BinReader::peek_value_summary`] without
/// consuming it.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueSummary {
    pub dson_type: DsonType,
    /// Payload length in bytes. For EXT_STRING this counts the string bytes
    /// only, excluding the subtype varint; for BINARY it is the declared
    /// fixed32 length, which counts the subtype byte. The two deliberately
    /// disagree about subtype accounting.
    pub length: u32,
    /// Extension or binary subtype, where the kind carries one.
    pub subtype: Option<u32>,
    /// Class id, for container kinds.
    pub class_id: Option<BinClassId>,
}

impl<'de> DsonReader<'de, BinDecoder<'de>> {
    pub fn from_slice(data: &'de [u8]) -> BinReader<'de> {
        DsonReader::new(BinDecoder::new(data))
    }

    /// Inspect the current entry's value without consuming it. Legal once
    /// the entry's type is known, whether or not its key has been read; the
    /// input position is restored afterwards.
    pub fn peek_value_summary(&mut self) -> Result<ValueSummary> {
        let state = match self.contexts.last() {
            Some(ctx) => ctx.state,
            None => {
                return Err(Error::StateViolation {
                    expected: "OPEN",
                    actual: "CLOSED",
                })
            }
        };
        if !matches!(state, ReaderState::Name | ReaderState::Value) {
            return Err(Error::StateViolation {
                expected: "NAME or VALUE",
                actual: state.name(),
            });
        }
        let ty = self.current_type;
        let wire_bits = self.current_wire;
        let input = self.dec.input();
        let mark = input.mark();
        if state == ReaderState::Name {
            if let Err(err) = input.skip_varint() {
                input.reset(mark);
                return Err(err);
            }
        }
        let res = summarize(input, ty, wire_bits);
        input.reset(mark);
        res
    }
}

fn summarize(input: &mut DsonInput<'_>, ty: DsonType, wire_bits: u8) -> Result<ValueSummary> {
    let mut subtype = None;
    let mut class_id = None;
    let length = match ty {
        DsonType::Null => 0,
        DsonType::Boolean => 1,
        DsonType::Float => 4,
        DsonType::Double => 8,
        DsonType::Int32 => int_len(input, 4, wire_bits)?,
        DsonType::Int64 => int_len(input, 8, wire_bits)?,
        DsonType::ExtInt32 => {
            subtype = Some(input.read_uint32()?);
            int_len(input, 4, wire_bits)?
        }
        DsonType::ExtInt64 => {
            subtype = Some(input.read_uint32()?);
            int_len(input, 8, wire_bits)?
        }
        DsonType::String => input.read_uint32()?,
        DsonType::ExtString => {
            subtype = Some(input.read_uint32()?);
            input.read_uint32()?
        }
        DsonType::Binary => {
            let len = input.read_fixed32()?;
            if len == 0 {
                return Err(Error::InvalidData("binary length must count the subtype byte"));
            }
            subtype = Some(input.read_u8()? as u32);
            len
        }
        DsonType::Reference => {
            let start = input.position();
            let len = input.read_uint32()? as usize;
            input.skip(len)?;
            let len = input.read_uint32()? as usize;
            input.skip(len)?;
            input.skip_varint()?;
            input.skip_varint()?;
            (input.position() - start) as u32
        }
        DsonType::Array | DsonType::Object | DsonType::Header => {
            let len = input.read_fixed32()?;
            let namespace = input.read_u8()?;
            if namespace != NAMESPACE_ABSENT {
                class_id = Some(BinClassId::new(namespace, input.read_fixed32()?)?);
            }
            len
        }
        DsonType::EndOfObject => return Err(Error::InvalidData("no value to peek")),
    };
    Ok(ValueSummary {
        dson_type: ty,
        length,
        subtype,
        class_id,
    })
}

fn int_len(input: &mut DsonInput<'_>, fixed: u32, wire_bits: u8) -> Result<u32> {
    Ok(match WireType::from_u8(wire_bits)? {
        WireType::VarInt | WireType::Uint | WireType::Sint => input.skip_varint()? as u32,
        WireType::Fixed => {
            input.skip(fixed as usize)?;
            fixed
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;
    use crate::types::{ObjectRef, SUBTYPE_GENERAL, SUBTYPE_MESSAGE};

    fn f(idep: u8, lnumber: u16) -> FieldNumber {
        FieldNumber::new(idep, lnumber).unwrap()
    }

    fn writer() -> BinWriter {
        DsonWriter::new(BinEncoder::new())
    }

    #[test]
    fn empty_object_bytes() {
        let mut w = writer();
        w.write_start_object(None, None).unwrap();
        w.write_end_object().unwrap();
        let bytes = w.finish().unwrap();
        // OBJECT full type, length 1 (the END byte), absent class id, END.
        assert_eq!(bytes, vec![0x78, 0x01, 0x00, 0x00, 0x00, 0xFF, 0x00]);

        let mut r = BinReader::from_slice(&bytes);
        assert!(r.read_start_object().unwrap().is_none());
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_object().unwrap();
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
    }

    #[test]
    fn class_id_spelling() {
        let id = BinClassId::new(3, 0x0102_0304).unwrap();
        let mut w = writer();
        w.write_start_object(None, Some(&id)).unwrap();
        w.write_end_object().unwrap();
        let bytes = w.finish().unwrap();
        assert_eq!(
            bytes,
            vec![0x78, 0x01, 0x00, 0x00, 0x00, 0x03, 0x04, 0x03, 0x02, 0x01, 0x00]
        );
        let mut r = BinReader::from_slice(&bytes);
        assert_eq!(r.read_start_object().unwrap(), Some(id));
    }

    #[test]
    fn name_spelling_packs_idep_low() {
        let mut w = writer();
        w.write_start_object(None, None).unwrap();
        w.write_null(Some(f(2, 3))).unwrap();
        w.write_end_object().unwrap();
        let bytes = w.finish().unwrap();
        // NULL full type 0x38, then varint of (3 << 3) | 2 = 26.
        assert_eq!(bytes[5], 0x38);
        assert_eq!(bytes[6], 26);
    }

    #[test]
    fn value_write_without_name_fails() {
        let mut w = writer();
        w.write_start_object(None, None).unwrap();
        let err = w.write_int32(None, 1, WireType::VarInt).unwrap_err();
        assert!(matches!(err, Error::StateViolation { .. }));
    }

    #[test]
    fn round_trip_all_kinds() {
        let class = BinClassId::new(3, 99).unwrap();
        let reference = ObjectRef::new("ns", "obj-1", 2, 5);

        let mut w = writer();
        w.write_start_header(Some(&BinClassId::new(1, 7).unwrap()))
            .unwrap();
        w.write_string(Some(f(0, 1)), "schema").unwrap();
        w.write_end_header().unwrap();
        w.write_start_object(None, Some(&class)).unwrap();
        w.write_int32(Some(f(0, 1)), -5, WireType::Sint).unwrap();
        w.write_int64(Some(f(0, 2)), 1 << 40, WireType::VarInt).unwrap();
        w.write_bool(Some(f(0, 3)), true).unwrap();
        w.write_null(Some(f(0, 4))).unwrap();
        w.write_double(Some(f(0, 5)), 2.5).unwrap();
        w.write_string(Some(f(0, 6)), "hi").unwrap();
        w.write_binary(Some(f(0, 7)), SUBTYPE_GENERAL, &[1, 2, 3]).unwrap();
        w.write_ext_int32(Some(f(1, 1)), 9, 1000, WireType::Fixed).unwrap();
        w.write_ext_string(Some(f(1, 2)), 4, "ext").unwrap();
        w.write_reference(Some(f(1, 3)), &reference).unwrap();
        w.write_start_array(Some(f(2, 1)), None).unwrap();
        w.write_float(None, 1.5).unwrap();
        w.write_float(None, -1.5).unwrap();
        w.write_end_array().unwrap();
        w.write_end_object().unwrap();
        let bytes = w.finish().unwrap();

        let mut r = BinReader::from_slice(&bytes);
        assert_eq!(r.read_dson_type().unwrap(), DsonType::Header);
        assert_eq!(
            r.read_start_header().unwrap(),
            Some(BinClassId::new(1, 7).unwrap())
        );
        assert_eq!(r.read_dson_type().unwrap(), DsonType::String);
        assert_eq!(r.read_name().unwrap(), f(0, 1));
        assert_eq!(r.read_str(None).unwrap(), "schema");
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_header().unwrap();

        assert_eq!(r.read_start_object().unwrap(), Some(class));
        assert_eq!(r.read_int32(Some(f(0, 1))).unwrap(), -5);
        assert_eq!(r.current_wire_type().unwrap(), WireType::Sint);
        assert_eq!(r.read_int64(Some(f(0, 2))).unwrap(), 1 << 40);
        assert!(r.read_bool(Some(f(0, 3))).unwrap());
        r.read_null(Some(f(0, 4))).unwrap();
        assert_eq!(r.read_double(Some(f(0, 5))).unwrap(), 2.5);
        assert_eq!(r.read_string(Some(f(0, 6))).unwrap(), "hi");
        assert_eq!(
            r.read_binary(Some(f(0, 7))).unwrap(),
            (SUBTYPE_GENERAL, vec![1, 2, 3])
        );
        assert_eq!(r.read_ext_int32(Some(f(1, 1))).unwrap(), (9, 1000));
        assert_eq!(
            r.read_ext_string(Some(f(1, 2))).unwrap(),
            (4, "ext".to_string())
        );
        assert_eq!(r.read_reference(Some(f(1, 3))).unwrap(), reference);

        assert_eq!(r.read_dson_type().unwrap(), DsonType::Array);
        assert_eq!(r.read_name().unwrap(), f(2, 1));
        assert!(r.read_start_array().unwrap().is_none());
        assert_eq!(r.read_float(None).unwrap(), 1.5);
        assert_eq!(r.read_float(None).unwrap(), -1.5);
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_array().unwrap();

        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_object().unwrap();
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        assert_eq!(r.position(), bytes.len());
    }

    fn sample_document() -> Vec<u8> {
        let mut w = writer();
        w.write_start_object(None, None).unwrap();
        w.write_int32(Some(f(0, 1)), 17, WireType::VarInt).unwrap();
        w.write_start_array(Some(f(0, 2)), None).unwrap();
        w.write_string(None, "abc").unwrap();
        w.write_binary(None, 7, &[9, 9]).unwrap();
        w.write_end_array().unwrap();
        w.write_ext_int64(Some(f(0, 3)), 2, -40, WireType::Sint).unwrap();
        w.write_end_object().unwrap();
        w.finish().unwrap()
    }

    #[test]
    fn skip_value_consumes_exactly_a_full_read() {
        let bytes = sample_document();

        // Skip the whole object as one value.
        let mut r = BinReader::from_slice(&bytes);
        assert_eq!(r.read_dson_type().unwrap(), DsonType::Object);
        r.skip_value().unwrap();
        assert_eq!(r.position(), bytes.len());
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);

        // Skip entry by entry; keys are skipped along with the values.
        let mut r = BinReader::from_slice(&bytes);
        r.read_start_object().unwrap();
        loop {
            if r.read_dson_type().unwrap() == DsonType::EndOfObject {
                break;
            }
            r.skip_value().unwrap();
        }
        r.read_end_object().unwrap();
        assert_eq!(r.position(), bytes.len());
    }

    #[test]
    fn skip_to_end_of_object_lands_on_end() {
        let bytes = sample_document();
        let mut r = BinReader::from_slice(&bytes);
        r.read_start_object().unwrap();
        assert_eq!(r.read_int32(Some(f(0, 1))).unwrap(), 17);
        r.skip_to_end_of_object().unwrap();
        r.read_end_object().unwrap();
        assert_eq!(r.position(), bytes.len());

        let mut r = BinReader::from_slice(&bytes);
        assert!(matches!(
            r.skip_to_end_of_object(),
            Err(Error::ContextMismatch { .. })
        ));
    }

    #[test]
    fn prestart_defers_the_descent() {
        let bytes = {
            let id = BinClassId::new(2, 11).unwrap();
            let mut w = writer();
            w.write_start_object(None, Some(&id)).unwrap();
            w.write_bool(Some(f(0, 1)), false).unwrap();
            w.write_end_object().unwrap();
            w.finish().unwrap()
        };
        let mut r = BinReader::from_slice(&bytes);
        let peeked = r.prestart_object().unwrap();
        assert_eq!(peeked, Some(BinClassId::new(2, 11).unwrap()));
        // Committing returns the same class id and enters the object.
        assert_eq!(r.read_start_object().unwrap(), peeked);
        assert!(!r.read_bool(Some(f(0, 1))).unwrap());
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_object().unwrap();
    }

    #[test]
    fn prestart_rejects_mismatched_commit() {
        let mut w = writer();
        w.write_start_array(None, None).unwrap();
        w.write_end_array().unwrap();
        let bytes = w.finish().unwrap();
        let mut r = BinReader::from_slice(&bytes);
        r.prestart_array().unwrap();
        assert!(matches!(
            r.read_start_object(),
            Err(Error::ContextMismatch { .. })
        ));
    }

    #[test]
    fn recursion_limit_applies_and_writer_stays_closable() {
        let mut w = DsonWriter::with_recursion_limit(BinEncoder::new(), 2);
        w.write_start_array(None, None).unwrap();
        w.write_start_array(None, None).unwrap();
        let err = w.write_start_array(None, None).unwrap_err();
        assert!(matches!(err, Error::RecursionLimit(2)));
        w.close();
        w.close();

        let bytes = {
            let mut w = writer();
            w.write_start_array(None, None).unwrap();
            w.write_start_array(None, None).unwrap();
            w.write_end_array().unwrap();
            w.write_end_array().unwrap();
            w.finish().unwrap()
        };
        let mut r = DsonReader::with_recursion_limit(BinDecoder::new(&bytes), 1);
        r.read_start_array().unwrap();
        assert!(matches!(
            r.read_start_array(),
            Err(Error::RecursionLimit(1))
        ));
        r.close();
        r.close();
        assert!(matches!(
            r.read_dson_type(),
            Err(Error::StateViolation { .. })
        ));
    }

    #[test]
    fn unbalanced_finish_fails() {
        let mut w = writer();
        w.write_start_object(None, None).unwrap();
        assert!(matches!(w.finish(), Err(Error::ContextMismatch { .. })));
    }

    #[test]
    fn end_must_match_context_kind() {
        let mut w = writer();
        w.write_start_object(None, None).unwrap();
        assert!(matches!(
            w.write_end_array(),
            Err(Error::ContextMismatch { .. })
        ));
    }

    #[test]
    fn header_never_nests_in_header() {
        let mut w = writer();
        w.write_start_header(None).unwrap();
        assert!(matches!(
            w.write_start_header(None),
            Err(Error::ContextMismatch { .. })
        ));
    }

    #[test]
    fn header_inside_object_is_anonymous() {
        let mut w = writer();
        w.write_start_object(None, None).unwrap();
        // No key, straight from the NAME slot.
        w.write_start_header(None).unwrap();
        w.write_int32(Some(f(0, 1)), 1, WireType::VarInt).unwrap();
        w.write_end_header().unwrap();
        w.write_string(Some(f(0, 2)), "x").unwrap();
        w.write_end_object().unwrap();
        let bytes = w.finish().unwrap();

        let mut r = BinReader::from_slice(&bytes);
        r.read_start_object().unwrap();
        assert_eq!(r.read_dson_type().unwrap(), DsonType::Header);
        r.read_start_header().unwrap();
        assert_eq!(r.read_int32(Some(f(0, 1))).unwrap(), 1);
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_header().unwrap();
        assert_eq!(r.read_string(Some(f(0, 2))).unwrap(), "x");
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_object().unwrap();
    }

    #[test]
    fn name_mismatch_reports_both_sides() {
        let bytes = {
            let mut w = writer();
            w.write_start_object(None, None).unwrap();
            w.write_int32(Some(f(0, 1)), 3, WireType::VarInt).unwrap();
            w.write_end_object().unwrap();
            w.finish().unwrap()
        };
        let mut r = BinReader::from_slice(&bytes);
        r.read_start_object().unwrap();
        assert!(matches!(
            r.read_int32(Some(f(0, 2))),
            Err(Error::NameMismatch { .. })
        ));
    }

    #[test]
    fn type_mismatch_is_detected() {
        let bytes = {
            let mut w = writer();
            w.write_string(None, "oops").unwrap();
            w.finish().unwrap()
        };
        let mut r = BinReader::from_slice(&bytes);
        let err = r.read_int32(None).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: DsonType::Int32,
                actual: DsonType::String,
            }
        ));
    }

    #[test]
    fn message_subtype_is_checked() {
        let mut w = writer();
        w.write_message(None, &[0xAB, 0xCD]).unwrap();
        w.write_binary(None, SUBTYPE_GENERAL, &[1]).unwrap();
        let bytes = w.finish().unwrap();

        let mut r = BinReader::from_slice(&bytes);
        assert_eq!(r.read_message(None).unwrap(), vec![0xAB, 0xCD]);
        assert!(matches!(
            r.read_message(None),
            Err(Error::UnsupportedSubtype(s)) if s == SUBTYPE_GENERAL as u32
        ));
    }

    #[test]
    fn boolean_bytes_are_strict() {
        // BOOLEAN full type is 5 << 3, followed by an out-of-range byte.
        let bytes = [0x28u8, 0x02];
        let mut r = BinReader::from_slice(&bytes);
        assert!(matches!(r.read_bool(None), Err(Error::InvalidData(_))));
    }

    #[test]
    fn declared_length_longer_than_content_is_trailing() {
        // Object claiming two payload bytes: the END byte plus one stray.
        let bytes = [0x78u8, 0x02, 0x00, 0x00, 0x00, 0xFF, 0x00, 0x00];
        let mut r = BinReader::from_slice(&bytes);
        r.read_start_object().unwrap();
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        assert!(matches!(r.read_end_object(), Err(Error::TrailingBytes(1))));
    }

    #[test]
    fn declared_length_past_input_is_truncation() {
        // Object claiming five payload bytes with only the END byte present.
        let bytes = [0x78u8, 0x05, 0x00, 0x00, 0x00, 0xFF, 0x00];
        let mut r = BinReader::from_slice(&bytes);
        assert!(matches!(r.read_start_object(), Err(Error::EndOfInput)));
    }

    #[test]
    fn peek_reports_shape_without_consuming() {
        let mut w = writer();
        w.write_start_object(None, None).unwrap();
        w.write_ext_string(Some(f(0, 1)), 1, "abcd").unwrap();
        w.write_binary(Some(f(0, 2)), 2, &[1, 2, 3]).unwrap();
        w.write_start_array(Some(f(0, 3)), Some(&BinClassId::new(4, 4).unwrap()))
            .unwrap();
        w.write_end_array().unwrap();
        w.write_end_object().unwrap();
        let bytes = w.finish().unwrap();

        let mut r = BinReader::from_slice(&bytes);
        r.read_start_object().unwrap();

        // Peek in NAME state steps over the unread key internally.
        assert_eq!(r.read_dson_type().unwrap(), DsonType::ExtString);
        let summary = r.peek_value_summary().unwrap();
        // Excludes the subtype varint.
        assert_eq!(summary.length, 4);
        assert_eq!(summary.subtype, Some(1));
        assert_eq!(r.read_ext_string(Some(f(0, 1))).unwrap(), (1, "abcd".to_string()));

        assert_eq!(r.read_dson_type().unwrap(), DsonType::Binary);
        assert_eq!(r.read_name().unwrap(), f(0, 2));
        let summary = r.peek_value_summary().unwrap();
        // The declared length counts the subtype byte.
        assert_eq!(summary.length, 4);
        assert_eq!(summary.subtype, Some(2));
        assert_eq!(r.read_binary(None).unwrap(), (2, vec![1, 2, 3]));

        assert_eq!(r.read_dson_type().unwrap(), DsonType::Array);
        let summary = r.peek_value_summary().unwrap();
        assert_eq!(summary.dson_type, DsonType::Array);
        assert_eq!(summary.class_id, Some(BinClassId::new(4, 4).unwrap()));
        assert_eq!(summary.length, 1);
        r.read_start_array().unwrap();
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_array().unwrap();

        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_object().unwrap();
    }

    #[test]
    fn peek_int_lengths_follow_the_wire_type() {
        let mut w = writer();
        w.write_int32(None, -1, WireType::VarInt).unwrap();
        w.write_int32(None, -1, WireType::Fixed).unwrap();
        w.write_int64(None, 1, WireType::Fixed).unwrap();
        let bytes = w.finish().unwrap();

        let mut r = BinReader::from_slice(&bytes);
        r.read_dson_type().unwrap();
        assert_eq!(r.peek_value_summary().unwrap().length, 10);
        r.skip_value().unwrap();
        r.read_dson_type().unwrap();
        assert_eq!(r.peek_value_summary().unwrap().length, 4);
        r.skip_value().unwrap();
        r.read_dson_type().unwrap();
        assert_eq!(r.peek_value_summary().unwrap().length, 8);
    }

    #[test]
    fn random_ints_round_trip_under_every_wire_type() {
        use rand::{Rng, SeedableRng};

        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED);
        let wires = [
            WireType::VarInt,
            WireType::Uint,
            WireType::Sint,
            WireType::Fixed,
        ];

        let mut values = Vec::new();
        let mut w = writer();
        w.write_start_array(None, None).unwrap();
        for _ in 0..256 {
            let wire = wires[rng.gen_range(0..wires.len())];
            if rng.gen() {
                let v: i32 = rng.gen();
                w.write_int32(None, v, wire).unwrap();
                values.push((v as i64, true));
            } else {
                let v: i64 = rng.gen();
                w.write_int64(None, v, wire).unwrap();
                values.push((v, false));
            }
        }
        w.write_end_array().unwrap();
        let bytes = w.finish().unwrap();

        let mut r = BinReader::from_slice(&bytes);
        r.read_start_array().unwrap();
        for (v, narrow) in values {
            if narrow {
                assert_eq!(r.read_int32(None).unwrap() as i64, v);
            } else {
                assert_eq!(r.read_int64(None).unwrap(), v);
            }
        }
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_array().unwrap();
    }

    #[test]
    fn unknown_wire_bits_fail_only_when_interpreted() {
        // INT32 with wire bits 5: the full-type byte itself still reads, and
        // the failure comes only when the bits must be interpreted.
        let bytes = [(1u8 << 3) | 5, 0x01];
        let mut r = BinReader::from_slice(&bytes);
        assert_eq!(r.read_dson_type().unwrap(), DsonType::Int32);
        assert!(r.current_wire_type().is_err());
        assert!(matches!(r.read_int32(None), Err(Error::UnsupportedType(5))));
    }
}
