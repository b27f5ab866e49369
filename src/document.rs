//! The document flavor: string field names and string class ids.
//!
//! Keys and class ids are spelled as plain strings, with the empty string
//! standing for "no class id". Field names repeat heavily in real documents,
//! so the decoder interns short names behind `Rc<str>` and hands out shared
//! handles instead of fresh allocations.

use std::collections::HashSet;
use std::rc::Rc;

use crate::error::Result;
use crate::input::DsonInput;
use crate::output::DsonOutput;
use crate::reader::{Decoder, DsonReader};
use crate::types::FieldKey;
use crate::writer::{DsonWriter, Encoder};

/// Names at most this long are interned; longer ones are assumed to be
/// one-offs and allocated directly.
const MAX_INTERN_LEN: usize = 32;

/// Writer over the document flavor.
pub type DocWriter = DsonWriter<DocEncoder>;
/// Reader over the document flavor.
pub type DocReader<'de> = DsonReader<'de, DocDecoder<'de>>;

impl FieldKey for Rc<str> {
    type Ref<'a> = &'a str;

    fn from_ref(r: &str) -> Rc<str> {
        Rc::from(r)
    }

    fn eq_ref(&self, r: &str) -> bool {
        &**self == r
    }
}

#[derive(Debug, Default)]
pub struct DocEncoder {
    out: DsonOutput,
}

impl DocEncoder {
    pub fn new() -> DocEncoder {
        DocEncoder {
            out: DsonOutput::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> DocEncoder {
        DocEncoder {
            out: DsonOutput::with_capacity(capacity),
        }
    }
}

impl Encoder for DocEncoder {
    type Name = Rc<str>;
    type ClassId = str;

    fn out(&mut self) -> &mut DsonOutput {
        &mut self.out
    }

    fn position(&self) -> usize {
        self.out.position()
    }

    fn into_out(self) -> DsonOutput {
        self.out
    }

    fn emit_name(&mut self, name: &Rc<str>) -> Result<()> {
        self.out.write_string(name)
    }

    fn emit_class_id(&mut self, class_id: Option<&str>) -> Result<()> {
        self.out.write_string(class_id.unwrap_or(""))
    }
}

#[derive(Debug)]
pub struct DocDecoder<'de> {
    input: DsonInput<'de>,
    interned: HashSet<Rc<str>>,
}

impl<'de> DocDecoder<'de> {
    pub fn new(data: &'de [u8]) -> DocDecoder<'de> {
        DocDecoder {
            input: DsonInput::new(data),
            interned: HashSet::new(),
        }
    }

    fn intern(&mut self, s: &str) -> Rc<str> {
        if s.len() > MAX_INTERN_LEN {
            return Rc::from(s);
        }
        if let Some(existing) = self.interned.get(s) {
            return existing.clone();
        }
        let rc: Rc<str> = Rc::from(s);
        self.interned.insert(rc.clone());
        rc
    }
}

impl<'de> Decoder<'de> for DocDecoder<'de> {
    type Name = Rc<str>;
    type ClassId = String;

    fn input(&mut self) -> &mut DsonInput<'de> {
        &mut self.input
    }

    fn fetch_name(&mut self) -> Result<Rc<str>> {
        let s = self.input.read_str()?;
        Ok(self.intern(s))
    }

    fn skip_name(&mut self) -> Result<()> {
        let len = self.input.read_uint32()? as usize;
        self.input.skip(len)
    }

    fn fetch_class_id(&mut self) -> Result<Option<String>> {
        let s = self.input.read_str()?;
        if s.is_empty() {
            return Ok(None);
        }
        Ok(Some(s.to_string()))
    }
}

impl<'de> DsonReader<'de, DocDecoder<'de>> {
    pub fn from_slice(data: &'de [u8]) -> DocReader<'de> {
        DsonReader::new(DocDecoder::new(data))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;
    use crate::types::{DsonType, WireType};

    fn writer() -> DocWriter {
        DsonWriter::new(DocEncoder::new())
    }

    #[test]
    fn empty_object_bytes() {
        let mut w = writer();
        w.write_start_object(None, None).unwrap();
        w.write_end_object().unwrap();
        let bytes = w.finish().unwrap();
        // OBJECT full type, length 1, empty-string class id, END.
        assert_eq!(bytes, vec![0x78, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);

        let mut r = DocReader::from_slice(&bytes);
        assert!(r.read_start_object().unwrap().is_none());
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_object().unwrap();
    }

    #[test]
    fn round_trip_with_string_keys() {
        let mut w = writer();
        w.write_start_header(None).unwrap();
        w.write_int32(Some("version"), 2, WireType::VarInt).unwrap();
        w.write_end_header().unwrap();
        w.write_start_object(None, Some("com.example.Thing")).unwrap();
        w.write_string(Some("name"), "widget").unwrap();
        w.write_start_array(Some("tags"), None).unwrap();
        w.write_string(None, "a").unwrap();
        w.write_string(None, "b").unwrap();
        w.write_end_array().unwrap();
        w.write_int64(Some("count"), -3, WireType::Sint).unwrap();
        w.write_end_object().unwrap();
        let bytes = w.finish().unwrap();

        let mut r = DocReader::from_slice(&bytes);
        assert_eq!(r.read_dson_type().unwrap(), DsonType::Header);
        assert!(r.read_start_header().unwrap().is_none());
        assert_eq!(r.read_int32(Some("version")).unwrap(), 2);
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_header().unwrap();

        assert_eq!(
            r.read_start_object().unwrap().as_deref(),
            Some("com.example.Thing")
        );
        assert_eq!(r.read_string(Some("name")).unwrap(), "widget");
        assert_eq!(r.read_dson_type().unwrap(), DsonType::Array);
        assert_eq!(&*r.read_name().unwrap(), "tags");
        r.read_start_array().unwrap();
        assert_eq!(r.read_str(None).unwrap(), "a");
        assert_eq!(r.read_str(None).unwrap(), "b");
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_array().unwrap();
        assert_eq!(r.read_int64(Some("count")).unwrap(), -3);
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_object().unwrap();
        assert_eq!(r.position(), bytes.len());
    }

    #[test]
    fn short_names_are_interned() {
        let long_name = "x".repeat(MAX_INTERN_LEN + 1);
        let mut w = writer();
        w.write_start_array(None, None).unwrap();
        w.write_start_object(None, None).unwrap();
        w.write_null(Some("alpha")).unwrap();
        w.write_null(Some(long_name.as_str())).unwrap();
        w.write_end_object().unwrap();
        w.write_start_object(None, None).unwrap();
        w.write_null(Some("alpha")).unwrap();
        w.write_null(Some(long_name.as_str())).unwrap();
        w.write_end_object().unwrap();
        w.write_end_array().unwrap();
        let bytes = w.finish().unwrap();

        let mut r = DocReader::from_slice(&bytes);
        r.read_start_array().unwrap();
        let mut alphas = Vec::new();
        let mut longs = Vec::new();
        for _ in 0..2 {
            r.read_start_object().unwrap();
            r.read_dson_type().unwrap();
            alphas.push(r.read_name().unwrap());
            r.read_null(None).unwrap();
            r.read_dson_type().unwrap();
            longs.push(r.read_name().unwrap());
            r.read_null(None).unwrap();
            assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
            r.read_end_object().unwrap();
        }
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_array().unwrap();

        assert!(Rc::ptr_eq(&alphas[0], &alphas[1]));
        // Past the intern cutoff every read allocates fresh.
        assert_eq!(&*longs[0], long_name);
        assert!(!Rc::ptr_eq(&longs[0], &longs[1]));
    }

    #[test]
    fn name_mismatch_on_string_keys() {
        let bytes = {
            let mut w = writer();
            w.write_start_object(None, None).unwrap();
            w.write_bool(Some("flag"), true).unwrap();
            w.write_end_object().unwrap();
            w.finish().unwrap()
        };
        let mut r = DocReader::from_slice(&bytes);
        r.read_start_object().unwrap();
        assert!(matches!(
            r.read_bool(Some("other")),
            Err(Error::NameMismatch { .. })
        ));
    }

    #[test]
    fn skip_name_avoids_interning() {
        let bytes = {
            let mut w = writer();
            w.write_start_object(None, None).unwrap();
            w.write_int32(Some("skipped"), 9, WireType::VarInt).unwrap();
            w.write_end_object().unwrap();
            w.finish().unwrap()
        };
        let mut r = DocReader::from_slice(&bytes);
        r.read_start_object().unwrap();
        assert_eq!(r.read_dson_type().unwrap(), DsonType::Int32);
        r.skip_name().unwrap();
        assert!(r.current_name().is_none());
        assert_eq!(r.read_int32(None).unwrap(), 9);
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_object().unwrap();
    }
}
