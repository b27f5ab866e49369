//! The reader protocol engine, mirroring [`crate::writer`].
//!
//! [`DsonReader`] drives the TYPE → NAME → VALUE cycle against an input
//! stream: `read_dson_type` consumes a full-type byte (synthesizing
//! END_OF_OBJECT when the current region is exhausted), the key of a named
//! entry is consumed by `read_name`/`skip_name`, and each value read checks
//! the tag it finds against the tag the caller asked for. Containers push a
//! byte limit covering exactly their declared payload, and closing one
//! verifies the limit was consumed to the byte.

use std::fmt;
use std::marker::PhantomData;

use crate::bits::split_full_type;
use crate::context::{ContextType, ReaderState};
use crate::error::{Error, Result};
use crate::input::DsonInput;
use crate::types::{DsonType, FieldKey, ObjectRef, WireType, SUBTYPE_MESSAGE};
use crate::DEFAULT_RECURSION_LIMIT;

/// Borrowed field-key form accepted by [`DsonReader`] methods.
pub type NameRef<'a, 'de, D> = <<D as Decoder<'de>>::Name as FieldKey>::Ref<'a>;

/// Flavor hooks for the reader engine: key and class-id spelling plus access
/// to the underlying byte source.
pub trait Decoder<'de> {
    type Name: FieldKey;
    type ClassId: Clone + fmt::Debug;

    fn input(&mut self) -> &mut DsonInput<'de>;

    /// Decode a field key.
    fn fetch_name(&mut self) -> Result<Self::Name>;

    /// Step over a field key without materializing it.
    fn skip_name(&mut self) -> Result<()>;

    /// Decode a class id; the flavor's "absent" spelling becomes `None`.
    fn fetch_class_id(&mut self) -> Result<Option<Self::ClassId>>;
}

#[derive(Debug)]
pub(crate) struct ReaderContext<K, C> {
    pub(crate) ctype: ContextType,
    pub(crate) state: ReaderState,
    /// Class id seen when this container was (pre)started.
    class_id: Option<C>,
    /// Token restoring the enclosing byte limit.
    limit_token: usize,
    /// The enclosing scope's current entry, restored when this container
    /// closes so the parent's cursor is unchanged by the descent.
    outer_type: DsonType,
    outer_wire: u8,
    outer_name: Option<K>,
}

/// Streaming reader over any [`Decoder`] flavor.
pub struct DsonReader<'de, D: Decoder<'de>> {
    pub(crate) dec: D,
    pub(crate) contexts: Vec<ReaderContext<D::Name, D::ClassId>>,
    recursion_limit: usize,
    pub(crate) current_type: DsonType,
    pub(crate) current_wire: u8,
    current_name: Option<D::Name>,
    closed: bool,
    _de: PhantomData<&'de [u8]>,
}

impl<'de, D: Decoder<'de>> DsonReader<'de, D> {
    pub fn new(dec: D) -> DsonReader<'de, D> {
        DsonReader::with_recursion_limit(dec, DEFAULT_RECURSION_LIMIT)
    }

    pub fn with_recursion_limit(dec: D, recursion_limit: usize) -> DsonReader<'de, D> {
        DsonReader {
            dec,
            contexts: vec![ReaderContext {
                ctype: ContextType::TopLevel,
                state: ReaderState::Initial,
                class_id: None,
                limit_token: 0,
                outer_type: DsonType::EndOfObject,
                outer_wire: 0,
                outer_name: None,
            }],
            recursion_limit,
            current_type: DsonType::EndOfObject,
            current_wire: 0,
            current_name: None,
            closed: false,
            _de: PhantomData,
        }
    }

    /// Number of containers currently entered.
    pub fn depth(&self) -> usize {
        self.contexts.len().saturating_sub(1)
    }

    /// Byte offset of the read cursor.
    pub fn position(&mut self) -> usize {
        self.dec.input().position()
    }

    pub fn context_type(&self) -> ContextType {
        self.contexts.last().map_or(ContextType::TopLevel, |c| c.ctype)
    }

    /// Tag of the entry most recently returned by
    /// [`read_dson_type`](DsonReader::read_dson_type).
    pub fn current_dson_type(&self) -> DsonType {
        self.current_type
    }

    /// Wire selector of the current entry. The three wire bits are carried
    /// permissively; this fails only if they name no known encoding.
    pub fn current_wire_type(&self) -> Result<WireType> {
        WireType::from_u8(self.current_wire)
    }

    /// Key of the current entry, if one has been read.
    pub fn current_name(&self) -> Option<&D::Name> {
        self.current_name.as_ref()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::StateViolation {
                expected: "OPEN",
                actual: "CLOSED",
            });
        }
        Ok(())
    }

    fn state(&self) -> ReaderState {
        self.contexts.last().unwrap().state
    }

    /// Read the next entry's full-type byte. At the end of the current
    /// region (or of the whole input at top level) END_OF_OBJECT is
    /// synthesized without consuming anything.
    pub fn read_dson_type(&mut self) -> Result<DsonType> {
        self.ensure_open()?;
        {
            let ctx = self.contexts.last().unwrap();
            let legal = match ctx.ctype {
                ContextType::TopLevel => matches!(
                    ctx.state,
                    ReaderState::Initial | ReaderState::Type | ReaderState::EndOfFile
                ),
                _ => ctx.state == ReaderState::Type,
            };
            if !legal {
                return Err(Error::StateViolation {
                    expected: "TYPE",
                    actual: ctx.state.name(),
                });
            }
        }
        let input = self.dec.input();
        let full = if input.at_end() { 0 } else { input.read_u8()? };
        let (tag, wire) = split_full_type(full);
        let ty = DsonType::from_u8(tag)?;
        self.current_type = ty;
        self.current_wire = wire;
        self.current_name = None;
        let ctx = self.contexts.last_mut().unwrap();
        ctx.state = if ty == DsonType::EndOfObject {
            match ctx.ctype {
                ContextType::TopLevel => ReaderState::EndOfFile,
                _ => ReaderState::WaitEndObject,
            }
        } else {
            match ctx.ctype {
                // Named scopes expect a key next, except for an anonymous
                // header entry, which goes straight to its value.
                ContextType::Object | ContextType::Header => {
                    if ty == DsonType::Header {
                        ReaderState::Value
                    } else {
                        ReaderState::Name
                    }
                }
                ContextType::TopLevel | ContextType::Array => ReaderState::Value,
            }
        };
        Ok(ty)
    }

    /// Consume and return the current entry's key.
    pub fn read_name(&mut self) -> Result<D::Name> {
        self.ensure_open()?;
        self.check_name_state()?;
        let name = self.dec.fetch_name()?;
        self.current_name = Some(name.clone());
        self.contexts.last_mut().unwrap().state = ReaderState::Value;
        Ok(name)
    }

    /// Step over the current entry's key without materializing it.
    pub fn skip_name(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.check_name_state()?;
        self.dec.skip_name()?;
        self.current_name = None;
        self.contexts.last_mut().unwrap().state = ReaderState::Value;
        Ok(())
    }

    fn check_name_state(&self) -> Result<()> {
        let state = self.state();
        if state != ReaderState::Name {
            return Err(Error::StateViolation {
                expected: "NAME",
                actual: state.name(),
            });
        }
        Ok(())
    }

    fn read_expected_name(&mut self, expected: NameRef<'_, 'de, D>) -> Result<()> {
        let actual = self.dec.fetch_name()?;
        if !actual.eq_ref(expected) {
            return Err(Error::NameMismatch {
                expected: format!("{:?}", expected),
                actual: format!("{:?}", actual),
            });
        }
        self.current_name = Some(actual);
        self.contexts.last_mut().unwrap().state = ReaderState::Value;
        Ok(())
    }

    fn advance_to_value(&mut self, name: Option<NameRef<'_, 'de, D>>) -> Result<()> {
        self.ensure_open()?;
        if matches!(self.state(), ReaderState::Initial | ReaderState::Type) {
            self.read_dson_type()?;
        }
        if self.state() == ReaderState::Name {
            match name {
                Some(expected) => self.read_expected_name(expected)?,
                None => {
                    self.read_name()?;
                }
            }
        }
        let state = self.state();
        if state != ReaderState::Value {
            return Err(Error::StateViolation {
                expected: "VALUE",
                actual: state.name(),
            });
        }
        Ok(())
    }

    fn pre_value(&mut self, name: Option<NameRef<'_, 'de, D>>, required: DsonType) -> Result<()> {
        self.advance_to_value(name)?;
        if self.current_type != required {
            return Err(Error::TypeMismatch {
                expected: required,
                actual: self.current_type,
            });
        }
        Ok(())
    }

    fn post_value(&mut self) {
        self.contexts.last_mut().unwrap().state = ReaderState::Type;
    }

    pub fn read_int32(&mut self, name: Option<NameRef<'_, 'de, D>>) -> Result<i32> {
        self.pre_value(name, DsonType::Int32)?;
        let wire = self.current_wire_type()?;
        let v = self.dec.input().read_int32(wire)?;
        self.post_value();
        Ok(v)
    }

    pub fn read_int64(&mut self, name: Option<NameRef<'_, 'de, D>>) -> Result<i64> {
        self.pre_value(name, DsonType::Int64)?;
        let wire = self.current_wire_type()?;
        let v = self.dec.input().read_int64(wire)?;
        self.post_value();
        Ok(v)
    }

    pub fn read_float(&mut self, name: Option<NameRef<'_, 'de, D>>) -> Result<f32> {
        self.pre_value(name, DsonType::Float)?;
        let v = self.dec.input().read_float()?;
        self.post_value();
        Ok(v)
    }

    pub fn read_double(&mut self, name: Option<NameRef<'_, 'de, D>>) -> Result<f64> {
        self.pre_value(name, DsonType::Double)?;
        let v = self.dec.input().read_double()?;
        self.post_value();
        Ok(v)
    }

    pub fn read_bool(&mut self, name: Option<NameRef<'_, 'de, D>>) -> Result<bool> {
        self.pre_value(name, DsonType::Boolean)?;
        let v = match self.dec.input().read_u8()? {
            0 => false,
            1 => true,
            _ => return Err(Error::InvalidData("boolean byte must be 0 or 1")),
        };
        self.post_value();
        Ok(v)
    }

    pub fn read_null(&mut self, name: Option<NameRef<'_, 'de, D>>) -> Result<()> {
        self.pre_value(name, DsonType::Null)?;
        self.post_value();
        Ok(())
    }

    /// Borrow the current string value straight out of the input.
    pub fn read_str(&mut self, name: Option<NameRef<'_, 'de, D>>) -> Result<&'de str> {
        self.pre_value(name, DsonType::String)?;
        let s = self.dec.input().read_str()?;
        self.post_value();
        Ok(s)
    }

    pub fn read_string(&mut self, name: Option<NameRef<'_, 'de, D>>) -> Result<String> {
        Ok(self.read_str(name)?.to_string())
    }

    /// Returns `(subtype, payload)`.
    pub fn read_binary(&mut self, name: Option<NameRef<'_, 'de, D>>) -> Result<(u8, Vec<u8>)> {
        self.pre_value(name, DsonType::Binary)?;
        let input = self.dec.input();
        let len = input.read_fixed32()? as usize;
        if len == 0 {
            return Err(Error::InvalidData("binary length must count the subtype byte"));
        }
        let subtype = input.read_u8()?;
        let data = input.read_raw(len - 1)?.to_vec();
        self.post_value();
        Ok((subtype, data))
    }

    /// Read an embedded message blob, checking the reserved subtype.
    pub fn read_message(&mut self, name: Option<NameRef<'_, 'de, D>>) -> Result<Vec<u8>> {
        let (subtype, data) = self.read_binary(name)?;
        if subtype != SUBTYPE_MESSAGE {
            return Err(Error::UnsupportedSubtype(subtype as u32));
        }
        Ok(data)
    }

    /// Returns `(subtype, value)`.
    pub fn read_ext_int32(&mut self, name: Option<NameRef<'_, 'de, D>>) -> Result<(u32, i32)> {
        self.pre_value(name, DsonType::ExtInt32)?;
        let wire = self.current_wire_type()?;
        let input = self.dec.input();
        let subtype = input.read_uint32()?;
        let v = input.read_int32(wire)?;
        self.post_value();
        Ok((subtype, v))
    }

    /// Returns `(subtype, value)`.
    pub fn read_ext_int64(&mut self, name: Option<NameRef<'_, 'de, D>>) -> Result<(u32, i64)> {
        self.pre_value(name, DsonType::ExtInt64)?;
        let wire = self.current_wire_type()?;
        let input = self.dec.input();
        let subtype = input.read_uint32()?;
        let v = input.read_int64(wire)?;
        self.post_value();
        Ok((subtype, v))
    }

    /// Returns `(subtype, value)`.
    pub fn read_ext_string(&mut self, name: Option<NameRef<'_, 'de, D>>) -> Result<(u32, String)> {
        self.pre_value(name, DsonType::ExtString)?;
        let input = self.dec.input();
        let subtype = input.read_uint32()?;
        let s = input.read_str()?.to_string();
        self.post_value();
        Ok((subtype, s))
    }

    pub fn read_reference(&mut self, name: Option<NameRef<'_, 'de, D>>) -> Result<ObjectRef> {
        self.pre_value(name, DsonType::Reference)?;
        let input = self.dec.input();
        let namespace = input.read_str()?.to_string();
        let local_id = input.read_str()?.to_string();
        let ref_type = input.read_uint32()?;
        let policy = input.read_uint32()?;
        self.post_value();
        Ok(ObjectRef {
            namespace,
            local_id,
            ref_type,
            policy,
        })
    }

    pub fn read_start_object(&mut self) -> Result<Option<D::ClassId>> {
        self.read_start(DsonType::Object, ContextType::Object, false)
    }

    pub fn read_start_array(&mut self) -> Result<Option<D::ClassId>> {
        self.read_start(DsonType::Array, ContextType::Array, false)
    }

    pub fn read_start_header(&mut self) -> Result<Option<D::ClassId>> {
        self.read_start(DsonType::Header, ContextType::Header, false)
    }

    /// Enter a container far enough to learn its class id, but leave it
    /// uncommitted: the matching `read_start_*` completes the descent.
    pub fn prestart_object(&mut self) -> Result<Option<D::ClassId>> {
        self.read_start(DsonType::Object, ContextType::Object, true)
    }

    pub fn prestart_array(&mut self) -> Result<Option<D::ClassId>> {
        self.read_start(DsonType::Array, ContextType::Array, true)
    }

    fn read_start(
        &mut self,
        ty: DsonType,
        ctype: ContextType,
        prestart: bool,
    ) -> Result<Option<D::ClassId>> {
        self.ensure_open()?;
        if self.state() == ReaderState::WaitStartObject {
            // Commit (or re-inspect) a pre-started container.
            let ctx = self.contexts.last_mut().unwrap();
            if ctx.ctype != ctype {
                return Err(Error::ContextMismatch {
                    expected: ctype,
                    actual: ctx.ctype,
                });
            }
            if !prestart {
                ctx.state = ReaderState::Type;
            }
            return Ok(ctx.class_id.clone());
        }
        if self.depth() >= self.recursion_limit {
            return Err(Error::RecursionLimit(self.recursion_limit));
        }
        if ctype == ContextType::Header
            && self.contexts.last().unwrap().ctype == ContextType::Header
        {
            return Err(Error::ContextMismatch {
                expected: ContextType::Object,
                actual: ContextType::Header,
            });
        }
        self.advance_to_value(None)?;
        if self.current_type != ty {
            return Err(Error::TypeMismatch {
                expected: ty,
                actual: self.current_type,
            });
        }
        let len = self.dec.input().read_fixed32()? as usize;
        let class_id = self.dec.fetch_class_id()?;
        let limit_token = self.dec.input().push_limit(len)?;
        let outer_name = self.current_name.take();
        self.contexts.push(ReaderContext {
            ctype,
            state: if prestart {
                ReaderState::WaitStartObject
            } else {
                ReaderState::Type
            },
            class_id: class_id.clone(),
            limit_token,
            outer_type: self.current_type,
            outer_wire: self.current_wire,
            outer_name,
        });
        Ok(class_id)
    }

    pub fn read_end_object(&mut self) -> Result<()> {
        self.read_end(ContextType::Object)
    }

    pub fn read_end_array(&mut self) -> Result<()> {
        self.read_end(ContextType::Array)
    }

    pub fn read_end_header(&mut self) -> Result<()> {
        self.read_end(ContextType::Header)
    }

    fn read_end(&mut self, ctype: ContextType) -> Result<()> {
        self.ensure_open()?;
        {
            let ctx = self.contexts.last().unwrap();
            if ctx.ctype != ctype {
                return Err(Error::ContextMismatch {
                    expected: ctype,
                    actual: ctx.ctype,
                });
            }
            if ctx.state != ReaderState::WaitEndObject {
                return Err(Error::StateViolation {
                    expected: "WAIT_END_OBJECT",
                    actual: ctx.state.name(),
                });
            }
        }
        let remaining = self.dec.input().remaining();
        if remaining != 0 {
            return Err(Error::TrailingBytes(remaining));
        }
        let ctx = self.contexts.pop().unwrap();
        self.dec.input().pop_limit(ctx.limit_token);
        self.current_type = ctx.outer_type;
        self.current_wire = ctx.outer_wire;
        self.current_name = ctx.outer_name;
        self.contexts.last_mut().unwrap().state = ReaderState::Type;
        Ok(())
    }

    /// Step over the current value without decoding it, dispatching on the
    /// tag and wire bits to consume exactly the right number of bytes. If
    /// the entry's key has not been consumed yet, it is skipped too.
    pub fn skip_value(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.state() == ReaderState::Name {
            self.skip_name()?;
        }
        let state = self.state();
        if state != ReaderState::Value {
            return Err(Error::StateViolation {
                expected: "VALUE",
                actual: state.name(),
            });
        }
        let ty = self.current_type;
        let wire_bits = self.current_wire;
        match ty {
            DsonType::Null => {}
            DsonType::Boolean => self.dec.input().skip(1)?,
            DsonType::Float => self.dec.input().skip(4)?,
            DsonType::Double => self.dec.input().skip(8)?,
            DsonType::Int32 => Self::skip_int(self.dec.input(), 4, wire_bits)?,
            DsonType::Int64 => Self::skip_int(self.dec.input(), 8, wire_bits)?,
            DsonType::ExtInt32 => {
                self.dec.input().skip_varint()?;
                Self::skip_int(self.dec.input(), 4, wire_bits)?;
            }
            DsonType::ExtInt64 => {
                self.dec.input().skip_varint()?;
                Self::skip_int(self.dec.input(), 8, wire_bits)?;
            }
            DsonType::String => {
                let len = self.dec.input().read_uint32()? as usize;
                self.dec.input().skip(len)?;
            }
            DsonType::ExtString => {
                let input = self.dec.input();
                input.skip_varint()?;
                let len = input.read_uint32()? as usize;
                input.skip(len)?;
            }
            DsonType::Binary => {
                let len = self.dec.input().read_fixed32()? as usize;
                self.dec.input().skip(len)?;
            }
            DsonType::Reference => {
                let input = self.dec.input();
                let len = input.read_uint32()? as usize;
                input.skip(len)?;
                let len = input.read_uint32()? as usize;
                input.skip(len)?;
                input.skip_varint()?;
                input.skip_varint()?;
            }
            DsonType::Array | DsonType::Object | DsonType::Header => {
                let len = self.dec.input().read_fixed32()? as usize;
                self.dec.fetch_class_id()?;
                self.dec.input().skip(len)?;
            }
            DsonType::EndOfObject => return Err(Error::InvalidData("no value to skip")),
        }
        self.post_value();
        Ok(())
    }

    fn skip_int(input: &mut DsonInput<'de>, fixed_len: usize, wire_bits: u8) -> Result<()> {
        match WireType::from_u8(wire_bits)? {
            WireType::VarInt | WireType::Uint | WireType::Sint => {
                input.skip_varint()?;
            }
            WireType::Fixed => input.skip(fixed_len)?,
        }
        Ok(())
    }

    /// Bulk-skip the rest of the current container's region, leaving the
    /// reader waiting on its end. The synthesized END_OF_OBJECT comes from
    /// the exhausted byte limit.
    pub fn skip_to_end_of_object(&mut self) -> Result<()> {
        self.ensure_open()?;
        {
            let ctx = self.contexts.last().unwrap();
            if ctx.ctype == ContextType::TopLevel {
                return Err(Error::ContextMismatch {
                    expected: ContextType::Object,
                    actual: ContextType::TopLevel,
                });
            }
            if matches!(
                ctx.state,
                ReaderState::WaitEndObject | ReaderState::WaitStartObject
            ) {
                return Err(Error::StateViolation {
                    expected: "TYPE, NAME or VALUE",
                    actual: ctx.state.name(),
                });
            }
        }
        let remaining = self.dec.input().remaining();
        self.dec.input().skip(remaining)?;
        self.contexts.last_mut().unwrap().state = ReaderState::Type;
        let ty = self.read_dson_type()?;
        debug_assert_eq!(ty, DsonType::EndOfObject);
        Ok(())
    }

    /// Release the reader's state. Safe after a failure; a second close is a
    /// no-op.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.contexts.clear();
            self.current_name = None;
        }
    }
}
