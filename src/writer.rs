//! The writer protocol engine.
//!
//! [`DsonWriter`] owns the call-order state machine: names before values in
//! name-keyed scopes, balanced container starts and ends, and the recursion
//! limit. The flavor-specific byte work — how a field key and a class id are
//! spelled on the wire — is delegated to an [`Encoder`].
//!
//! Every scope cycles through [`WriterState`] by its kind: OBJECT and HEADER
//! alternate NAME and VALUE, ARRAY and the top level stay in VALUE. A value
//! entry is `full-type byte, field key (named scopes only), payload`; a
//! container entry follows the key with a fixed32 length placeholder and the
//! class id, and the placeholder is patched when the container ends.

use crate::bits::make_full_type;
use crate::context::{ContextType, WriterState};
use crate::error::{Error, Result};
use crate::output::DsonOutput;
use crate::types::{DsonType, FieldKey, ObjectRef, WireType, SUBTYPE_MESSAGE};
use crate::DEFAULT_RECURSION_LIMIT;

/// Borrowed field-key form accepted by [`DsonWriter`] methods.
pub type NameRef<'a, E> = <<E as Encoder>::Name as FieldKey>::Ref<'a>;

/// Flavor hooks for the writer engine: key and class-id spelling plus access
/// to the underlying byte sink. Value payload encodings are shared across
/// flavors and live on [`DsonOutput`].
pub trait Encoder {
    type Name: FieldKey;
    type ClassId: ?Sized;

    fn out(&mut self) -> &mut DsonOutput;
    fn position(&self) -> usize;
    fn into_out(self) -> DsonOutput
    where
        Self: Sized;

    /// Spell a field key.
    fn emit_name(&mut self, name: &Self::Name) -> Result<()>;

    /// Spell a class id, including the flavor's "absent" form for `None`.
    fn emit_class_id(&mut self, class_id: Option<&Self::ClassId>) -> Result<()>;
}

#[derive(Debug)]
struct WriterContext<K> {
    ctype: ContextType,
    state: WriterState,
    pending_name: Option<K>,
    /// Offset of the fixed32 length placeholder. Zero for the top level.
    patch_at: usize,
    /// Offset just past the class id; the patched length counts from here.
    content_start: usize,
}

/// Streaming writer over any [`Encoder`] flavor.
///
/// Contexts live in a vector indexed by nesting depth, so starting a sibling
/// container right after one ends reuses the vector's spare capacity.
#[derive(Debug)]
pub struct DsonWriter<E: Encoder> {
    enc: E,
    contexts: Vec<WriterContext<E::Name>>,
    recursion_limit: usize,
    closed: bool,
}

impl<E: Encoder> DsonWriter<E> {
    pub fn new(enc: E) -> DsonWriter<E> {
        DsonWriter::with_recursion_limit(enc, DEFAULT_RECURSION_LIMIT)
    }

    pub fn with_recursion_limit(enc: E, recursion_limit: usize) -> DsonWriter<E> {
        DsonWriter {
            enc,
            contexts: vec![WriterContext {
                ctype: ContextType::TopLevel,
                state: WriterState::Initial,
                pending_name: None,
                patch_at: 0,
                content_start: 0,
            }],
            recursion_limit,
            closed: false,
        }
    }

    /// Number of containers currently open.
    pub fn depth(&self) -> usize {
        self.contexts.len().saturating_sub(1)
    }

    /// Bytes emitted so far.
    pub fn position(&self) -> usize {
        self.enc.position()
    }

    /// View of everything emitted so far, container length placeholders
    /// included.
    pub fn bytes(&mut self) -> &[u8] {
        self.enc.out().as_slice()
    }

    pub fn context_type(&self) -> ContextType {
        self.contexts.last().map_or(ContextType::TopLevel, |c| c.ctype)
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

    fn state(&self) -> WriterState {
        self.contexts.last().unwrap().state
    }

    /// Record the key of the next entry. Legal only while a name is expected.
    pub fn write_name(&mut self, name: NameRef<'_, E>) -> Result<()> {
        self.ensure_open()?;
        let ctx = self.contexts.last_mut().unwrap();
        if ctx.state != WriterState::Name {
            return Err(Error::StateViolation {
                expected: "NAME",
                actual: ctx.state.name(),
            });
        }
        ctx.pending_name = Some(E::Name::from_ref(name));
        ctx.state = WriterState::Value;
        Ok(())
    }

    fn advance_to_value(&mut self, name: Option<NameRef<'_, E>>) -> Result<()> {
        self.ensure_open()?;
        {
            let ctx = self.contexts.last_mut().unwrap();
            if ctx.ctype == ContextType::TopLevel && ctx.state == WriterState::Initial {
                ctx.state = WriterState::Value;
            }
        }
        if self.state() == WriterState::Name {
            match name {
                Some(name) => self.write_name(name)?,
                None => {
                    return Err(Error::StateViolation {
                        expected: "VALUE",
                        actual: "NAME",
                    })
                }
            }
        }
        let state = self.state();
        if state != WriterState::Value {
            return Err(Error::StateViolation {
                expected: "VALUE",
                actual: state.name(),
            });
        }
        Ok(())
    }

    /// Write the full-type byte and any pending key.
    fn begin_value(
        &mut self,
        name: Option<NameRef<'_, E>>,
        ty: DsonType,
        wire_bits: u8,
    ) -> Result<()> {
        self.advance_to_value(name)?;
        self.enc
            .out()
            .write_u8(make_full_type(ty.into_u8(), wire_bits));
        if let Some(pending) = self.contexts.last_mut().unwrap().pending_name.take() {
            self.enc.emit_name(&pending)?;
        }
        Ok(())
    }

    fn end_value(&mut self) {
        let ctx = self.contexts.last_mut().unwrap();
        ctx.state = match ctx.ctype {
            ContextType::Object | ContextType::Header => WriterState::Name,
            ContextType::TopLevel | ContextType::Array => WriterState::Value,
        };
    }

    pub fn write_int32(
        &mut self,
        name: Option<NameRef<'_, E>>,
        value: i32,
        wire: WireType,
    ) -> Result<()> {
        self.begin_value(name, DsonType::Int32, wire.into_u8())?;
        self.enc.out().write_int32(value, wire);
        self.end_value();
        Ok(())
    }

    pub fn write_int64(
        &mut self,
        name: Option<NameRef<'_, E>>,
        value: i64,
        wire: WireType,
    ) -> Result<()> {
        self.begin_value(name, DsonType::Int64, wire.into_u8())?;
        self.enc.out().write_int64(value, wire);
        self.end_value();
        Ok(())
    }

    pub fn write_float(&mut self, name: Option<NameRef<'_, E>>, value: f32) -> Result<()> {
        self.begin_value(name, DsonType::Float, 0)?;
        self.enc.out().write_float(value);
        self.end_value();
        Ok(())
    }

    pub fn write_double(&mut self, name: Option<NameRef<'_, E>>, value: f64) -> Result<()> {
        self.begin_value(name, DsonType::Double, 0)?;
        self.enc.out().write_double(value);
        self.end_value();
        Ok(())
    }

    pub fn write_bool(&mut self, name: Option<NameRef<'_, E>>, value: bool) -> Result<()> {
        self.begin_value(name, DsonType::Boolean, 0)?;
        self.enc.out().write_u8(value as u8);
        self.end_value();
        Ok(())
    }

    pub fn write_null(&mut self, name: Option<NameRef<'_, E>>) -> Result<()> {
        self.begin_value(name, DsonType::Null, 0)?;
        self.end_value();
        Ok(())
    }

    pub fn write_string(&mut self, name: Option<NameRef<'_, E>>, value: &str) -> Result<()> {
        self.begin_value(name, DsonType::String, 0)?;
        self.enc.out().write_string(value)?;
        self.end_value();
        Ok(())
    }

    /// `fixed32(1 + payload length) + subtype byte + payload`.
    pub fn write_binary(
        &mut self,
        name: Option<NameRef<'_, E>>,
        subtype: u8,
        data: &[u8],
    ) -> Result<()> {
        if data.len() as u64 + 1 > u32::MAX as u64 {
            return Err(Error::OutOfRange("binary payload longer than u32::MAX - 1"));
        }
        self.begin_value(name, DsonType::Binary, 0)?;
        let out = self.enc.out();
        out.write_fixed32(data.len() as u32 + 1);
        out.write_u8(subtype);
        out.write_raw(data);
        self.end_value();
        Ok(())
    }

    /// Embed an externally framed message blob as binary with the reserved
    /// subtype. The blob's own framing is trusted; no inner length is added.
    pub fn write_message(&mut self, name: Option<NameRef<'_, E>>, data: &[u8]) -> Result<()> {
        self.write_binary(name, SUBTYPE_MESSAGE, data)
    }

    pub fn write_ext_int32(
        &mut self,
        name: Option<NameRef<'_, E>>,
        subtype: u32,
        value: i32,
        wire: WireType,
    ) -> Result<()> {
        self.begin_value(name, DsonType::ExtInt32, wire.into_u8())?;
        let out = self.enc.out();
        out.write_uint32(subtype);
        out.write_int32(value, wire);
        self.end_value();
        Ok(())
    }

    pub fn write_ext_int64(
        &mut self,
        name: Option<NameRef<'_, E>>,
        subtype: u32,
        value: i64,
        wire: WireType,
    ) -> Result<()> {
        self.begin_value(name, DsonType::ExtInt64, wire.into_u8())?;
        let out = self.enc.out();
        out.write_uint32(subtype);
        out.write_int64(value, wire);
        self.end_value();
        Ok(())
    }

    pub fn write_ext_string(
        &mut self,
        name: Option<NameRef<'_, E>>,
        subtype: u32,
        value: &str,
    ) -> Result<()> {
        self.begin_value(name, DsonType::ExtString, 0)?;
        self.enc.out().write_uint32(subtype);
        self.enc.out().write_string(value)?;
        self.end_value();
        Ok(())
    }

    pub fn write_reference(
        &mut self,
        name: Option<NameRef<'_, E>>,
        value: &ObjectRef,
    ) -> Result<()> {
        self.begin_value(name, DsonType::Reference, 0)?;
        let out = self.enc.out();
        out.write_string(&value.namespace)?;
        out.write_string(&value.local_id)?;
        out.write_uint32(value.ref_type);
        out.write_uint32(value.policy);
        self.end_value();
        Ok(())
    }

    pub fn write_start_object(
        &mut self,
        name: Option<NameRef<'_, E>>,
        class_id: Option<&E::ClassId>,
    ) -> Result<()> {
        self.write_start(name, DsonType::Object, ContextType::Object, class_id)
    }

    pub fn write_start_array(
        &mut self,
        name: Option<NameRef<'_, E>>,
        class_id: Option<&E::ClassId>,
    ) -> Result<()> {
        self.write_start(name, DsonType::Array, ContextType::Array, class_id)
    }

    fn write_start(
        &mut self,
        name: Option<NameRef<'_, E>>,
        ty: DsonType,
        ctype: ContextType,
        class_id: Option<&E::ClassId>,
    ) -> Result<()> {
        self.ensure_open()?;
        if self.depth() >= self.recursion_limit {
            return Err(Error::RecursionLimit(self.recursion_limit));
        }
        self.begin_value(name, ty, 0)?;
        self.push_container(ctype, class_id)
    }

    /// A header entry is always anonymous: at the top level or in an array it
    /// sits in the value slot, and inside an object it occupies the NAME slot
    /// without consuming a key. Headers never nest inside headers.
    pub fn write_start_header(&mut self, class_id: Option<&E::ClassId>) -> Result<()> {
        self.ensure_open()?;
        if self.depth() >= self.recursion_limit {
            return Err(Error::RecursionLimit(self.recursion_limit));
        }
        {
            let ctx = self.contexts.last_mut().unwrap();
            if ctx.ctype == ContextType::Header {
                return Err(Error::ContextMismatch {
                    expected: ContextType::Object,
                    actual: ContextType::Header,
                });
            }
            if ctx.ctype == ContextType::TopLevel && ctx.state == WriterState::Initial {
                ctx.state = WriterState::Value;
            }
            match (ctx.ctype, ctx.state) {
                (ContextType::Object, WriterState::Name) => {}
                (_, WriterState::Value) => {}
                (_, other) => {
                    return Err(Error::StateViolation {
                        expected: "NAME or VALUE",
                        actual: other.name(),
                    })
                }
            }
        }
        self.enc
            .out()
            .write_u8(make_full_type(DsonType::Header.into_u8(), 0));
        self.push_container(ContextType::Header, class_id)
    }

    fn push_container(&mut self, ctype: ContextType, class_id: Option<&E::ClassId>) -> Result<()> {
        let patch_at = self.enc.position();
        self.enc.out().write_fixed32(0);
        self.enc.emit_class_id(class_id)?;
        let content_start = self.enc.position();
        let state = match ctype {
            ContextType::Object | ContextType::Header => WriterState::Name,
            ContextType::TopLevel | ContextType::Array => WriterState::Value,
        };
        self.contexts.push(WriterContext {
            ctype,
            state,
            pending_name: None,
            patch_at,
            content_start,
        });
        Ok(())
    }

    pub fn write_end_object(&mut self) -> Result<()> {
        self.write_end(ContextType::Object, WriterState::Name)
    }

    pub fn write_end_array(&mut self) -> Result<()> {
        self.write_end(ContextType::Array, WriterState::Value)
    }

    pub fn write_end_header(&mut self) -> Result<()> {
        self.write_end(ContextType::Header, WriterState::Name)
    }

    fn write_end(&mut self, ctype: ContextType, expected: WriterState) -> Result<()> {
        self.ensure_open()?;
        let ctx = self.contexts.last().unwrap();
        if ctx.ctype != ctype {
            return Err(Error::ContextMismatch {
                expected: ctype,
                actual: ctx.ctype,
            });
        }
        if ctx.state != expected {
            return Err(Error::StateViolation {
                expected: expected.name(),
                actual: ctx.state.name(),
            });
        }
        let (patch_at, content_start) = (ctx.patch_at, ctx.content_start);
        self.enc.out().write_u8(0); // END_OF_OBJECT
        let len = self.enc.position() - content_start;
        if len > u32::MAX as usize {
            return Err(Error::OutOfRange("container payload longer than u32::MAX"));
        }
        self.enc.out().patch_fixed32(patch_at, len as u32);
        self.contexts.pop();
        self.end_value();
        Ok(())
    }

    /// Consume the writer and return the encoded bytes. Fails if a container
    /// is still open.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if self.depth() != 0 {
            let ctx = self.contexts.last().unwrap();
            return Err(Error::ContextMismatch {
                expected: ContextType::TopLevel,
                actual: ctx.ctype,
            });
        }
        self.closed = true;
        self.contexts.clear();
        let DsonWriter { enc, .. } = self;
        Ok(enc.into_out().into_vec())
    }

    /// Release the writer's state. Safe after a failure; a second close is a
    /// no-op.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.contexts.clear();
        }
    }
}
