//! Per-depth protocol state shared by the writer and reader engines.

/// What kind of scope the engine is currently inside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextType {
    /// The root scope. Values are anonymous and unframed.
    TopLevel,
    /// A name-keyed container.
    Object,
    /// A positional container.
    Array,
    /// Container-shaped type metadata attached to an object, array, or the
    /// top level. Name-keyed like an object, but never contains a header.
    Header,
}

impl ContextType {
    pub fn is_container(self) -> bool {
        !matches!(self, ContextType::TopLevel)
    }
}

/// Writer-side protocol state for one context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterState {
    /// A fresh top-level context before the first write.
    Initial,
    /// A field name is expected next.
    Name,
    /// A value is expected next.
    Value,
}

impl WriterState {
    pub(crate) fn name(self) -> &'static str {
        match self {
            WriterState::Initial => "INITIAL",
            WriterState::Name => "NAME",
            WriterState::Value => "VALUE",
        }
    }
}

/// Reader-side protocol state for one context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReaderState {
    /// A fresh top-level context before the first read.
    Initial,
    /// A container was pre-started: its framing and class id are consumed,
    /// but the caller has not yet committed to descending.
    WaitStartObject,
    /// The next full-type byte is expected.
    Type,
    /// The current entry's field key is expected.
    Name,
    /// The current entry's value is expected.
    Value,
    /// END_OF_OBJECT was seen; only the matching read-end call is legal.
    WaitEndObject,
    /// The top level ran out of values.
    EndOfFile,
}

impl ReaderState {
    pub(crate) fn name(self) -> &'static str {
        match self {
            ReaderState::Initial => "INITIAL",
            ReaderState::WaitStartObject => "WAIT_START_OBJECT",
            ReaderState::Type => "TYPE",
            ReaderState::Name => "NAME",
            ReaderState::Value => "VALUE",
            ReaderState::WaitEndObject => "WAIT_END_OBJECT",
            ReaderState::EndOfFile => "END_OF_FILE",
        }
    }
}
