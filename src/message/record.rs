//! Hub message records with typed accessors.
//!
//! A record always keeps its complete field list, including the leading
//! type id, so packing never has to rebuild anything from the shape.
//!
//! # Example
//!
//! ```
//! use signalr_hub_codec::message::{MessageRecord, MessageShape};
//! use signalr_hub_codec::codec::Value;
//!
//! let record = MessageRecord::invocation(None, "Foo", vec![Value::int(42)]);
//! assert_eq!(record.shape(), MessageShape::Invocation);
//! assert_eq!(record.target(), Some("Foo"));
//! assert_eq!(record.invocation_id(), None);
//! ```

use std::fmt;

use crate::codec::{LenFormat, Value};

/// Hub protocol message type ids (first field of every message).
pub mod message_type {
    pub const INVOCATION: u8 = 1;
    pub const STREAM_ITEM: u8 = 2;
    pub const COMPLETION: u8 = 3;
    pub const STREAM_INVOCATION: u8 = 4;
    pub const CANCEL_INVOCATION: u8 = 5;
    pub const PING: u8 = 6;
    pub const CLOSE: u8 = 7;
}

/// Completion result kinds (fourth field of a completion).
pub mod result_kind {
    pub const ERROR: u8 = 1;
    pub const VOID: u8 = 2;
    pub const NON_VOID: u8 = 3;
}

/// Field-list grammar a record matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageShape {
    Invocation,
    StreamItem,
    Completion,
    StreamInvocation,
    CancelInvocation,
    Ping,
    Close,
    /// No known grammar matched; fields are kept verbatim.
    Opaque,
}

impl MessageShape {
    /// Wire type id, `None` for [`MessageShape::Opaque`].
    pub fn type_id(self) -> Option<u8> {
        match self {
            MessageShape::Invocation => Some(message_type::INVOCATION),
            MessageShape::StreamItem => Some(message_type::STREAM_ITEM),
            MessageShape::Completion => Some(message_type::COMPLETION),
            MessageShape::StreamInvocation => Some(message_type::STREAM_INVOCATION),
            MessageShape::CancelInvocation => Some(message_type::CANCEL_INVOCATION),
            MessageShape::Ping => Some(message_type::PING),
            MessageShape::Close => Some(message_type::CLOSE),
            MessageShape::Opaque => None,
        }
    }

    /// Shape selected by a type id, before any grammar check.
    pub fn from_type_id(id: u8) -> Option<Self> {
        match id {
            message_type::INVOCATION => Some(MessageShape::Invocation),
            message_type::STREAM_ITEM => Some(MessageShape::StreamItem),
            message_type::COMPLETION => Some(MessageShape::Completion),
            message_type::STREAM_INVOCATION => Some(MessageShape::StreamInvocation),
            message_type::CANCEL_INVOCATION => Some(MessageShape::CancelInvocation),
            message_type::PING => Some(MessageShape::Ping),
            message_type::CLOSE => Some(MessageShape::Close),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageShape::Invocation => "Invocation",
            MessageShape::StreamItem => "StreamItem",
            MessageShape::Completion => "Completion",
            MessageShape::StreamInvocation => "StreamInvocation",
            MessageShape::CancelInvocation => "CancelInvocation",
            MessageShape::Ping => "Ping",
            MessageShape::Close => "Close",
            MessageShape::Opaque => "Opaque",
        }
    }
}

impl fmt::Display for MessageShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome carried by a completion message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompletionResult<'a> {
    Error(&'a str),
    Void,
    Value(&'a Value),
}

/// One hub message: its shape plus the full field list.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    shape: MessageShape,
    fields: Vec<Value>,
    /// Array header width the fields were read with.
    array_format: LenFormat,
    /// Frame length prefix width, 0 for hand-built records.
    prefix_len: usize,
}

impl MessageRecord {
    pub(crate) fn from_parts(shape: MessageShape, fields: Vec<Value>, array_format: LenFormat) -> Self {
        Self {
            shape,
            fields,
            array_format,
            prefix_len: 0,
        }
    }

    pub(crate) fn with_prefix_len(mut self, prefix_len: usize) -> Self {
        self.prefix_len = prefix_len;
        self
    }

    /// Classify a field list into a record.
    pub fn from_fields(fields: Vec<Value>) -> Self {
        super::classify(fields)
    }

    /// `[6]`
    pub fn ping() -> Self {
        Self::from_fields(vec![Value::int(message_type::PING)])
    }

    /// `[1, {}, id, target, arguments]`
    pub fn invocation(invocation_id: Option<&str>, target: &str, arguments: Vec<Value>) -> Self {
        Self::from_fields(vec![
            Value::int(message_type::INVOCATION),
            Value::empty_map(),
            Value::from(invocation_id),
            Value::string(target),
            Value::array(arguments),
        ])
    }

    /// `[7, error]` or `[7, error, allow_reconnect]`
    pub fn close(error: Option<&str>, allow_reconnect: Option<bool>) -> Self {
        let mut fields = vec![Value::int(message_type::CLOSE), Value::from(error)];
        if let Some(allow) = allow_reconnect {
            fields.push(Value::Boolean(allow));
        }
        Self::from_fields(fields)
    }

    #[inline]
    pub fn shape(&self) -> MessageShape {
        self.shape
    }

    #[inline]
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    #[inline]
    pub fn array_format(&self) -> LenFormat {
        self.array_format
    }

    /// Width of the length prefix the record was framed with.
    #[inline]
    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    pub fn into_fields(self) -> Vec<Value> {
        self.fields
    }

    /// Take the frame prefix width, array header and field hints of the
    /// record this one was edited from. See [`Value::adopt_layout`].
    pub fn adopt_layout(&mut self, original: &MessageRecord) {
        self.array_format = original.array_format;
        self.prefix_len = original.prefix_len;
        for (field, orig) in self.fields.iter_mut().zip(&original.fields) {
            field.adopt_layout(orig);
        }
    }

    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.shape == MessageShape::Opaque
    }

    /// Headers map of every shape that carries one.
    pub fn headers(&self) -> Option<&[(Value, Value)]> {
        match self.shape {
            MessageShape::Invocation
            | MessageShape::StreamItem
            | MessageShape::Completion
            | MessageShape::StreamInvocation
            | MessageShape::CancelInvocation => self.fields[1].as_map(),
            _ => None,
        }
    }

    /// Invocation id. `None` for non-blocking invocations and shapes without one.
    pub fn invocation_id(&self) -> Option<&str> {
        match self.shape {
            MessageShape::Invocation
            | MessageShape::StreamItem
            | MessageShape::Completion
            | MessageShape::StreamInvocation
            | MessageShape::CancelInvocation => self.fields[2].as_str(),
            _ => None,
        }
    }

    /// Hub method name of an invocation.
    pub fn target(&self) -> Option<&str> {
        match self.shape {
            MessageShape::Invocation | MessageShape::StreamInvocation => self.fields[3].as_str(),
            _ => None,
        }
    }

    pub fn arguments(&self) -> Option<&[Value]> {
        match self.shape {
            MessageShape::Invocation | MessageShape::StreamInvocation => self.fields[4].as_array(),
            _ => None,
        }
    }

    pub fn stream_ids(&self) -> Option<&[Value]> {
        match self.shape {
            MessageShape::Invocation | MessageShape::StreamInvocation => {
                self.fields.get(5).and_then(Value::as_array)
            }
            _ => None,
        }
    }

    /// Payload of a stream item.
    pub fn item(&self) -> Option<&Value> {
        match self.shape {
            MessageShape::StreamItem => self.fields.get(3),
            _ => None,
        }
    }

    pub fn completion_result(&self) -> Option<CompletionResult<'_>> {
        if self.shape != MessageShape::Completion {
            return None;
        }
        let kind = self.fields[3].as_integer()?.get();
        match (kind, self.fields.get(4)) {
            (k, Some(Value::String(msg, _))) if k == result_kind::ERROR as i128 => {
                Some(CompletionResult::Error(msg))
            }
            (k, None) if k == result_kind::VOID as i128 => Some(CompletionResult::Void),
            (k, Some(value)) if k == result_kind::NON_VOID as i128 => {
                Some(CompletionResult::Value(value))
            }
            _ => None,
        }
    }

    /// Error text of a close message.
    pub fn close_error(&self) -> Option<&str> {
        match self.shape {
            MessageShape::Close => self.fields[1].as_str(),
            _ => None,
        }
    }

    pub fn allow_reconnect(&self) -> Option<bool> {
        match self.shape {
            MessageShape::Close => self.fields.get(2).and_then(Value::as_bool),
            _ => None,
        }
    }
}

// Array header and prefix widths are layout hints, like those inside `Value`.
impl PartialEq for MessageRecord {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.fields == other.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_id_round_trip() {
        for id in 1..=7u8 {
            let shape = MessageShape::from_type_id(id).unwrap();
            assert_eq!(shape.type_id(), Some(id));
        }
        assert_eq!(MessageShape::from_type_id(0), None);
        assert_eq!(MessageShape::from_type_id(8), None);
        assert_eq!(MessageShape::Opaque.type_id(), None);
    }

    #[test]
    fn test_shape_display() {
        assert_eq!(MessageShape::StreamInvocation.to_string(), "StreamInvocation");
    }

    #[test]
    fn test_ping() {
        let ping = MessageRecord::ping();
        assert_eq!(ping.shape(), MessageShape::Ping);
        assert_eq!(ping.fields(), &[Value::int(6)]);
        assert!(ping.headers().is_none());
        assert!(ping.invocation_id().is_none());
    }

    #[test]
    fn test_invocation_accessors() {
        let record = MessageRecord::invocation(Some("7"), "DispatchBrowserEvent", vec![Value::Nil]);
        assert_eq!(record.shape(), MessageShape::Invocation);
        assert_eq!(record.invocation_id(), Some("7"));
        assert_eq!(record.target(), Some("DispatchBrowserEvent"));
        assert_eq!(record.arguments(), Some(&[Value::Nil][..]));
        assert_eq!(record.headers(), Some(&[][..]));
        assert!(record.stream_ids().is_none());
        assert!(record.item().is_none());
    }

    #[test]
    fn test_close_accessors() {
        let record = MessageRecord::close(Some("bye"), Some(true));
        assert_eq!(record.shape(), MessageShape::Close);
        assert_eq!(record.close_error(), Some("bye"));
        assert_eq!(record.allow_reconnect(), Some(true));

        let record = MessageRecord::close(None, None);
        assert_eq!(record.shape(), MessageShape::Close);
        assert_eq!(record.close_error(), None);
        assert_eq!(record.allow_reconnect(), None);
    }

    #[test]
    fn test_completion_results() {
        let error = MessageRecord::from_fields(vec![
            Value::int(3),
            Value::empty_map(),
            Value::string("1"),
            Value::int(1),
            Value::string("boom"),
        ]);
        assert_eq!(error.completion_result(), Some(CompletionResult::Error("boom")));

        let void = MessageRecord::from_fields(vec![
            Value::int(3),
            Value::empty_map(),
            Value::string("1"),
            Value::int(2),
        ]);
        assert_eq!(void.completion_result(), Some(CompletionResult::Void));

        let result = Value::array(vec![Value::int(1)]);
        let value = MessageRecord::from_fields(vec![
            Value::int(3),
            Value::empty_map(),
            Value::string("1"),
            Value::int(3),
            result.clone(),
        ]);
        assert_eq!(value.completion_result(), Some(CompletionResult::Value(&result)));
    }

    #[test]
    fn test_equality_ignores_array_format() {
        let a = MessageRecord::from_parts(MessageShape::Ping, vec![Value::int(6)], LenFormat::L16)
            .with_prefix_len(3);
        assert_eq!(a, MessageRecord::ping());
        assert_eq!(MessageRecord::ping().prefix_len(), 0);
    }

    #[test]
    fn test_adopt_layout_copies_frame_hints() {
        let original = MessageRecord::from_parts(
            MessageShape::Invocation,
            vec![
                Value::int(1),
                Value::empty_map(),
                Value::String("7".into(), LenFormat::L8),
                Value::String("Foo".into(), LenFormat::L16),
                Value::array(vec![Value::int(42)]),
            ],
            LenFormat::L16,
        )
        .with_prefix_len(2);

        let mut edited = MessageRecord::invocation(Some("7"), "Bar", vec![Value::int(43)]);
        edited.adopt_layout(&original);

        assert_eq!(edited.array_format(), LenFormat::L16);
        assert_eq!(edited.prefix_len(), 2);
        assert!(matches!(edited.fields()[2], Value::String(_, LenFormat::L8)));
        assert!(matches!(edited.fields()[3], Value::String(_, LenFormat::Canonical)));
        assert_eq!(edited.target(), Some("Bar"));
    }
}
