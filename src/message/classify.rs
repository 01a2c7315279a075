//! Best-effort classification of field lists into hub message shapes.
//!
//! Only arity and value kinds are checked. Field lists that fit no grammar
//! become [`MessageShape::Opaque`] and are kept exactly as they are.

use super::record::{result_kind, MessageRecord, MessageShape};
use crate::codec::{LenFormat, Value};

/// Classify a field list.
///
/// # Example
///
/// ```
/// use signalr_hub_codec::codec::Value;
/// use signalr_hub_codec::message::{classify, MessageShape};
///
/// assert_eq!(classify(vec![Value::int(6)]).shape(), MessageShape::Ping);
/// assert_eq!(classify(vec![Value::int(6), Value::Nil]).shape(), MessageShape::Opaque);
/// assert_eq!(classify(vec![Value::string("6")]).shape(), MessageShape::Opaque);
/// ```
pub fn classify(fields: Vec<Value>) -> MessageRecord {
    classify_with_format(fields, LenFormat::Canonical)
}

pub(crate) fn classify_with_format(fields: Vec<Value>, array_format: LenFormat) -> MessageRecord {
    let shape = shape_of(&fields);
    if shape == MessageShape::Opaque {
        tracing::debug!(
            field_count = fields.len(),
            first = fields.first().map(|v| v.kind_name()).unwrap_or("nothing"),
            "message matches no hub shape, keeping it opaque"
        );
    }
    MessageRecord::from_parts(shape, fields, array_format)
}

/// Shape a field list would be classified as.
pub fn shape_of(fields: &[Value]) -> MessageShape {
    let Some((first, rest)) = fields.split_first() else {
        return MessageShape::Opaque;
    };
    let shape = first
        .as_integer()
        .and_then(|id| u8::try_from(id.get()).ok())
        .and_then(MessageShape::from_type_id);

    match shape {
        Some(shape) if matches_grammar(shape, rest) => shape,
        _ => MessageShape::Opaque,
    }
}

fn is_map(v: &Value) -> bool {
    matches!(v, Value::Map(..))
}

fn is_str(v: &Value) -> bool {
    matches!(v, Value::String(..))
}

fn is_str_or_nil(v: &Value) -> bool {
    matches!(v, Value::String(..) | Value::Nil)
}

fn is_array(v: &Value) -> bool {
    matches!(v, Value::Array(..))
}

fn is_bool(v: &Value) -> bool {
    matches!(v, Value::Boolean(_))
}

/// `rest` is the field list after the type id.
fn matches_grammar(shape: MessageShape, rest: &[Value]) -> bool {
    match (shape, rest) {
        (MessageShape::Invocation, [headers, id, target, args, stream_ids @ ..]) => {
            is_map(headers)
                && is_str_or_nil(id)
                && is_str(target)
                && is_array(args)
                && optional_array(stream_ids)
        }
        (MessageShape::StreamInvocation, [headers, id, target, args, stream_ids @ ..]) => {
            is_map(headers)
                && is_str(id)
                && is_str(target)
                && is_array(args)
                && optional_array(stream_ids)
        }
        (MessageShape::StreamItem, [headers, id, _item]) => is_map(headers) && is_str(id),
        (MessageShape::Completion, [headers, id, kind, result @ ..]) => {
            is_map(headers) && is_str(id) && completion_matches(kind, result)
        }
        (MessageShape::CancelInvocation, [headers, id]) => is_map(headers) && is_str(id),
        (MessageShape::Ping, []) => true,
        (MessageShape::Close, [error]) => is_str_or_nil(error),
        (MessageShape::Close, [error, allow_reconnect]) => {
            is_str_or_nil(error) && is_bool(allow_reconnect)
        }
        _ => false,
    }
}

fn optional_array(tail: &[Value]) -> bool {
    match tail {
        [] => true,
        [ids] => is_array(ids),
        _ => false,
    }
}

fn completion_matches(kind: &Value, result: &[Value]) -> bool {
    let Some(kind) = kind.as_integer().and_then(|k| u8::try_from(k.get()).ok()) else {
        return false;
    };
    match (kind, result) {
        (result_kind::ERROR, [message]) => is_str(message),
        (result_kind::VOID, []) => true,
        (result_kind::NON_VOID, [_]) => true,
        _ => false,
    }
}
