//! JSON text bridge for hand editing.
//!
//! Records become a JSON array of arrays. Values map onto the nearest JSON
//! form; kinds JSON cannot tell apart are wrapped in single-key objects
//! whose key starts with `$`:
//!
//! | Value | JSON |
//! |-------|------|
//! | nil, boolean, string, array | `null`, `true`, `"text"`, `[...]` |
//! | integer | `42` |
//! | float64 | `1.5`, `2.0`, `1e300` (always a `.` or exponent) |
//! | float32 | `{"$float32": 1.5}` |
//! | non-finite float64 | `{"$float64": "NaN"}` (`"Infinity"`, `"-Infinity"`) |
//! | binary | `{"$binary": "AQID"}` (base64) |
//! | string with invalid UTF-8 | `{"$invalidUtf8": "wyg="}` |
//! | map, unique string keys without `$` | `{"key": value}` (order kept) |
//! | any other map | `{"$map": [[key, value], ...]}` |
//! | extension | `{"$ext": [type, "base64"]}` |
//!
//! Parsing is the reverse, with one lossy edge: a JSON number becomes an
//! integer unless it contains `.`, `e` or `E`, in which case it becomes a
//! float64. Layout hints do not survive text on their own. Parse with
//! [`from_text_with_layout`] to carry them over from the records the text
//! was rendered from; plain [`from_text`] yields canonical form.

use std::collections::HashSet;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{Map, Number, Value as Json};

use crate::codec::{Binary, Extension, Integer, LenFormat, Value};
use crate::error::TextFormatError;
use crate::message::{classify, MessageRecord};

const BINARY_TAG: &str = "$binary";
const INVALID_UTF8_TAG: &str = "$invalidUtf8";
const FLOAT32_TAG: &str = "$float32";
const FLOAT64_TAG: &str = "$float64";
const MAP_TAG: &str = "$map";
const EXT_TAG: &str = "$ext";
const TAG_PREFIX: char = '$';

/// Longest string, binary, extension, array or map MessagePack can frame.
const MAX_WIRE_LEN: usize = u32::MAX as usize;

/// Render records as compact JSON.
///
/// # Example
///
/// ```
/// use signalr_hub_codec::{to_text, MessageRecord};
///
/// assert_eq!(to_text(&[MessageRecord::ping()]), "[[6]]");
/// ```
pub fn to_text(records: &[MessageRecord]) -> String {
    records_to_json(records).to_string()
}

/// Render records as indented JSON.
pub fn to_text_pretty(records: &[MessageRecord]) -> String {
    format!("{:#}", records_to_json(records))
}

/// Parse records from JSON text. Each record is classified again.
pub fn from_text(text: &str) -> Result<Vec<MessageRecord>, TextFormatError> {
    let tree: Json = serde_json::from_str(text)?;
    records_from_json(&tree).map_err(|err| {
        tracing::debug!(error = %err, "text rejected");
        err
    })
}

/// Parse edited text and give every value the edit left alone the layout
/// it had in `original`. Records pair up with `original` by position; extra
/// records stay canonical.
///
/// # Example
///
/// ```
/// use signalr_hub_codec::text::from_text_with_layout;
/// use signalr_hub_codec::{pack, to_text, unpack};
///
/// // [1, {}, str8 "7", str16 "Foo", [42], []]
/// let raw = [
///     0x0f, 0x96, 0x01, 0x80, 0xd9, 0x01, b'7', 0xda, 0x00, 0x03, b'F', b'o', b'o', 0x91,
///     0x2a, 0x90,
/// ];
/// let original = unpack(&raw).unwrap();
/// let text = to_text(&original).replace("42", "43");
///
/// let edited = pack(&from_text_with_layout(&text, &original).unwrap());
/// assert_eq!(edited[..14], raw[..14]);
/// assert_eq!(edited[14], 0x2b);
/// ```
pub fn from_text_with_layout(
    text: &str,
    original: &[MessageRecord],
) -> Result<Vec<MessageRecord>, TextFormatError> {
    let mut records = from_text(text)?;
    for (record, orig) in records.iter_mut().zip(original) {
        record.adopt_layout(orig);
    }
    Ok(records)
}

/// Build the JSON tree for a record list.
pub fn records_to_json(records: &[MessageRecord]) -> Json {
    Json::Array(
        records
            .iter()
            .map(|record| Json::Array(record.fields().iter().map(value_to_json).collect()))
            .collect(),
    )
}

/// Convert one value to its JSON form.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Nil => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Integer(i, _) => integer_to_json(*i),
        Value::Float64(f) if f.is_finite() => float_number(format!("{f:?}"))
            .unwrap_or_else(|| tagged(FLOAT64_TAG, Json::String(format!("{f:?}")))),
        Value::Float64(f) => tagged(FLOAT64_TAG, Json::String(non_finite_name(f.is_nan(), *f > 0.0))),
        Value::Float32(f) if f.is_finite() => tagged(
            FLOAT32_TAG,
            float_number(format!("{f:?}")).unwrap_or_else(|| Json::String(format!("{f:?}"))),
        ),
        Value::Float32(f) => tagged(FLOAT32_TAG, Json::String(non_finite_name(f.is_nan(), *f > 0.0))),
        Value::String(s, _) => Json::String(s.clone()),
        Value::Binary(bin, _) => {
            let tag = if bin.invalid_utf8 { INVALID_UTF8_TAG } else { BINARY_TAG };
            tagged(tag, Json::String(BASE64.encode(&bin.bytes)))
        }
        Value::Array(items, _) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Map(pairs, _) => map_to_json(pairs),
        Value::Extension(ext, _) => tagged(
            EXT_TAG,
            Json::Array(vec![
                Json::from(ext.type_id),
                Json::String(BASE64.encode(&ext.data)),
            ]),
        ),
    }
}

fn integer_to_json(i: Integer) -> Json {
    match (i.as_i64(), i.as_u64()) {
        (Some(v), _) => Json::from(v),
        (None, Some(v)) => Json::from(v),
        (None, None) => unreachable!("Integer holds values in i64::MIN..=u64::MAX"),
    }
}

/// Rust's `Debug` float formatting is the shortest exact form and always
/// has a `.` or an exponent, which keeps floats distinguishable from ints.
fn float_number(repr: String) -> Option<Json> {
    Number::from_str(&repr).ok().map(Json::Number)
}

fn non_finite_name(is_nan: bool, positive: bool) -> String {
    match (is_nan, positive) {
        (true, _) => "NaN",
        (false, true) => "Infinity",
        (false, false) => "-Infinity",
    }
    .to_owned()
}

fn tagged(tag: &str, inner: Json) -> Json {
    let mut obj = Map::with_capacity(1);
    obj.insert(tag.to_owned(), inner);
    Json::Object(obj)
}

fn map_to_json(pairs: &[(Value, Value)]) -> Json {
    let mut seen = HashSet::new();
    let plain_keys: Option<Vec<&str>> = pairs
        .iter()
        .map(|(k, _)| match k {
            Value::String(s, _) if !s.starts_with(TAG_PREFIX) && seen.insert(s.as_str()) => {
                Some(s.as_str())
            }
            _ => None,
        })
        .collect();

    match plain_keys {
        Some(keys) => Json::Object(
            keys.into_iter()
                .zip(pairs)
                .map(|(k, (_, v))| (k.to_owned(), value_to_json(v)))
                .collect(),
        ),
        None => tagged(
            MAP_TAG,
            Json::Array(
                pairs
                    .iter()
                    .map(|(k, v)| Json::Array(vec![value_to_json(k), value_to_json(v)]))
                    .collect(),
            ),
        ),
    }
}

/// Location of a node in the JSON tree, rendered as a JSON Pointer.
#[derive(Clone, Copy)]
struct Path<'a> {
    parent: Option<&'a Path<'a>>,
    segment: Segment<'a>,
}

#[derive(Clone, Copy)]
enum Segment<'a> {
    Root,
    Index(usize),
    Key(&'a str),
}

impl<'a> Path<'a> {
    const ROOT: Path<'static> = Path {
        parent: None,
        segment: Segment::Root,
    };

    fn index(&'a self, index: usize) -> Path<'a> {
        Path {
            parent: Some(self),
            segment: Segment::Index(index),
        }
    }

    fn key(&'a self, key: &'a str) -> Path<'a> {
        Path {
            parent: Some(self),
            segment: Segment::Key(key),
        }
    }

    fn render(&self) -> String {
        let mut segments = Vec::new();
        let mut node = Some(self);
        while let Some(path) = node {
            match path.segment {
                Segment::Root => {}
                Segment::Index(i) => segments.push(i.to_string()),
                Segment::Key(k) => segments.push(k.replace('~', "~0").replace('/', "~1")),
            }
            node = path.parent;
        }
        segments.iter().rev().fold(String::new(), |mut out, s| {
            out.push('/');
            out.push_str(s);
            out
        })
    }

    fn error(&self, reason: impl Into<String>) -> TextFormatError {
        TextFormatError::invalid(self.render(), reason)
    }
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

/// Parse a JSON tree into records.
pub fn records_from_json(tree: &Json) -> Result<Vec<MessageRecord>, TextFormatError> {
    let root = Path::ROOT;
    let Json::Array(records) = tree else {
        return Err(root.error(format!("expected an array of records, found {}", json_kind(tree))));
    };

    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let path = root.index(i);
            let Json::Array(fields) = record else {
                return Err(path.error(format!(
                    "expected a record array, found {}",
                    json_kind(record)
                )));
            };
            let fields = fields
                .iter()
                .enumerate()
                .map(|(j, field)| value_from_json(field, &path.index(j)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(classify(fields))
        })
        .collect()
}

/// Parse one JSON node into a value.
pub fn value_from_json_node(json: &Json) -> Result<Value, TextFormatError> {
    value_from_json(json, &Path::ROOT)
}

fn value_from_json(json: &Json, path: &Path<'_>) -> Result<Value, TextFormatError> {
    match json {
        Json::Null => Ok(Value::Nil),
        Json::Bool(b) => Ok(Value::Boolean(*b)),
        Json::Number(n) => number_from_json(n, path),
        Json::String(s) => {
            check_wire_len(s.len(), path)?;
            Ok(Value::string(s.clone()))
        }
        Json::Array(items) => {
            check_wire_len(items.len(), path)?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| value_from_json(item, &path.index(i)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::array)
        }
        Json::Object(obj) => object_from_json(obj, path),
    }
}

fn check_wire_len(len: usize, path: &Path<'_>) -> Result<(), TextFormatError> {
    if len > MAX_WIRE_LEN {
        return Err(path.error(format!(
            "length {len} exceeds the MessagePack limit of {MAX_WIRE_LEN}"
        )));
    }
    Ok(())
}

fn number_from_json(n: &Number, path: &Path<'_>) -> Result<Value, TextFormatError> {
    let literal = n.to_string();
    if literal.contains(['.', 'e', 'E']) {
        return literal
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|_| path.error(format!("invalid number {literal}")));
    }
    literal
        .parse::<i128>()
        .ok()
        .and_then(Integer::new)
        .map(Value::int)
        .ok_or_else(|| path.error(format!("integer {literal} is outside the MessagePack range")))
}

fn object_from_json(obj: &Map<String, Json>, path: &Path<'_>) -> Result<Value, TextFormatError> {
    if let Some((tag, inner)) = obj.iter().next().filter(|_| obj.len() == 1) {
        if tag.starts_with(TAG_PREFIX) {
            return tagged_from_json(tag, inner, &path.key(tag));
        }
    }
    check_wire_len(obj.len(), path)?;

    obj.iter()
        .map(|(key, value)| {
            let child = path.key(key);
            if key.starts_with(TAG_PREFIX) {
                return Err(child.error(format!(
                    "key {key:?} is reserved for tagged values, use {MAP_TAG} for this map"
                )));
            }
            Ok((Value::string(key.clone()), value_from_json(value, &child)?))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::map)
}

fn tagged_from_json(tag: &str, inner: &Json, path: &Path<'_>) -> Result<Value, TextFormatError> {
    match tag {
        BINARY_TAG => Ok(Value::binary(base64_from_json(inner, path)?)),
        INVALID_UTF8_TAG => Ok(Value::Binary(
            Binary {
                bytes: base64_from_json(inner, path)?,
                invalid_utf8: true,
            },
            LenFormat::Canonical,
        )),
        FLOAT64_TAG => float_from_json::<f64>(inner, path).map(Value::Float64),
        FLOAT32_TAG => float_from_json::<f32>(inner, path).map(Value::Float32),
        MAP_TAG => {
            let Json::Array(pairs) = inner else {
                return Err(path.error(format!("expected an array of pairs, found {}", json_kind(inner))));
            };
            check_wire_len(pairs.len(), path)?;
            pairs
                .iter()
                .enumerate()
                .map(|(i, pair)| {
                    let pair_path = path.index(i);
                    match pair {
                        Json::Array(kv) if kv.len() == 2 => Ok((
                            value_from_json(&kv[0], &pair_path.index(0))?,
                            value_from_json(&kv[1], &pair_path.index(1))?,
                        )),
                        other => Err(pair_path.error(format!(
                            "expected a [key, value] pair, found {}",
                            json_kind(other)
                        ))),
                    }
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::map)
        }
        EXT_TAG => {
            let Json::Array(parts) = inner else {
                return Err(path.error("expected [type, base64 data]"));
            };
            let [type_id, data] = parts.as_slice() else {
                return Err(path.error("expected [type, base64 data]"));
            };
            let type_id = type_id
                .as_i64()
                .and_then(|t| i8::try_from(t).ok())
                .ok_or_else(|| path.index(0).error("extension type must be an integer in -128..=127"))?;
            let data = base64_from_json(data, &path.index(1))?;
            Ok(Value::Extension(Extension { type_id, data }, LenFormat::Canonical))
        }
        other => Err(path.error(format!("unknown tag {other:?}"))),
    }
}

fn base64_from_json(json: &Json, path: &Path<'_>) -> Result<Vec<u8>, TextFormatError> {
    let Json::String(encoded) = json else {
        return Err(path.error(format!("expected a base64 string, found {}", json_kind(json))));
    };
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| path.error(format!("invalid base64: {e}")))?;
    check_wire_len(bytes.len(), path)?;
    Ok(bytes)
}

/// Accepts a JSON number or one of `"NaN"`, `"Infinity"`, `"-Infinity"`.
fn float_from_json<F: FromStr>(json: &Json, path: &Path<'_>) -> Result<F, TextFormatError> {
    let literal = match json {
        Json::Number(n) => n.to_string(),
        Json::String(s) => s.clone(),
        other => return Err(path.error(format!("expected a number, found {}", json_kind(other)))),
    };
    literal
        .parse::<F>()
        .map_err(|_| path.error(format!("invalid float {literal:?}")))
}
