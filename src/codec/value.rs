//! Generic MessagePack value tree.
//!
//! Every variable-width variant carries a layout hint recording the tag
//! family it was decoded from. The encoder reuses a hint whenever it can
//! still hold the value, so untouched values re-encode byte for byte, and
//! falls back to the smallest tag otherwise. Hints are ignored by `==`.

use std::fmt;

/// Integer tag family a value was read with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntFormat {
    /// Smallest tag for the value (hand-built or edited values).
    #[default]
    Canonical,
    FixPos,
    FixNeg,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
}

impl IntFormat {
    /// Whether this tag family can hold `value` losslessly.
    pub fn fits(self, value: i128) -> bool {
        let (min, max): (i128, i128) = match self {
            IntFormat::Canonical => return false,
            IntFormat::FixPos => (0, 0x7f),
            IntFormat::FixNeg => (-32, -1),
            IntFormat::U8 => (0, u8::MAX as i128),
            IntFormat::U16 => (0, u16::MAX as i128),
            IntFormat::U32 => (0, u32::MAX as i128),
            IntFormat::U64 => (0, u64::MAX as i128),
            IntFormat::I8 => (i8::MIN as i128, i8::MAX as i128),
            IntFormat::I16 => (i16::MIN as i128, i16::MAX as i128),
            IntFormat::I32 => (i32::MIN as i128, i32::MAX as i128),
            IntFormat::I64 => (i64::MIN as i128, i64::MAX as i128),
        };
        (min..=max).contains(&value)
    }

    /// Smallest tag family for `value`. Non-negative values use the
    /// unsigned families, negative values the signed ones.
    pub fn canonical_for(value: i128) -> IntFormat {
        if value >= 0 {
            [IntFormat::FixPos, IntFormat::U8, IntFormat::U16, IntFormat::U32]
                .into_iter()
                .find(|f| f.fits(value))
                .unwrap_or(IntFormat::U64)
        } else {
            [IntFormat::FixNeg, IntFormat::I8, IntFormat::I16, IntFormat::I32]
                .into_iter()
                .find(|f| f.fits(value))
                .unwrap_or(IntFormat::I64)
        }
    }
}

/// Length-prefix width a string, binary, array, map or extension was read with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LenFormat {
    #[default]
    Canonical,
    /// Length packed into the tag byte (fixstr, fixarray, fixmap, fixext).
    Fix,
    L8,
    L16,
    L32,
}

/// Integer in the MessagePack range `i64::MIN ..= u64::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Integer(pub(crate) i128);

impl Integer {
    /// Smallest representable value.
    pub const MIN: i128 = i64::MIN as i128;
    /// Largest representable value.
    pub const MAX: i128 = u64::MAX as i128;

    /// Returns `None` outside the MessagePack integer range.
    pub fn new(value: i128) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Self(value))
    }

    #[inline]
    pub fn get(self) -> i128 {
        self.0
    }

    pub fn as_i64(self) -> Option<i64> {
        i64::try_from(self.0).ok()
    }

    pub fn as_u64(self) -> Option<u64> {
        u64::try_from(self.0).ok()
    }
}

macro_rules! integer_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Integer {
                #[inline]
                fn from(v: $t) -> Self {
                    Integer(v as i128)
                }
            }
        )*
    };
}

integer_from!(i8, i16, i32, i64, u8, u16, u32, u64);

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Binary {
    pub bytes: Vec<u8>,
    /// Set when the wire carried a string tag whose content was not valid
    /// UTF-8. Such values re-encode with the string tag they came with.
    pub invalid_utf8: bool,
}

impl Binary {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            invalid_utf8: false,
        }
    }
}

/// MessagePack extension value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub type_id: i8,
    pub data: Vec<u8>,
}

/// One decoded MessagePack value.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Integer(Integer, IntFormat),
    Float32(f32),
    Float64(f64),
    String(String, LenFormat),
    Binary(Binary, LenFormat),
    Array(Vec<Value>, LenFormat),
    Map(Vec<(Value, Value)>, LenFormat),
    Extension(Extension, LenFormat),
}

impl Value {
    pub fn int(v: impl Into<Integer>) -> Self {
        Value::Integer(v.into(), IntFormat::Canonical)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into(), LenFormat::Canonical)
    }

    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Binary(Binary::new(bytes), LenFormat::Canonical)
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(items, LenFormat::Canonical)
    }

    pub fn map(pairs: Vec<(Value, Value)>) -> Self {
        Value::Map(pairs, LenFormat::Canonical)
    }

    pub fn empty_map() -> Self {
        Value::map(Vec::new())
    }

    pub fn ext(type_id: i8, data: impl Into<Vec<u8>>) -> Self {
        Value::Extension(
            Extension {
                type_id,
                data: data.into(),
            },
            LenFormat::Canonical,
        )
    }

    /// Short kind name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "a boolean",
            Value::Integer(..) => "an integer",
            Value::Float32(_) | Value::Float64(_) => "a float",
            Value::String(..) => "a string",
            Value::Binary(..) => "binary",
            Value::Array(..) => "an array",
            Value::Map(..) => "a map",
            Value::Extension(..) => "an extension",
        }
    }

    #[inline]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<Integer> {
        match self {
            Value::Integer(i, _) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s, _) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items, _) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(pairs, _) => Some(pairs),
            _ => None,
        }
    }

    /// Drop every layout hint so the value encodes in its smallest form.
    pub fn canonicalize(&mut self) {
        match self {
            Value::Nil | Value::Boolean(_) | Value::Float32(_) | Value::Float64(_) => {}
            Value::Integer(_, fmt) => *fmt = IntFormat::Canonical,
            Value::String(_, fmt) | Value::Binary(_, fmt) | Value::Extension(_, fmt) => {
                *fmt = LenFormat::Canonical
            }
            Value::Array(items, fmt) => {
                *fmt = LenFormat::Canonical;
                items.iter_mut().for_each(Value::canonicalize);
            }
            Value::Map(pairs, fmt) => {
                *fmt = LenFormat::Canonical;
                for (k, v) in pairs {
                    k.canonicalize();
                    v.canonicalize();
                }
            }
        }
    }

    /// Copy layout hints from the value this one was edited from.
    ///
    /// Leaves take the original hint only while they still equal the
    /// original. Arrays and maps take the header hint and pair up their
    /// elements by position, so an edit deep inside a container leaves the
    /// layout of its siblings alone. The encoder drops any adopted header
    /// hint that no longer fits the new length.
    ///
    /// # Example
    ///
    /// ```
    /// use signalr_hub_codec::codec::{encode_value, LenFormat, Value};
    ///
    /// let original = Value::Array(
    ///     vec![Value::String("id".into(), LenFormat::L8), Value::int(42)],
    ///     LenFormat::L16,
    /// );
    /// let mut edited = Value::array(vec![Value::string("id"), Value::int(43)]);
    /// edited.adopt_layout(&original);
    /// assert_eq!(
    ///     encode_value(&edited),
    ///     vec![0xdc, 0x00, 0x02, 0xd9, 0x02, b'i', b'd', 0x2b],
    /// );
    /// ```
    pub fn adopt_layout(&mut self, original: &Value) {
        match (self, original) {
            (Value::Array(items, fmt), Value::Array(orig_items, orig_fmt)) => {
                *fmt = *orig_fmt;
                for (item, orig) in items.iter_mut().zip(orig_items) {
                    item.adopt_layout(orig);
                }
            }
            (Value::Map(pairs, fmt), Value::Map(orig_pairs, orig_fmt)) => {
                *fmt = *orig_fmt;
                for ((k, v), (orig_k, orig_v)) in pairs.iter_mut().zip(orig_pairs) {
                    k.adopt_layout(orig_k);
                    v.adopt_layout(orig_v);
                }
            }
            (Value::Integer(v, fmt), Value::Integer(orig, orig_fmt)) if *v == *orig => {
                *fmt = *orig_fmt
            }
            (Value::String(v, fmt), Value::String(orig, orig_fmt)) if *v == *orig => {
                *fmt = *orig_fmt
            }
            (Value::Binary(v, fmt), Value::Binary(orig, orig_fmt)) if *v == *orig => {
                *fmt = *orig_fmt
            }
            (Value::Extension(v, fmt), Value::Extension(orig, orig_fmt)) if *v == *orig => {
                *fmt = *orig_fmt
            }
            _ => {}
        }
    }
}

// Floats compare by bit pattern so NaN payloads and signed zeros count as
// distinct wire values.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a, _), Value::Integer(b, _)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a, _), Value::String(b, _)) => a == b,
            (Value::Binary(a, _), Value::Binary(b, _)) => a == b,
            (Value::Array(a, _), Value::Array(b, _)) => a == b,
            (Value::Map(a, _), Value::Map(b, _)) => a == b,
            (Value::Extension(a, _), Value::Extension(b, _)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float32(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::string(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::array(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}
