//! MessagePack value decoder.
//!
//! Offsets are absolute positions in the slice passed in, so callers can
//! decode a frame body in place and get errors that point into the
//! original payload.

use rmp::Marker;

use super::value::{Binary, Extension, IntFormat, Integer, LenFormat, Value};
use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::ValueError;

/// Decode one value starting at `offset`.
///
/// Returns the value and the offset just past it. Bytes after the value are
/// left alone.
///
/// # Example
///
/// ```
/// use signalr_hub_codec::codec::{decode_value, Value};
///
/// let (value, next) = decode_value(&[0x92, 0x06, 0xc0], 0).unwrap();
/// assert_eq!(value, Value::array(vec![Value::int(6), Value::Nil]));
/// assert_eq!(next, 3);
/// ```
pub fn decode_value(buf: &[u8], offset: usize) -> Result<(Value, usize), ValueError> {
    decode_value_with_depth(buf, offset, DEFAULT_MAX_DEPTH)
}

/// Like [`decode_value`] with an explicit nesting limit.
pub fn decode_value_with_depth(
    buf: &[u8],
    offset: usize,
    max_depth: usize,
) -> Result<(Value, usize), ValueError> {
    let mut reader = Reader {
        buf,
        pos: offset,
        max_depth,
    };
    let value = reader.read_value(0)?;
    Ok((value, reader.pos))
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    max_depth: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ValueError> {
        if self.remaining() < n {
            return Err(ValueError::Truncated {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], ValueError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8, ValueError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, ValueError> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    fn read_u32(&mut self) -> Result<u32, ValueError> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    fn read_u64(&mut self) -> Result<u64, ValueError> {
        Ok(u64::from_be_bytes(self.take_array()?))
    }

    /// Reject element counts that cannot possibly fit in what is left, before
    /// allocating for them. Every element takes at least one byte.
    fn check_count(&self, count: usize, bytes_per_item: usize) -> Result<(), ValueError> {
        let needed = count.saturating_mul(bytes_per_item);
        if needed > self.remaining() {
            return Err(ValueError::Truncated {
                offset: self.pos,
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    fn read_value(&mut self, depth: usize) -> Result<Value, ValueError> {
        let start = self.pos;
        let tag = self.read_u8()?;

        let int = |v: i128, fmt: IntFormat| Value::Integer(Integer(v), fmt);

        let value = match Marker::from_u8(tag) {
            Marker::Null => Value::Nil,
            Marker::True => Value::Boolean(true),
            Marker::False => Value::Boolean(false),

            Marker::FixPos(v) => int(v as i128, IntFormat::FixPos),
            Marker::FixNeg(v) => int(v as i128, IntFormat::FixNeg),
            Marker::U8 => int(self.read_u8()? as i128, IntFormat::U8),
            Marker::U16 => int(self.read_u16()? as i128, IntFormat::U16),
            Marker::U32 => int(self.read_u32()? as i128, IntFormat::U32),
            Marker::U64 => int(self.read_u64()? as i128, IntFormat::U64),
            Marker::I8 => int(self.read_u8()? as i8 as i128, IntFormat::I8),
            Marker::I16 => int(self.read_u16()? as i16 as i128, IntFormat::I16),
            Marker::I32 => int(self.read_u32()? as i32 as i128, IntFormat::I32),
            Marker::I64 => int(self.read_u64()? as i64 as i128, IntFormat::I64),

            Marker::F32 => Value::Float32(f32::from_bits(self.read_u32()?)),
            Marker::F64 => Value::Float64(f64::from_bits(self.read_u64()?)),

            Marker::FixStr(len) => self.read_str(len as usize, LenFormat::Fix, start)?,
            Marker::Str8 => {
                let len = self.read_u8()? as usize;
                self.read_str(len, LenFormat::L8, start)?
            }
            Marker::Str16 => {
                let len = self.read_u16()? as usize;
                self.read_str(len, LenFormat::L16, start)?
            }
            Marker::Str32 => {
                let len = self.read_u32()? as usize;
                self.read_str(len, LenFormat::L32, start)?
            }

            Marker::Bin8 => {
                let len = self.read_u8()? as usize;
                Value::Binary(Binary::new(self.take(len)?), LenFormat::L8)
            }
            Marker::Bin16 => {
                let len = self.read_u16()? as usize;
                Value::Binary(Binary::new(self.take(len)?), LenFormat::L16)
            }
            Marker::Bin32 => {
                let len = self.read_u32()? as usize;
                Value::Binary(Binary::new(self.take(len)?), LenFormat::L32)
            }

            Marker::FixArray(len) => self.read_array(len as usize, LenFormat::Fix, depth, start)?,
            Marker::Array16 => {
                let len = self.read_u16()? as usize;
                self.read_array(len, LenFormat::L16, depth, start)?
            }
            Marker::Array32 => {
                let len = self.read_u32()? as usize;
                self.read_array(len, LenFormat::L32, depth, start)?
            }

            Marker::FixMap(len) => self.read_map(len as usize, LenFormat::Fix, depth, start)?,
            Marker::Map16 => {
                let len = self.read_u16()? as usize;
                self.read_map(len, LenFormat::L16, depth, start)?
            }
            Marker::Map32 => {
                let len = self.read_u32()? as usize;
                self.read_map(len, LenFormat::L32, depth, start)?
            }

            Marker::FixExt1 => self.read_ext(1, LenFormat::Fix)?,
            Marker::FixExt2 => self.read_ext(2, LenFormat::Fix)?,
            Marker::FixExt4 => self.read_ext(4, LenFormat::Fix)?,
            Marker::FixExt8 => self.read_ext(8, LenFormat::Fix)?,
            Marker::FixExt16 => self.read_ext(16, LenFormat::Fix)?,
            Marker::Ext8 => {
                let len = self.read_u8()? as usize;
                self.read_ext(len, LenFormat::L8)?
            }
            Marker::Ext16 => {
                let len = self.read_u16()? as usize;
                self.read_ext(len, LenFormat::L16)?
            }
            Marker::Ext32 => {
                let len = self.read_u32()? as usize;
                self.read_ext(len, LenFormat::L32)?
            }

            Marker::Reserved => return Err(ValueError::UnknownTag { tag, offset: start }),
        };

        Ok(value)
    }

    fn read_str(&mut self, len: usize, fmt: LenFormat, start: usize) -> Result<Value, ValueError> {
        let bytes = self.take(len)?;
        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(Value::String(s.to_owned(), fmt)),
            Err(e) => {
                tracing::warn!(
                    offset = start,
                    valid_up_to = e.valid_up_to(),
                    "string value is not valid UTF-8, keeping it as binary"
                );
                Ok(Value::Binary(
                    Binary {
                        bytes: bytes.to_vec(),
                        invalid_utf8: true,
                    },
                    fmt,
                ))
            }
        }
    }

    fn enter(&self, depth: usize, start: usize) -> Result<usize, ValueError> {
        if depth >= self.max_depth {
            return Err(ValueError::DepthLimit {
                offset: start,
                max: self.max_depth,
            });
        }
        Ok(depth + 1)
    }

    fn read_array(
        &mut self,
        len: usize,
        fmt: LenFormat,
        depth: usize,
        start: usize,
    ) -> Result<Value, ValueError> {
        let depth = self.enter(depth, start)?;
        self.check_count(len, 1)?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(self.read_value(depth)?);
        }
        Ok(Value::Array(items, fmt))
    }

    fn read_map(
        &mut self,
        len: usize,
        fmt: LenFormat,
        depth: usize,
        start: usize,
    ) -> Result<Value, ValueError> {
        let depth = self.enter(depth, start)?;
        self.check_count(len, 2)?;
        let mut pairs = Vec::with_capacity(len);
        for _ in 0..len {
            let key = self.read_value(depth)?;
            let value = self.read_value(depth)?;
            pairs.push((key, value));
        }
        Ok(Value::Map(pairs, fmt))
    }

    fn read_ext(&mut self, len: usize, fmt: LenFormat) -> Result<Value, ValueError> {
        let type_id = self.read_u8()? as i8;
        let data = self.take(len)?.to_vec();
        Ok(Value::Extension(Extension { type_id, data }, fmt))
    }
}
