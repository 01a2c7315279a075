//! MessagePack value encoder.
//!
//! Each value is written with its layout hint when the hint still fits and
//! with the smallest tag otherwise. Encoding only fails on lengths past the
//! 32-bit MessagePack limit, and does so by panicking.

use rmp::Marker;

use super::value::{Extension, IntFormat, LenFormat, Value};

/// Encode a value to bytes.
///
/// # Panics
///
/// Panics if a string, binary, extension, array or map is longer than
/// `u32::MAX`, which MessagePack cannot frame. Values from the decoder and
/// from the text parser never are.
///
/// # Example
///
/// ```
/// use signalr_hub_codec::codec::{encode_value, Value};
///
/// let bytes = encode_value(&Value::array(vec![Value::int(6)]));
/// assert_eq!(bytes, vec![0x91, 0x06]);
/// ```
pub fn encode_value(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, value);
    out
}

/// Append the encoding of `value` to `out`.
pub fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Nil => write_marker(out, Marker::Null),
        Value::Boolean(true) => write_marker(out, Marker::True),
        Value::Boolean(false) => write_marker(out, Marker::False),
        Value::Integer(i, fmt) => write_int(out, i.get(), *fmt),
        Value::Float32(f) => {
            write_marker(out, Marker::F32);
            out.extend_from_slice(&f.to_bits().to_be_bytes());
        }
        Value::Float64(f) => {
            write_marker(out, Marker::F64);
            out.extend_from_slice(&f.to_bits().to_be_bytes());
        }
        Value::String(s, fmt) => write_str_bytes(out, s.as_bytes(), *fmt),
        Value::Binary(bin, fmt) if bin.invalid_utf8 => write_str_bytes(out, &bin.bytes, *fmt),
        Value::Binary(bin, fmt) => {
            let len = bin.bytes.len();
            match bin_format(len, *fmt) {
                LenFormat::L8 => {
                    write_marker(out, Marker::Bin8);
                    out.push(len as u8);
                }
                LenFormat::L16 => {
                    write_marker(out, Marker::Bin16);
                    out.extend_from_slice(&(len as u16).to_be_bytes());
                }
                _ => {
                    write_marker(out, Marker::Bin32);
                    out.extend_from_slice(&len_u32(len).to_be_bytes());
                }
            }
            out.extend_from_slice(&bin.bytes);
        }
        Value::Array(items, fmt) => write_array(out, items, *fmt),
        Value::Map(pairs, fmt) => {
            write_container_len(out, pairs.len(), *fmt, ContainerKind::Map);
            for (k, v) in pairs {
                write_value(out, k);
                write_value(out, v);
            }
        }
        Value::Extension(ext, fmt) => write_ext(out, ext, *fmt),
    }
}

/// Append an array built from a borrowed slice. Lets the packer write a
/// record's fields without cloning them into a `Value::Array`.
pub fn write_array(out: &mut Vec<u8>, items: &[Value], fmt: LenFormat) {
    write_container_len(out, items.len(), fmt, ContainerKind::Array);
    for item in items {
        write_value(out, item);
    }
}

#[inline]
fn write_marker(out: &mut Vec<u8>, marker: Marker) {
    out.push(marker.to_u8());
}

#[inline]
fn len_u32(len: usize) -> u32 {
    match u32::try_from(len) {
        Ok(len) => len,
        Err(_) => panic!("length {len} exceeds the 4 GiB MessagePack limit"),
    }
}

fn write_int(out: &mut Vec<u8>, v: i128, hint: IntFormat) {
    let fmt = if hint.fits(v) {
        hint
    } else {
        IntFormat::canonical_for(v)
    };
    // `fmt` fits `v`, so every narrowing cast below is lossless.
    match fmt {
        IntFormat::FixPos => write_marker(out, Marker::FixPos(v as u8)),
        IntFormat::FixNeg => write_marker(out, Marker::FixNeg(v as i8)),
        IntFormat::U8 => {
            write_marker(out, Marker::U8);
            out.push(v as u8);
        }
        IntFormat::U16 => {
            write_marker(out, Marker::U16);
            out.extend_from_slice(&(v as u16).to_be_bytes());
        }
        IntFormat::U32 => {
            write_marker(out, Marker::U32);
            out.extend_from_slice(&(v as u32).to_be_bytes());
        }
        IntFormat::U64 | IntFormat::Canonical => {
            write_marker(out, Marker::U64);
            out.extend_from_slice(&(v as u64).to_be_bytes());
        }
        IntFormat::I8 => {
            write_marker(out, Marker::I8);
            out.push(v as i8 as u8);
        }
        IntFormat::I16 => {
            write_marker(out, Marker::I16);
            out.extend_from_slice(&(v as i16).to_be_bytes());
        }
        IntFormat::I32 => {
            write_marker(out, Marker::I32);
            out.extend_from_slice(&(v as i32).to_be_bytes());
        }
        IntFormat::I64 => {
            write_marker(out, Marker::I64);
            out.extend_from_slice(&(v as i64).to_be_bytes());
        }
    }
}

fn write_str_bytes(out: &mut Vec<u8>, bytes: &[u8], hint: LenFormat) {
    let len = bytes.len();
    let fmt = match hint {
        LenFormat::Fix if len <= 31 => LenFormat::Fix,
        LenFormat::L8 if len <= u8::MAX as usize => LenFormat::L8,
        LenFormat::L16 if len <= u16::MAX as usize => LenFormat::L16,
        LenFormat::L32 => LenFormat::L32,
        _ if len <= 31 => LenFormat::Fix,
        _ if len <= u8::MAX as usize => LenFormat::L8,
        _ if len <= u16::MAX as usize => LenFormat::L16,
        _ => LenFormat::L32,
    };
    match fmt {
        LenFormat::Fix => write_marker(out, Marker::FixStr(len as u8)),
        LenFormat::L8 => {
            write_marker(out, Marker::Str8);
            out.push(len as u8);
        }
        LenFormat::L16 => {
            write_marker(out, Marker::Str16);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
        _ => {
            write_marker(out, Marker::Str32);
            out.extend_from_slice(&len_u32(len).to_be_bytes());
        }
    }
    out.extend_from_slice(bytes);
}

fn bin_format(len: usize, hint: LenFormat) -> LenFormat {
    match hint {
        LenFormat::L8 if len <= u8::MAX as usize => LenFormat::L8,
        LenFormat::L16 if len <= u16::MAX as usize => LenFormat::L16,
        LenFormat::L32 => LenFormat::L32,
        _ if len <= u8::MAX as usize => LenFormat::L8,
        _ if len <= u16::MAX as usize => LenFormat::L16,
        _ => LenFormat::L32,
    }
}

#[derive(Clone, Copy)]
enum ContainerKind {
    Array,
    Map,
}

fn write_container_len(out: &mut Vec<u8>, len: usize, hint: LenFormat, kind: ContainerKind) {
    let fmt = match hint {
        LenFormat::Fix if len <= 15 => LenFormat::Fix,
        LenFormat::L16 if len <= u16::MAX as usize => LenFormat::L16,
        LenFormat::L32 => LenFormat::L32,
        _ if len <= 15 => LenFormat::Fix,
        _ if len <= u16::MAX as usize => LenFormat::L16,
        _ => LenFormat::L32,
    };
    let (fix, l16, l32) = match kind {
        ContainerKind::Array => (Marker::FixArray(len as u8), Marker::Array16, Marker::Array32),
        ContainerKind::Map => (Marker::FixMap(len as u8), Marker::Map16, Marker::Map32),
    };
    match fmt {
        LenFormat::Fix => write_marker(out, fix),
        LenFormat::L16 => {
            write_marker(out, l16);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
        _ => {
            write_marker(out, l32);
            out.extend_from_slice(&len_u32(len).to_be_bytes());
        }
    }
}

fn write_ext(out: &mut Vec<u8>, ext: &Extension, hint: LenFormat) {
    let len = ext.data.len();
    let fixed = match len {
        1 => Some(Marker::FixExt1),
        2 => Some(Marker::FixExt2),
        4 => Some(Marker::FixExt4),
        8 => Some(Marker::FixExt8),
        16 => Some(Marker::FixExt16),
        _ => None,
    };
    let fmt = match (hint, fixed) {
        (LenFormat::Fix, Some(_)) => LenFormat::Fix,
        (LenFormat::L8, _) if len <= u8::MAX as usize => LenFormat::L8,
        (LenFormat::L16, _) if len <= u16::MAX as usize => LenFormat::L16,
        (LenFormat::L32, _) => LenFormat::L32,
        (_, Some(_)) => LenFormat::Fix,
        _ if len <= u8::MAX as usize => LenFormat::L8,
        _ if len <= u16::MAX as usize => LenFormat::L16,
        _ => LenFormat::L32,
    };
    match (fmt, fixed) {
        (LenFormat::Fix, Some(marker)) => write_marker(out, marker),
        (LenFormat::L8, _) => {
            write_marker(out, Marker::Ext8);
            out.push(len as u8);
        }
        (LenFormat::L16, _) => {
            write_marker(out, Marker::Ext16);
            out.extend_from_slice(&(len as u16).to_be_bytes());
        }
        _ => {
            write_marker(out, Marker::Ext32);
            out.extend_from_slice(&len_u32(len).to_be_bytes());
        }
    }
    out.push(ext.type_id as u8);
    out.extend_from_slice(&ext.data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_value;
    use crate::codec::value::{Binary, Integer};

    fn int_with(v: i64, fmt: IntFormat) -> Value {
        Value::Integer(Integer::from(v), fmt)
    }

    #[test]
    fn test_canonical_integers_match_rmp_serde() {
        for v in [0i64, 1, 127, 128, 255, 256, 65_535, 65_536, -1, -32, -33, -128, -129, i64::MIN, i64::MAX] {
            let expected = rmp_serde::to_vec(&v).unwrap();
            assert_eq!(encode_value(&Value::int(v)), expected, "value {v}");
        }
        let expected = rmp_serde::to_vec(&u64::MAX).unwrap();
        assert_eq!(encode_value(&Value::int(u64::MAX)), expected);
    }

    #[test]
    fn test_hint_reused_when_it_fits() {
        assert_eq!(encode_value(&int_with(5, IntFormat::I32)), vec![0xd2, 0, 0, 0, 5]);
        assert_eq!(encode_value(&int_with(5, IntFormat::U8)), vec![0xcc, 5]);
    }

    #[test]
    fn test_hint_dropped_when_value_outgrows_it() {
        // Was fixint, edited to 300
        assert_eq!(
            encode_value(&int_with(300, IntFormat::FixPos)),
            vec![0xcd, 0x01, 0x2c]
        );
        // Was uint8, edited to a negative number
        assert_eq!(encode_value(&int_with(-1, IntFormat::U8)), vec![0xff]);
    }

    #[test]
    fn test_strings() {
        assert_eq!(encode_value(&Value::string("Foo")), vec![0xa3, b'F', b'o', b'o']);

        let long = "x".repeat(40);
        let bytes = encode_value(&Value::string(long.clone()));
        assert_eq!(&bytes[..2], &[0xd9, 40]);
        assert_eq!(bytes, rmp_serde::to_vec(&long).unwrap());

        let hinted = Value::String("hi".into(), LenFormat::L16);
        assert_eq!(encode_value(&hinted), vec![0xda, 0, 2, b'h', b'i']);
    }

    #[test]
    fn test_binary() {
        assert_eq!(encode_value(&Value::binary(vec![1, 2])), vec![0xc4, 2, 1, 2]);

        let flagged = Value::Binary(
            Binary {
                bytes: vec![0xc3, 0x28],
                invalid_utf8: true,
            },
            LenFormat::Fix,
        );
        assert_eq!(encode_value(&flagged), vec![0xa2, 0xc3, 0x28]);
    }

    #[test]
    fn test_containers() {
        let value = Value::array(vec![
            Value::int(1),
            Value::empty_map(),
            Value::Nil,
            Value::string("Foo"),
            Value::array(vec![Value::int(42)]),
        ]);
        assert_eq!(
            encode_value(&value),
            vec![0x95, 0x01, 0x80, 0xc0, 0xa3, b'F', b'o', b'o', 0x91, 0x2a]
        );

        let big: Vec<Value> = (0..16).map(Value::int).collect();
        let bytes = encode_value(&Value::array(big));
        assert_eq!(&bytes[..3], &[0xdc, 0x00, 0x10]);
    }

    #[test]
    fn test_floats() {
        assert_eq!(
            encode_value(&Value::Float32(1.5)),
            vec![0xca, 0x3f, 0xc0, 0x00, 0x00]
        );
        assert_eq!(
            encode_value(&Value::Float64(1.5)),
            rmp_serde::to_vec(&1.5f64).unwrap()
        );
    }

    #[test]
    fn test_extension_formats() {
        assert_eq!(encode_value(&Value::ext(5, vec![0xaa])), vec![0xd4, 5, 0xaa]);
        assert_eq!(
            encode_value(&Value::ext(-1, vec![1, 2, 3])),
            vec![0xc7, 3, 0xff, 1, 2, 3]
        );
        let hinted = Value::Extension(
            Extension {
                type_id: 1,
                data: vec![9; 4],
            },
            LenFormat::L8,
        );
        assert_eq!(encode_value(&hinted), vec![0xc7, 4, 1, 9, 9, 9, 9]);
    }

    #[test]
    fn test_non_minimal_input_reencodes_identically() {
        let inputs: [&[u8]; 6] = [
            &[0xd0, 0x05],
            &[0xcf, 0, 0, 0, 0, 0, 0, 0, 1],
            &[0xdb, 0, 0, 0, 1, b'a'],
            &[0xdd, 0, 0, 0, 1, 0xc0],
            &[0xde, 0, 1, 0xc0, 0xc0],
            &[0xc6, 0, 0, 0, 1, 0x07],
        ];
        for input in inputs {
            let (value, _) = decode_value(input, 0).unwrap();
            assert_eq!(encode_value(&value), input, "input {input:02x?}");
        }
    }

    #[test]
    fn test_len_at_u32_limit() {
        assert_eq!(len_u32(u32::MAX as usize), u32::MAX);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    #[should_panic(expected = "exceeds the 4 GiB MessagePack limit")]
    fn test_len_past_u32_limit_panics() {
        len_u32(u32::MAX as usize + 1);
    }
}
