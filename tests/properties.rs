//! Property tests for round-trip fidelity.

use proptest::collection::vec;
use proptest::prelude::*;

use signalr_hub_codec::codec::{
    decode_value, encode_value, Binary, Extension, IntFormat, Integer, LenFormat, Value,
};
use signalr_hub_codec::protocol::{read_frame, write_frame_into, FrameBuffer};
use signalr_hub_codec::{from_text, from_text_with_layout, pack, to_text, unpack, MessageRecord};

fn arb_int_format() -> impl Strategy<Value = IntFormat> {
    prop_oneof![
        Just(IntFormat::Canonical),
        Just(IntFormat::FixPos),
        Just(IntFormat::FixNeg),
        Just(IntFormat::U8),
        Just(IntFormat::U16),
        Just(IntFormat::U32),
        Just(IntFormat::U64),
        Just(IntFormat::I8),
        Just(IntFormat::I16),
        Just(IntFormat::I32),
        Just(IntFormat::I64),
    ]
}

fn arb_len_format() -> impl Strategy<Value = LenFormat> {
    prop_oneof![
        Just(LenFormat::Canonical),
        Just(LenFormat::Fix),
        Just(LenFormat::L8),
        Just(LenFormat::L16),
        Just(LenFormat::L32),
    ]
}

fn arb_integer() -> impl Strategy<Value = Integer> {
    prop_oneof![
        any::<i64>().prop_map(Integer::from),
        any::<u64>().prop_map(Integer::from),
        (-40i64..300).prop_map(Integer::from),
    ]
}

/// Leaves. Floats are finite so the text property can share the strategy.
fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Nil),
        any::<bool>().prop_map(Value::Boolean),
        (arb_integer(), arb_int_format()).prop_map(|(i, f)| Value::Integer(i, f)),
        any::<f32>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(Value::Float32),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(Value::Float64),
        (".{0,40}", arb_len_format()).prop_map(|(s, f)| Value::String(s, f)),
        (vec(any::<u8>(), 0..48), arb_len_format())
            .prop_map(|(b, f)| Value::Binary(Binary::new(b), f)),
        (any::<i8>(), vec(any::<u8>(), 0..20), arb_len_format()).prop_map(|(t, d, f)| {
            Value::Extension(
                Extension {
                    type_id: t,
                    data: d,
                },
                f,
            )
        }),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            (vec(inner.clone(), 0..8), arb_len_format()).prop_map(|(v, f)| Value::Array(v, f)),
            (vec((inner.clone(), inner), 0..6), arb_len_format())
                .prop_map(|(p, f)| Value::Map(p, f)),
        ]
    })
}

/// Field lists that sometimes match a hub shape and sometimes don't.
fn arb_fields() -> impl Strategy<Value = Vec<Value>> {
    prop_oneof![
        vec(arb_value(), 0..6),
        (proptest::option::of("[a-z0-9]{1,4}"), "[A-Za-z]{1,12}", vec(arb_value(), 0..4)).prop_map(
            |(id, target, args)| {
                MessageRecord::invocation(id.as_deref(), &target, args).into_fields()
            }
        ),
    ]
}

proptest! {
    #[test]
    fn prop_value_reencodes_identically(value in arb_value()) {
        let bytes = encode_value(&value);
        let (decoded, end) = decode_value(&bytes, 0).unwrap();
        prop_assert_eq!(end, bytes.len());
        prop_assert_eq!(&decoded, &value);
        prop_assert_eq!(encode_value(&decoded), bytes);
    }

    #[test]
    fn prop_unpack_pack_identity(batch in vec(arb_fields(), 1..5)) {
        let records: Vec<_> = batch.into_iter().map(MessageRecord::from_fields).collect();
        let raw = pack(&records);

        let decoded = unpack(&raw).unwrap();
        prop_assert_eq!(&decoded, &records);
        prop_assert_eq!(pack(&decoded), raw);
    }

    #[test]
    fn prop_accepted_bytes_round_trip(raw in vec(any::<u8>(), 0..64)) {
        if let Ok(records) = unpack(&raw) {
            prop_assert_eq!(pack(&records), raw);
        }
    }

    #[test]
    fn prop_text_round_trip(batch in vec(arb_fields(), 1..4)) {
        let records = unpack(&pack(
            &batch.into_iter().map(MessageRecord::from_fields).collect::<Vec<_>>(),
        ))
        .unwrap();

        let text = to_text(&records);
        let parsed = from_text(&text).unwrap();
        prop_assert_eq!(parsed, records);
    }

    #[test]
    fn prop_unedited_text_with_layout_is_identity(batch in vec(arb_fields(), 1..4)) {
        let raw = pack(&batch.into_iter().map(MessageRecord::from_fields).collect::<Vec<_>>());
        let records = unpack(&raw).unwrap();

        let parsed = from_text_with_layout(&to_text(&records), &records).unwrap();
        prop_assert_eq!(pack(&parsed), raw);
    }

    #[test]
    fn prop_frame_buffer_matches_read_frame(
        bodies in vec(vec(any::<u8>(), 0..300), 1..6),
        chunk in 1usize..64,
    ) {
        let mut raw = Vec::new();
        for body in &bodies {
            write_frame_into(&mut raw, body);
        }

        let mut buffer = FrameBuffer::new();
        let mut streamed = Vec::new();
        for part in raw.chunks(chunk) {
            streamed.extend(buffer.push(part).unwrap());
        }
        prop_assert!(buffer.is_at_frame_boundary());

        let mut offset = 0;
        for frame in &streamed {
            let (body, next) = read_frame(&raw, offset).unwrap();
            prop_assert_eq!(frame.offset, offset);
            prop_assert_eq!(&frame.body[..], body);
            offset = next;
        }
        prop_assert_eq!(offset, raw.len());
    }
}
