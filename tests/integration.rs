//! Integration tests for signalr-hub-codec.
//!
//! These tests build payloads the way a hub client would (rmp-serde for the
//! message arrays, varint framing around them) and drive them through the
//! public API.

use std::collections::HashMap;

use signalr_hub_codec::codec::Value;
use signalr_hub_codec::message::CompletionResult;
use signalr_hub_codec::protocol::{is_handshake_payload, write_frame};
use signalr_hub_codec::{
    from_text, pack, to_text, unpack, CodecConfig, CodecError, DecodeCause, HubCodec,
    MessageShape,
};

type Headers = HashMap<String, String>;

fn frame<T: serde::Serialize>(message: &T) -> Vec<u8> {
    write_frame(&rmp_serde::to_vec(message).unwrap())
}

/// Test full unpack/pack cycle for a Blazor JS-to-.NET invocation.
#[test]
fn test_blazor_invocation_round_trip() {
    let message = (
        1u8,
        Headers::new(),
        None::<String>,
        "BeginInvokeDotNetFromJS",
        ("3", "MyApp", "Increment", 0u8, "[5]"),
    );
    let raw = frame(&message);

    let records = unpack(&raw).unwrap();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.shape(), MessageShape::Invocation);
    assert_eq!(record.invocation_id(), None);
    assert_eq!(record.target(), Some("BeginInvokeDotNetFromJS"));
    let args = record.arguments().unwrap();
    assert_eq!(args.len(), 5);
    assert_eq!(args[2].as_str(), Some("Increment"));

    assert_eq!(pack(&records), raw);
}

/// Test a batch of server-to-client messages in one payload.
#[test]
fn test_mixed_batch() {
    let mut raw = Vec::new();
    raw.extend(frame(&(2u8, Headers::new(), "7", vec![1, 2, 3])));
    raw.extend(frame(&(3u8, Headers::new(), "7", 2u8)));
    raw.extend(frame(&(3u8, Headers::new(), "8", 1u8, "Hub method threw")));
    raw.extend(frame(&(6u8,)));
    raw.extend(frame(&(7u8, Some("Server shutting down"), true)));

    let records = unpack(&raw).unwrap();
    let shapes: Vec<_> = records.iter().map(|r| r.shape()).collect();
    assert_eq!(
        shapes,
        vec![
            MessageShape::StreamItem,
            MessageShape::Completion,
            MessageShape::Completion,
            MessageShape::Ping,
            MessageShape::Close,
        ]
    );

    assert_eq!(
        records[0].item(),
        Some(&Value::array(vec![Value::int(1), Value::int(2), Value::int(3)]))
    );
    assert_eq!(records[1].completion_result(), Some(CompletionResult::Void));
    assert_eq!(
        records[2].completion_result(),
        Some(CompletionResult::Error("Hub method threw"))
    );
    assert_eq!(records[4].close_error(), Some("Server shutting down"));
    assert_eq!(records[4].allow_reconnect(), Some(true));

    assert_eq!(pack(&records), raw);
}

/// Test editing an argument through the text bridge.
#[test]
fn test_edit_through_text() {
    let raw = frame(&(
        1u8,
        Headers::new(),
        Some("12"),
        "DispatchBrowserEvent",
        ("{\"eventName\":\"click\"}", "{}"),
    ));

    let text = to_text(&unpack(&raw).unwrap());
    let edited_text = text.replace("click", "dblclick");
    assert_ne!(text, edited_text);

    let edited = pack(&from_text(&edited_text).unwrap());
    let records = unpack(&edited).unwrap();
    assert_eq!(records[0].shape(), MessageShape::Invocation);
    assert_eq!(records[0].invocation_id(), Some("12"));
    assert_eq!(
        records[0].arguments().unwrap()[0].as_str(),
        Some("{\"eventName\":\"dblclick\"}")
    );
}

/// Test that an edit leaves the encoding of untouched values alone.
#[test]
fn test_edit_keeps_untouched_layout() {
    // Header value "1" written as str8, target as str16, argument as uint32
    let body = [
        0x95, 0x01, 0x81, 0xa1, b'k', 0xd9, 0x01, b'1', 0xc0, 0xda, 0x00, 0x04, b'P', b'i',
        b'n', b'g', 0x92, 0xce, 0x00, 0x00, 0x00, 0x05, 0xa2, b'h', b'i',
    ];
    let raw = write_frame(&body);
    let codec = HubCodec::default();
    let original = codec.unpack(&raw).unwrap();
    assert_eq!(original[0].target(), Some("Ping"));

    let text = codec.to_text(&original);
    assert_eq!(text, r#"[[1,{"k":"1"},null,"Ping",[5,"hi"]]]"#);

    let edited = codec.encode_edit(&original, &text.replace("hi", "yo")).unwrap();
    let mut expected = raw.clone();
    let at = expected.len() - 2;
    expected[at..].copy_from_slice(b"yo");
    assert_eq!(edited, expected);

    assert_eq!(codec.encode_edit(&original, &text).unwrap(), raw);
}

/// Test that unedited text gives back the original bytes for canonical input.
#[test]
fn test_text_round_trip_is_identity_for_canonical_input() {
    let mut raw = frame(&(4u8, Headers::new(), "1", "Counter", (10u8, 500u16)));
    raw.extend(frame(&(5u8, Headers::new(), "1")));

    let codec = HubCodec::default();
    let text = codec.decode_to_text(&raw).unwrap();
    assert_eq!(codec.encode_from_text(&text).unwrap(), raw);
}

/// Test that non-minimal encodings survive unpack/pack untouched.
#[test]
fn test_non_minimal_encodings_preserved() {
    // [uint16 6] as a ping, then [6, str8 "x"] as an opaque record
    let mut raw = write_frame(&[0x91, 0xcd, 0x00, 0x06]);
    raw.extend(write_frame(&[0x92, 0x06, 0xd9, 0x01, b'x']));

    let records = unpack(&raw).unwrap();
    assert_eq!(records[0].shape(), MessageShape::Ping);
    assert!(records[1].is_opaque());
    assert_eq!(pack(&records), raw);
}

/// Test decoding a payload that arrives in fragments.
#[test]
fn test_fragmented_payload() {
    let mut raw = frame(&(1u8, Headers::new(), Some("1"), "Echo", ("a fairly long argument",)));
    raw.extend(frame(&(6u8,)));
    let mut stream = HubCodec::default().stream_unpacker();

    // Push prefix and body in parts
    assert!(stream.push(&raw[..1]).unwrap().is_empty());
    let mid = raw.len() / 2;
    assert!(stream.push(&raw[1..mid]).unwrap().is_empty());

    // Final part completes both frames
    let records = stream.push(&raw[mid..]).unwrap();
    assert!(stream.is_at_frame_boundary());
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].target(), Some("Echo"));
    assert_eq!(records[1].shape(), MessageShape::Ping);
    assert_eq!(pack(&records), raw);
}

/// Test that a corrupt frame fails the whole payload.
#[test]
fn test_corrupt_frame_fails_payload() {
    let mut raw = frame(&(6u8,));
    raw.extend(write_frame(&[0x92, 0x06, 0xc1]));
    raw.extend(frame(&(6u8,)));

    let err = unpack(&raw).unwrap_err();
    assert_eq!(err.frame_index, 1);
    assert!(matches!(err.cause, DecodeCause::Value(_)));
}

/// Test that handshake records are told apart from binary payloads.
#[test]
fn test_handshake_then_binary() {
    let handshake = b"{\"protocol\":\"blazorpack\",\"version\":1}\x1e";
    assert!(is_handshake_payload(handshake));

    let ping = frame(&(6u8,));
    assert!(!is_handshake_payload(&ping));
    assert_eq!(unpack(&ping).unwrap()[0].shape(), MessageShape::Ping);
}

/// Test codec configured from JSON.
#[test]
fn test_codec_from_json_config() {
    let config = CodecConfig::from_json(r#"{ "maxFrameLen": 8, "prettyText": true }"#).unwrap();
    let codec = HubCodec::new(config);

    let big = frame(&(1u8, Headers::new(), None::<String>, "LongTargetName", ()));
    let err = codec.decode_to_text(&big).unwrap_err();
    assert!(matches!(err, CodecError::Decode(_)));

    let text = codec.decode_to_text(&frame(&(6u8,))).unwrap();
    assert!(text.contains('\n'));

    assert!(CodecConfig::from_json(r#"{ "maxFrames": 1 }"#).is_err());
}
