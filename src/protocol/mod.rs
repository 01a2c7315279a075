//! Protocol module - transport framing.
//!
//! This module implements the binary transport's framing:
//! - varint length prefix encoding/decoding
//! - frame buffer for accumulating partial reads
//! - detection of the JSON handshake records that precede binary traffic

mod frame_buffer;
mod varint;

pub use frame_buffer::{Frame, FrameBuffer};
pub use varint::{
    decode_varint, encode_varint, encode_varint_padded, read_frame, read_frame_with_limit,
    write_frame, write_frame_into, write_frame_padded, MAX_PREFIX_LEN,
};

/// Terminator of the JSON handshake records (ASCII record separator).
pub const RECORD_SEPARATOR: u8 = 0x1e;

/// True for a JSON handshake/negotiation record (`{...}` followed by `0x1e`).
///
/// These are exchanged before binary traffic starts and are not framed hub
/// messages, so they must not be passed to [`unpack`](crate::unpack).
///
/// # Example
///
/// ```
/// use signalr_hub_codec::protocol::is_handshake_payload;
///
/// assert!(is_handshake_payload(b"{\"protocol\":\"blazorpack\",\"version\":1}\x1e"));
/// assert!(!is_handshake_payload(&[0x02, 0x91, 0x06]));
/// ```
pub fn is_handshake_payload(payload: &[u8]) -> bool {
    matches!(payload, [b'{', .., b'}', RECORD_SEPARATOR])
}
