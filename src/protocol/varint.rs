//! Varint length-prefix framing.
//!
//! Every hub message on the binary transport is preceded by its length:
//! ```text
//! ┌───────────────────────┬──────────────────────┐
//! │ Length (1-5 bytes)    │ Body (Length bytes)  │
//! │ 7 bits/byte, LSB first│ one MessagePack array│
//! │ high bit = more bytes │                      │
//! └───────────────────────┴──────────────────────┘
//! ```
//!
//! Frames follow each other with no separator.

use crate::config::DEFAULT_MAX_FRAME_LEN;
use crate::error::FramingError;

/// Longest length prefix the transport produces (enough for 2^31 - 1).
pub const MAX_PREFIX_LEN: usize = 5;

const CONTINUATION: u8 = 0x80;
const PAYLOAD_BITS: u8 = 0x7f;

/// Append the minimal varint encoding of `len`.
pub fn encode_varint(len: usize, out: &mut Vec<u8>) {
    let mut rest = len;
    loop {
        let group = (rest & PAYLOAD_BITS as usize) as u8;
        rest >>= 7;
        if rest == 0 {
            out.push(group);
            return;
        }
        out.push(group | CONTINUATION);
    }
}

/// Append `len` as a varint at least `width` bytes long.
///
/// Extra bytes are empty continuation groups, the form some encoders emit
/// for fixed-width prefixes. Widths the value already needs, or that exceed
/// [`MAX_PREFIX_LEN`], give the minimal encoding.
pub fn encode_varint_padded(len: usize, width: usize, out: &mut Vec<u8>) {
    let start = out.len();
    encode_varint(len, out);
    let written = out.len() - start;
    if written >= width || width > MAX_PREFIX_LEN {
        return;
    }
    let last = out.len() - 1;
    out[last] |= CONTINUATION;
    out.extend(std::iter::repeat(CONTINUATION).take(width - written - 1));
    out.push(0);
}

/// Decode a varint at `offset`.
///
/// Returns the value and the offset of the first byte after the prefix.
/// Non-minimal prefixes (trailing `0x80` groups) are accepted.
pub fn decode_varint(buf: &[u8], offset: usize) -> Result<(u64, usize), FramingError> {
    let mut value: u64 = 0;
    for i in 0..MAX_PREFIX_LEN {
        let Some(&byte) = buf.get(offset + i) else {
            return Err(FramingError::TruncatedPrefix { offset });
        };
        value |= ((byte & PAYLOAD_BITS) as u64) << (7 * i);
        if byte & CONTINUATION == 0 {
            return Ok((value, offset + i + 1));
        }
    }
    Err(FramingError::PrefixTooLong {
        offset,
        max: MAX_PREFIX_LEN,
    })
}

/// Read one frame at `offset` using the transport's default size limit.
///
/// Returns the body slice and the offset of the next frame.
///
/// # Example
///
/// ```
/// use signalr_hub_codec::protocol::{read_frame, write_frame};
///
/// let framed = write_frame(&[0x91, 0x06]);
/// assert_eq!(framed, vec![0x02, 0x91, 0x06]);
///
/// let (body, next) = read_frame(&framed, 0).unwrap();
/// assert_eq!(body, &[0x91, 0x06]);
/// assert_eq!(next, 3);
/// ```
pub fn read_frame(buf: &[u8], offset: usize) -> Result<(&[u8], usize), FramingError> {
    read_frame_with_limit(buf, offset, DEFAULT_MAX_FRAME_LEN)
}

/// Like [`read_frame`] with an explicit body size limit.
pub fn read_frame_with_limit(
    buf: &[u8],
    offset: usize,
    max_len: usize,
) -> Result<(&[u8], usize), FramingError> {
    let (len, body_start) = decode_varint(buf, offset)?;
    let len = checked_len(len, offset, max_len)?;

    let available = buf.len().saturating_sub(body_start);
    if len > available {
        return Err(FramingError::TruncatedBody {
            offset: body_start,
            len,
            available,
        });
    }

    let body_end = body_start + len;
    Ok((&buf[body_start..body_end], body_end))
}

pub(crate) fn checked_len(len: u64, offset: usize, max_len: usize) -> Result<usize, FramingError> {
    match usize::try_from(len) {
        Ok(len) if len <= max_len => Ok(len),
        _ => Err(FramingError::LengthOverflow {
            offset,
            len,
            max: max_len,
        }),
    }
}

/// Prefix `body` with its length.
pub fn write_frame(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_PREFIX_LEN + body.len());
    write_frame_into(&mut out, body);
    out
}

/// Append a framed `body` to `out`.
pub fn write_frame_into(out: &mut Vec<u8>, body: &[u8]) {
    encode_varint(body.len(), out);
    out.extend_from_slice(body);
}

/// Like [`write_frame_into`] with the prefix padded to `prefix_len` bytes.
pub fn write_frame_padded(out: &mut Vec<u8>, body: &[u8], prefix_len: usize) {
    encode_varint_padded(body.len(), prefix_len, out);
    out.extend_from_slice(body);
}
