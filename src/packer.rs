//! Unpacker and packer: framed payloads to records and back.
//!
//! Decoding is all-or-nothing. A payload either yields every record it
//! contains or a single [`DecodeError`] pointing at the first bad byte.

use crate::codec::{decode_value_with_depth, write_array, Value};
use crate::config::CodecConfig;
use crate::error::{DecodeCause, DecodeError};
use crate::message::{classify_with_format, MessageRecord};
use crate::protocol::{read_frame_with_limit, write_frame_padded, FrameBuffer};

/// Decode a payload with the default [`CodecConfig`].
///
/// # Example
///
/// ```
/// use signalr_hub_codec::{unpack, MessageShape};
///
/// let records = unpack(&[0x02, 0x91, 0x06]).unwrap();
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].shape(), MessageShape::Ping);
/// ```
pub fn unpack(raw: &[u8]) -> Result<Vec<MessageRecord>, DecodeError> {
    unpack_with(raw, &CodecConfig::default())
}

/// Decode a payload into records.
pub fn unpack_with(raw: &[u8], config: &CodecConfig) -> Result<Vec<MessageRecord>, DecodeError> {
    let mut records = Vec::new();
    let mut offset = 0;

    while offset < raw.len() {
        let frame_index = records.len();
        let fail = |cause: DecodeCause| {
            let err = DecodeError::new(frame_index, cause);
            tracing::debug!(error = %err, "payload rejected");
            err
        };

        let (body, next) = read_frame_with_limit(raw, offset, config.max_frame_len)
            .map_err(|e| fail(e.into()))?;
        let body_start = next - body.len();
        let record = decode_body(body, body_start, body_start - offset, config).map_err(fail)?;

        tracing::trace!(
            frame_index,
            offset,
            body_len = body.len(),
            shape = %record.shape(),
            "decoded frame"
        );
        records.push(record);
        offset = next;
    }

    tracing::debug!(bytes = raw.len(), records = records.len(), "unpacked payload");
    Ok(records)
}

/// Decode one frame body. `body_start` is the body's position in the
/// payload or stream; error offsets are reported against it.
fn decode_body(
    body: &[u8],
    body_start: usize,
    prefix_len: usize,
    config: &CodecConfig,
) -> Result<MessageRecord, DecodeCause> {
    let (value, end) =
        decode_value_with_depth(body, 0, config.max_depth).map_err(|e| e.shifted(body_start))?;

    if end != body.len() {
        return Err(DecodeCause::TrailingBytes {
            offset: body_start + end,
            count: body.len() - end,
        });
    }

    match value {
        Value::Array(fields, array_format) => {
            Ok(classify_with_format(fields, array_format).with_prefix_len(prefix_len))
        }
        other => Err(DecodeCause::NotAnArray {
            offset: body_start,
            found: other.kind_name(),
        }),
    }
}

/// Incremental [`unpack_with`] for hooks that see a hub connection as a
/// byte stream.
///
/// A hook below the WebSocket message layer gets large hub messages split
/// over continuation frames, and a long-polling body may be read in several
/// pieces. Push each chunk as it arrives to get the records it completes.
/// Error offsets and frame indices count from the first byte pushed since
/// creation or the last [`reset`](Self::reset).
///
/// # Example
///
/// ```
/// use signalr_hub_codec::{CodecConfig, MessageShape, StreamUnpacker};
///
/// let raw = [0x0a, 0x95, 0x01, 0x80, 0xc0, 0xa3, b'F', b'o', b'o', 0x91, 0x2a];
/// let mut stream = StreamUnpacker::new(CodecConfig::default());
///
/// assert!(stream.push(&raw[..4]).unwrap().is_empty());
/// let records = stream.push(&raw[4..]).unwrap();
/// assert_eq!(records[0].shape(), MessageShape::Invocation);
/// assert!(stream.is_at_frame_boundary());
/// ```
pub struct StreamUnpacker {
    buffer: FrameBuffer,
    config: CodecConfig,
    frame_index: usize,
}

impl StreamUnpacker {
    pub fn new(config: CodecConfig) -> Self {
        Self {
            buffer: FrameBuffer::with_max_frame_len(config.max_frame_len),
            config,
            frame_index: 0,
        }
    }

    /// Push a chunk and decode every frame it completes, in order.
    ///
    /// # Errors
    ///
    /// Fails on the first bad frame, dropping the records completed by the
    /// same chunk. The stream is out of sync afterwards; call
    /// [`reset`](Self::reset) before reusing it.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<MessageRecord>, DecodeError> {
        let frames = self
            .buffer
            .push(chunk)
            .map_err(|e| self.reject(e.into()))?;

        let mut records = Vec::with_capacity(frames.len());
        for frame in frames {
            let record = decode_body(&frame.body, frame.body_start(), frame.prefix_len, &self.config)
                .map_err(|cause| self.reject(cause))?;
            tracing::trace!(
                frame_index = self.frame_index,
                offset = frame.offset,
                body_len = frame.body.len(),
                shape = %record.shape(),
                "decoded streamed frame"
            );
            records.push(record);
            self.frame_index += 1;
        }
        Ok(records)
    }

    /// True when no partial frame is pending.
    pub fn is_at_frame_boundary(&self) -> bool {
        self.buffer.is_at_frame_boundary()
    }

    /// Drop buffered bytes and start counting offsets and frames from zero.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.frame_index = 0;
    }

    fn reject(&self, cause: DecodeCause) -> DecodeError {
        let err = DecodeError::new(self.frame_index, cause);
        tracing::debug!(error = %err, "stream rejected");
        err
    }
}

/// Encode records back into a framed payload, in order.
///
/// Fields and frame prefixes keep their layout hints, so records that came
/// out of [`unpack`] unchanged produce the exact bytes they were read from.
pub fn pack(records: &[MessageRecord]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut body = Vec::new();

    for record in records {
        body.clear();
        write_array(&mut body, record.fields(), record.array_format());
        write_frame_padded(&mut out, &body, record.prefix_len());
    }

    tracing::debug!(records = records.len(), bytes = out.len(), "packed records");
    out
}
