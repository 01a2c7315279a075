//! Frame buffer for accumulating partial reads.
//!
//! Backs [`StreamUnpacker`](crate::StreamUnpacker) for hooks that see a hub
//! connection as a byte stream rather than whole WebSocket messages.
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForPrefix`: varint length prefix not yet terminated
//! - `WaitingForBody`: prefix parsed, need N more body bytes
//!
//! # Example
//!
//! ```
//! use signalr_hub_codec::protocol::{write_frame, FrameBuffer};
//!
//! let framed = write_frame(&[0x91, 0x06]);
//! let mut buffer = FrameBuffer::new();
//!
//! assert!(buffer.push(&framed[..1]).unwrap().is_empty());
//! let frames = buffer.push(&framed[1..]).unwrap();
//! assert_eq!(&frames[0].body[..], &[0x91, 0x06]);
//! assert_eq!(frames[0].prefix_len, 1);
//! ```

use bytes::{Bytes, BytesMut};

use super::varint::{checked_len, decode_varint};
use crate::config::DEFAULT_MAX_FRAME_LEN;
use crate::error::FramingError;

#[derive(Debug, Clone, Copy)]
enum State {
    WaitingForPrefix,
    WaitingForBody {
        remaining: usize,
        offset: usize,
        prefix_len: usize,
    },
}

/// One complete frame taken off the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Stream position of the length prefix.
    pub offset: usize,
    /// Width of the length prefix in bytes.
    pub prefix_len: usize,
    pub body: Bytes,
}

impl Frame {
    /// Stream position of the first body byte.
    #[inline]
    pub fn body_start(&self) -> usize {
        self.offset + self.prefix_len
    }
}

/// Accumulates transport chunks and yields complete frames.
///
/// Offsets in errors count bytes since the buffer was created or cleared.
pub struct FrameBuffer {
    buffer: BytesMut,
    state: State,
    max_frame_len: usize,
    /// Stream position of `buffer[0]`.
    consumed: usize,
}

impl FrameBuffer {
    /// Create a buffer with the transport's default frame limit.
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    /// Create a buffer with a custom frame limit.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8 * 1024),
            state: State::WaitingForPrefix,
            max_frame_len,
            consumed: 0,
        }
    }

    /// Push data and extract every frame completed by it.
    ///
    /// Incomplete trailing data stays buffered for the next push.
    ///
    /// # Errors
    ///
    /// Fails if a prefix is longer than five bytes or announces a body over
    /// the frame limit. The buffer should be cleared after an error.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>, FramingError> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn try_extract_one(&mut self) -> Result<Option<Frame>, FramingError> {
        loop {
            match self.state {
                State::WaitingForPrefix => {
                    let (len, prefix_len) = match decode_varint(&self.buffer, 0) {
                        Ok(decoded) => decoded,
                        Err(FramingError::TruncatedPrefix { .. }) => return Ok(None),
                        Err(FramingError::PrefixTooLong { max, .. }) => {
                            return Err(FramingError::PrefixTooLong {
                                offset: self.consumed,
                                max,
                            })
                        }
                        Err(e) => return Err(e),
                    };
                    let len = checked_len(len, self.consumed, self.max_frame_len)?;

                    let _ = self.buffer.split_to(prefix_len);
                    self.state = State::WaitingForBody {
                        remaining: len,
                        offset: self.consumed,
                        prefix_len,
                    };
                    self.consumed += prefix_len;
                }

                State::WaitingForBody {
                    remaining,
                    offset,
                    prefix_len,
                } => {
                    if self.buffer.len() < remaining {
                        return Ok(None);
                    }
                    let body = self.buffer.split_to(remaining).freeze();
                    self.consumed += remaining;
                    self.state = State::WaitingForPrefix;
                    return Ok(Some(Frame {
                        offset,
                        prefix_len,
                        body,
                    }));
                }
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// True when no partial frame is pending.
    pub fn is_at_frame_boundary(&self) -> bool {
        matches!(self.state, State::WaitingForPrefix) && self.buffer.is_empty()
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForPrefix;
        self.consumed = 0;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::WaitingForPrefix => "WaitingForPrefix",
            State::WaitingForBody { .. } => "WaitingForBody",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
