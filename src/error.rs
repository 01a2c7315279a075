//! Error types for signalr-hub-codec.
//!
//! Framing and value errors carry absolute byte offsets into the buffer
//! handed to [`unpack`](crate::unpack), or into the stream pushed through a
//! [`StreamUnpacker`](crate::StreamUnpacker). The unpacker wraps them in a
//! [`DecodeError`] that also records which frame failed.

use thiserror::Error;

/// Failure reading a varint length prefix or the body it announces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    /// Buffer ended before a prefix byte with the continuation bit clear.
    #[error("length prefix truncated at offset {offset}")]
    TruncatedPrefix { offset: usize },

    /// Prefix did not terminate within the maximum prefix size.
    #[error("length prefix at offset {offset} is longer than {max} bytes")]
    PrefixTooLong { offset: usize, max: usize },

    /// Announced length is larger than the configured frame limit.
    #[error("frame length {len} at offset {offset} exceeds maximum {max}")]
    LengthOverflow { offset: usize, len: u64, max: usize },

    /// Announced length runs past the end of the buffer.
    #[error("frame body at offset {offset} needs {len} bytes, only {available} available")]
    TruncatedBody {
        offset: usize,
        len: usize,
        available: usize,
    },
}

impl FramingError {
    /// Byte offset the error refers to.
    pub fn offset(&self) -> usize {
        match *self {
            FramingError::TruncatedPrefix { offset }
            | FramingError::PrefixTooLong { offset, .. }
            | FramingError::LengthOverflow { offset, .. }
            | FramingError::TruncatedBody { offset, .. } => offset,
        }
    }
}

/// Failure decoding a single MessagePack value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// Tag byte outside every defined range (only `0xc1`).
    #[error("unknown tag byte 0x{tag:02x} at offset {offset}")]
    UnknownTag { tag: u8, offset: usize },

    /// Value needs more bytes than remain in its frame.
    #[error("value truncated at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Arrays/maps nested deeper than the configured limit.
    #[error("nesting deeper than {max} levels at offset {offset}")]
    DepthLimit { offset: usize, max: usize },
}

impl ValueError {
    /// Byte offset the error refers to.
    pub fn offset(&self) -> usize {
        match *self {
            ValueError::UnknownTag { offset, .. }
            | ValueError::Truncated { offset, .. }
            | ValueError::DepthLimit { offset, .. } => offset,
        }
    }

    /// Move the offset by `by` bytes, for values decoded from a slice that
    /// starts partway into the stream.
    pub(crate) fn shifted(mut self, by: usize) -> Self {
        match &mut self {
            ValueError::UnknownTag { offset, .. }
            | ValueError::Truncated { offset, .. }
            | ValueError::DepthLimit { offset, .. } => *offset += by,
        }
        self
    }
}

/// Underlying reason an [`unpack`](crate::unpack) call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeCause {
    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error(transparent)]
    Value(#[from] ValueError),

    /// Frame body decoded to something other than an array.
    #[error("frame body at offset {offset} is {found}, expected an array")]
    NotAnArray { offset: usize, found: &'static str },

    /// Frame body has bytes left over after its array.
    #[error("{count} trailing bytes after message at offset {offset}")]
    TrailingBytes { offset: usize, count: usize },
}

impl DecodeCause {
    /// Byte offset the cause refers to.
    pub fn offset(&self) -> usize {
        match self {
            DecodeCause::Framing(e) => e.offset(),
            DecodeCause::Value(e) => e.offset(),
            DecodeCause::NotAnArray { offset, .. } | DecodeCause::TrailingBytes { offset, .. } => {
                *offset
            }
        }
    }
}

/// Whole-payload decode failure. No partial record list accompanies it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("decode failed in frame {frame_index} at offset {offset}: {cause}")]
pub struct DecodeError {
    /// Absolute byte offset of the failure.
    pub offset: usize,
    /// Zero-based index of the frame being decoded.
    pub frame_index: usize,
    /// What went wrong.
    #[source]
    pub cause: DecodeCause,
}

impl DecodeError {
    /// Wrap a cause, taking the offset from it.
    pub fn new(frame_index: usize, cause: impl Into<DecodeCause>) -> Self {
        let cause = cause.into();
        Self {
            offset: cause.offset(),
            frame_index,
            cause,
        }
    }
}

/// Malformed textual input to [`from_text`](crate::from_text).
#[derive(Debug, Error)]
pub enum TextFormatError {
    /// Input is not JSON at all.
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    /// JSON is well formed but a node cannot become a record or value.
    /// `path` is a JSON Pointer to the offending node.
    #[error("at '{path}': {reason}")]
    Invalid { path: String, reason: String },
}

impl TextFormatError {
    pub(crate) fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        TextFormatError::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// JSON Pointer of the offending node, when the JSON itself parsed.
    pub fn path(&self) -> Option<&str> {
        match self {
            TextFormatError::Syntax(_) => None,
            TextFormatError::Invalid { path, .. } => Some(path),
        }
    }
}

/// Umbrella error for the combined operations on [`HubCodec`](crate::HubCodec).
#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Text(#[from] TextFormatError),

    /// Codec configuration could not be loaded.
    #[error("invalid codec config: {0}")]
    Config(#[source] serde_json::Error),
}

/// Result type alias using CodecError.
pub type Result<T> = std::result::Result<T, CodecError>;
