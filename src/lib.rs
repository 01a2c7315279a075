//! # signalr-hub-codec
//!
//! Editable codec for the SignalR / Blazor Server binary hub protocol
//! ("blazorpack").
//!
//! This crate lets a tool sitting between browser and server turn each
//! binary WebSocket payload into hub message records, show them as JSON
//! text, and encode edited text back into a payload the server accepts.
//!
//! ## Architecture
//!
//! - **Framing** ([`protocol`]): varint length prefix per message, plus
//!   [`StreamUnpacker`] for hooks that see frames split across chunks
//! - **Values** ([`codec`]): MessagePack value tree with layout hints, so
//!   unmodified input re-encodes byte for byte
//! - **Messages** ([`message`]): shape classification with typed accessors
//! - **Text** ([`text`]): JSON bridge for hand editing; edits keep the
//!   layout of every value they leave alone
//!
//! ## Example
//!
//! ```
//! use signalr_hub_codec::{pack, to_text, unpack, HubCodec, MessageShape};
//!
//! // [1, {}, nil, str16 "Foo", [42]]
//! let raw = [0x0c, 0x95, 0x01, 0x80, 0xc0, 0xda, 0x00, 0x03, b'F', b'o', b'o', 0x91, 0x2a];
//! let records = unpack(&raw).unwrap();
//! assert_eq!(records[0].shape(), MessageShape::Invocation);
//! assert_eq!(pack(&records), raw);
//!
//! let text = to_text(&records).replace("42", "43");
//! let edited = HubCodec::default().encode_edit(&records, &text).unwrap();
//! assert_eq!(edited[..12], raw[..12]);
//! assert_eq!(edited[12], 0x2b);
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod message;
pub mod protocol;
pub mod text;

mod hub_codec;
mod packer;

pub use codec::Value;
pub use config::CodecConfig;
pub use error::{CodecError, DecodeCause, DecodeError, FramingError, TextFormatError, ValueError};
pub use hub_codec::HubCodec;
pub use message::{MessageRecord, MessageShape};
pub use packer::{pack, unpack, unpack_with, StreamUnpacker};
pub use text::{from_text, from_text_with_layout, to_text, to_text_pretty};
