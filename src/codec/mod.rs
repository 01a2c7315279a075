//! Value codec - MessagePack values with byte-exact re-encoding.
//!
//! - [`Value`] - the decoded value tree, with layout hints
//! - [`decode_value`] - read one value from a buffer
//! - [`encode_value`] - write one value back out
//!
//! # Example
//!
//! ```
//! use signalr_hub_codec::codec::{decode_value, encode_value};
//!
//! // 5 written as int16 instead of a fixint
//! let wire = [0xd1, 0x00, 0x05];
//! let (value, _) = decode_value(&wire, 0).unwrap();
//! assert_eq!(value.as_integer().unwrap().get(), 5);
//! assert_eq!(encode_value(&value), wire);
//! ```

mod decode;
mod encode;
mod value;

pub use decode::{decode_value, decode_value_with_depth};
pub use encode::{encode_value, write_array, write_value};
pub use value::{Binary, Extension, IntFormat, Integer, LenFormat, Value};
