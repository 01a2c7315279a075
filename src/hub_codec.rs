//! Configured codec facade.
//!
//! Bundles a [`CodecConfig`] with the free functions so an integration
//! layer can hold one value and call it for every intercepted payload.

use crate::config::CodecConfig;
use crate::error::{DecodeError, Result, TextFormatError};
use crate::message::MessageRecord;
use crate::packer::{self, StreamUnpacker};
use crate::text;

/// Hub protocol codec with fixed limits and text style.
///
/// # Example
///
/// ```
/// use signalr_hub_codec::{CodecConfig, HubCodec};
///
/// let codec = HubCodec::new(CodecConfig::default());
/// let text = codec.decode_to_text(&[0x02, 0x91, 0x06]).unwrap();
/// assert_eq!(text, "[[6]]");
/// assert_eq!(codec.encode_from_text(&text).unwrap(), vec![0x02, 0x91, 0x06]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct HubCodec {
    config: CodecConfig,
}

impl HubCodec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn unpack(&self, raw: &[u8]) -> std::result::Result<Vec<MessageRecord>, DecodeError> {
        packer::unpack_with(raw, &self.config)
    }

    pub fn pack(&self, records: &[MessageRecord]) -> Vec<u8> {
        packer::pack(records)
    }

    /// Render records, pretty-printed when the config asks for it.
    pub fn to_text(&self, records: &[MessageRecord]) -> String {
        if self.config.pretty_text {
            text::to_text_pretty(records)
        } else {
            text::to_text(records)
        }
    }

    pub fn from_text(&self, text: &str) -> std::result::Result<Vec<MessageRecord>, TextFormatError> {
        text::from_text(text)
    }

    /// Binary payload straight to editable text.
    pub fn decode_to_text(&self, raw: &[u8]) -> Result<String> {
        let records = self.unpack(raw)?;
        Ok(self.to_text(&records))
    }

    /// Edited text straight back to a binary payload, in canonical form.
    pub fn encode_from_text(&self, text: &str) -> Result<Vec<u8>> {
        let records = self.from_text(text)?;
        Ok(self.pack(&records))
    }

    /// Encode text edited from `original`, keeping the original layout of
    /// every value the edit did not change.
    pub fn encode_edit(&self, original: &[MessageRecord], text: &str) -> Result<Vec<u8>> {
        let records = text::from_text_with_layout(text, original)?;
        Ok(self.pack(&records))
    }

    /// Incremental decoder with this codec's limits.
    pub fn stream_unpacker(&self) -> StreamUnpacker {
        StreamUnpacker::new(self.config.clone())
    }
}
