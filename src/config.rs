//! Codec limits and text style.
//!
//! Loadable from JSON so the integration layer can keep it next to its own
//! settings:
//!
//! ```
//! use signalr_hub_codec::CodecConfig;
//!
//! let config = CodecConfig::from_json(r#"{ "maxDepth": 32, "prettyText": true }"#).unwrap();
//! assert_eq!(config.max_depth, 32);
//! assert!(config.pretty_text);
//! assert_eq!(config.max_frame_len, CodecConfig::default().max_frame_len);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

/// Largest frame the SignalR binary transport accepts (2 GB - 1).
pub const DEFAULT_MAX_FRAME_LEN: usize = i32::MAX as usize;

/// Default array/map nesting limit.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Limits applied while decoding and the style used when rendering text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CodecConfig {
    /// Frames announcing a longer body fail with `LengthOverflow`.
    pub max_frame_len: usize,
    /// Arrays and maps nested deeper than this fail with `DepthLimit`.
    pub max_depth: usize,
    /// Pretty-print text output instead of the compact form.
    pub pretty_text: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_depth: DEFAULT_MAX_DEPTH,
            pretty_text: false,
        }
    }
}

impl CodecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_pretty_text(mut self, pretty_text: bool) -> Self {
        self.pretty_text = pretty_text;
        self
    }

    /// Parse a config from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(CodecError::Config)
    }
}
