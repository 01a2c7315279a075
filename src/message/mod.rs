//! Hub message records and their classification.
//!
//! - [`MessageRecord`] - shape plus verbatim field list
//! - [`classify`] - match a field list against the hub protocol grammars

mod classify;
mod record;

pub use classify::{classify, shape_of};
pub(crate) use classify::classify_with_format;
pub use record::{message_type, result_kind, CompletionResult, MessageRecord, MessageShape};
