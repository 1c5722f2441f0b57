//! Message sources
//!
//! The live chat transport lives outside this crate. Anything that can hand
//! over a finite sequence of messages for one group implements
//! [`MessageSource`]; the readers here cover exported history on disk.

mod jsonl;
mod telegram_export;

pub use jsonl::JsonlSource;
pub use telegram_export::TelegramExportSource;

use crate::error::SourceError;
use crate::RawMessage;
use std::vec;

pub type SourceItem = std::result::Result<RawMessage, SourceError>;

/// A finite, already-authenticated sequence of messages.
///
/// `SourceError::Malformed` items are skipped by the pipeline;
/// `SourceError::Transport` ends the run.
pub trait MessageSource: Iterator<Item = SourceItem> {
    /// Short label for logs, e.g. the file being read.
    fn describe(&self) -> String;
}

/// In-memory source, mostly for embedding and tests.
pub struct MemorySource {
    label: String,
    items: vec::IntoIter<SourceItem>,
}

impl MemorySource {
    pub fn new(messages: Vec<RawMessage>) -> Self {
        Self::from_items(messages.into_iter().map(Ok).collect())
    }

    pub fn from_items(items: Vec<SourceItem>) -> Self {
        Self {
            label: "memory".to_string(),
            items: items.into_iter(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl Iterator for MemorySource {
    type Item = SourceItem;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next()
    }
}

impl MessageSource for MemorySource {
    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Numeric part of a peer reference such as `user123` or `channel-100456`.
pub(crate) fn parse_peer_id(raw: &str) -> Option<i64> {
    let digits = raw
        .trim()
        .trim_start_matches(|c: char| c.is_ascii_alphabetic() || c == '_');
    digits.parse().ok()
}
