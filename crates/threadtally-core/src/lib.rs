#![deny(clippy::all)]

mod aggregator;
pub mod error;
pub mod pipeline;
mod report;
pub mod sources;
pub mod window;

pub use aggregator::*;
pub use error::{MalformedMessage, Result, SourceError, TallyError, TransportFailure};
pub use pipeline::{run, RunOptions, RunOutcome, RunStats};
pub use report::*;
pub use sources::{JsonlSource, MemorySource, MessageSource, TelegramExportSource};
pub use window::{compute_window_start, parse_timezone, Clock, FixedClock, SystemClock, Window};

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;

pub const DEFAULT_TIMEZONE: &str = "Asia/Tashkent";
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// A message as delivered by the transport. Never mutated here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    /// `None` for service messages or senders the transport could not identify.
    pub sender_id: Option<i64>,
    pub reply_to_id: Option<i64>,
}

impl RawMessage {
    pub fn new(id: i64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            timestamp,
            sender_id: None,
            reply_to_id: None,
        }
    }

    pub fn with_sender(mut self, sender_id: i64) -> Self {
        self.sender_id = Some(sender_id);
        self
    }

    pub fn with_reply_to(mut self, reply_to_id: i64) -> Self {
        self.reply_to_id = Some(reply_to_id);
        self
    }

    /// The anchor this message groups under: the replied-to message, or the
    /// message itself when it replies to nothing.
    pub fn thread_key(&self) -> ThreadKey {
        ThreadKey(self.reply_to_id.unwrap_or(self.id))
    }

    pub fn participant(&self) -> Participant {
        match self.sender_id {
            Some(id) => Participant::Known(id),
            None => Participant::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadKey(pub i64);

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Local calendar date of a message in the target timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(pub NaiveDate);

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Participant {
    Known(i64),
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_thread_key_without_reply_is_own_id() {
        let msg = RawMessage::new(42, ts());
        assert_eq!(msg.thread_key(), ThreadKey(42));
    }

    #[test]
    fn test_thread_key_with_reply_uses_anchor() {
        let msg = RawMessage::new(99, ts()).with_reply_to(42);
        assert_eq!(msg.thread_key(), ThreadKey(42));
    }

    #[test]
    fn test_reply_to_zero_is_a_real_anchor() {
        let msg = RawMessage::new(7, ts()).with_reply_to(0);
        assert_eq!(msg.thread_key(), ThreadKey(0));
    }

    #[test]
    fn test_sender_zero_is_not_unknown() {
        let known = RawMessage::new(1, ts()).with_sender(0);
        let unknown = RawMessage::new(2, ts());
        assert_eq!(known.participant(), Participant::Known(0));
        assert_eq!(unknown.participant(), Participant::Unknown);
        assert_ne!(known.participant(), unknown.participant());
    }

    #[test]
    fn test_day_key_display() {
        let day = DayKey(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        assert_eq!(day.to_string(), "2024-01-09");
    }
}
