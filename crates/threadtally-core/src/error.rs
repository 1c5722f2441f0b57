use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TallyError>;

/// Fatal errors that abort a run.
#[derive(Debug, Error)]
pub enum TallyError {
    #[error("invalid timezone '{value}': not a recognised IANA timezone identifier")]
    InvalidTimezone { value: String },

    #[error("failed to read current time: {0}")]
    ClockError(String),

    #[error("cannot compute a {days}-day window ending at {now}")]
    InvalidWindow { days: u32, now: String },

    #[error("message transport failed: {0}")]
    TransportFailure(#[from] TransportFailure),

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report to {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures surfaced by a message source. These are passed through untouched
/// and never retried here.
#[derive(Debug, Error)]
pub enum TransportFailure {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {} at line {line}: {source}", path.display())]
    Read {
        path: PathBuf,
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid export document {}: {reason}", path.display())]
    Document { path: PathBuf, reason: String },
}

/// A single record that could not be turned into a message. The run skips it
/// and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed message at {location}: {reason}")]
pub struct MalformedMessage {
    pub location: String,
    pub reason: String,
}

impl MalformedMessage {
    pub fn new(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Malformed(#[from] MalformedMessage),

    #[error(transparent)]
    Transport(#[from] TransportFailure),
}
