//! JSONL message history reader
//!
//! One message object per line:
//! `{"id": 42, "timestamp": "2024-01-15T10:00:00Z", "sender_id": 7, "reply_to_id": 5}`.
//! `timestamp` may also be Unix seconds. Blank lines are ignored.

use super::{MessageSource, SourceItem};
use crate::error::{MalformedMessage, SourceError, TransportFailure};
use crate::RawMessage;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct WireMessage {
    id: Option<i64>,
    timestamp: Option<WireTimestamp>,
    sender_id: Option<i64>,
    reply_to_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Unix(i64),
    Text(String),
}

impl WireTimestamp {
    fn to_utc(&self) -> Result<DateTime<Utc>, String> {
        match self {
            WireTimestamp::Unix(secs) => DateTime::<Utc>::from_timestamp(*secs, 0)
                .ok_or_else(|| format!("timestamp {secs} is out of range")),
            WireTimestamp::Text(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| format!("invalid timestamp '{text}': {e}")),
        }
    }
}

impl WireMessage {
    fn into_message(self, location: &str) -> Result<RawMessage, MalformedMessage> {
        let id = self
            .id
            .ok_or_else(|| MalformedMessage::new(location, "missing id"))?;
        let timestamp = self
            .timestamp
            .ok_or_else(|| MalformedMessage::new(location, "missing timestamp"))?
            .to_utc()
            .map_err(|reason| MalformedMessage::new(location, reason))?;

        Ok(RawMessage {
            id,
            timestamp,
            sender_id: self.sender_id,
            reply_to_id: self.reply_to_id,
        })
    }
}

pub struct JsonlSource<R = BufReader<File>> {
    label: PathBuf,
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    finished: bool,
}

impl JsonlSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TransportFailure> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TransportFailure::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_reader(BufReader::new(file), path))
    }
}

impl<R: BufRead> JsonlSource<R> {
    pub fn from_reader(reader: R, label: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            reader,
            buf: Vec::new(),
            line_no: 0,
            finished: false,
        }
    }

    fn parse_line(&self, trimmed: &[u8]) -> Result<RawMessage, MalformedMessage> {
        let location = format!("{}:{}", self.label.display(), self.line_no);
        if let Err(e) = std::str::from_utf8(trimmed) {
            return Err(MalformedMessage::new(&location, format!("invalid UTF-8: {e}")));
        }
        let mut bytes = trimmed.to_vec();
        let wire: WireMessage = simd_json::from_slice(&mut bytes)
            .map_err(|e| MalformedMessage::new(&location, format!("invalid JSON: {e}")))?;
        wire.into_message(&location)
    }
}

impl<R: BufRead> Iterator for JsonlSource<R> {
    type Item = SourceItem;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            self.buf.clear();
            // Raw bytes so an undecodable line is one bad record, not a read failure.
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line_no += 1,
                Err(source) => {
                    self.line_no += 1;
                    self.finished = true;
                    return Some(Err(SourceError::Transport(TransportFailure::Read {
                        path: self.label.clone(),
                        line: self.line_no,
                        source,
                    })));
                }
            }

            let trimmed = self.buf.trim_ascii();
            if trimmed.is_empty() {
                continue;
            }

            let parsed = self.parse_line(trimmed);
            return Some(parsed.map_err(SourceError::from));
        }
    }
}

impl<R: BufRead> MessageSource for JsonlSource<R> {
    fn describe(&self) -> String {
        format!("jsonl:{}", self.label.display())
    }
}
