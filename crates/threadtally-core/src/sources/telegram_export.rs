//! Telegram Desktop chat export reader
//!
//! Reads the `result.json` produced by "Export chat history" in JSON mode.
//! Only the fields needed for thread statistics are decoded. Messages are
//! decoded one by one, so an entry of unexpected shape is reported on its own.

use super::{parse_peer_id, MessageSource, SourceItem};
use crate::error::{MalformedMessage, SourceError, TransportFailure};
use crate::RawMessage;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::vec;

#[derive(Debug, Deserialize)]
struct ExportDocument {
    name: Option<String>,
    id: Option<i64>,
    messages: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ExportMessage {
    id: Option<i64>,
    date_unixtime: Option<String>,
    from_id: Option<String>,
    // Service messages (joins, pins) carry the actor instead of a sender.
    actor_id: Option<String>,
    reply_to_message_id: Option<i64>,
}

impl ExportMessage {
    fn decode(value: serde_json::Value, location: &str) -> Result<RawMessage, MalformedMessage> {
        let message: ExportMessage = serde_json::from_value(value)
            .map_err(|e| MalformedMessage::new(location, format!("unexpected message shape: {e}")))?;
        message.into_message(location)
    }

    fn into_message(self, location: &str) -> Result<RawMessage, MalformedMessage> {
        let id = self
            .id
            .ok_or_else(|| MalformedMessage::new(location, "missing id"))?;
        let raw_date = self
            .date_unixtime
            .ok_or_else(|| MalformedMessage::new(location, "missing date_unixtime"))?;
        let timestamp = raw_date
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .ok_or_else(|| {
                MalformedMessage::new(location, format!("invalid date_unixtime '{raw_date}'"))
            })?;

        let sender_id = self
            .from_id
            .or(self.actor_id)
            .and_then(|peer| parse_peer_id(&peer));

        Ok(RawMessage {
            id,
            timestamp,
            sender_id,
            reply_to_id: self.reply_to_message_id,
        })
    }
}

pub struct TelegramExportSource {
    path: PathBuf,
    chat_name: Option<String>,
    chat_id: Option<i64>,
    messages: vec::IntoIter<serde_json::Value>,
    index: usize,
}

impl TelegramExportSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TransportFailure> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| TransportFailure::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(data, path)
    }

    pub fn from_bytes(data: Vec<u8>, path: impl Into<PathBuf>) -> Result<Self, TransportFailure> {
        let path = path.into();
        let mut bytes = data;
        let document: ExportDocument =
            simd_json::from_slice(&mut bytes).map_err(|e| TransportFailure::Document {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            path,
            chat_name: document.name,
            chat_id: document.id,
            messages: document.messages.into_iter(),
            index: 0,
        })
    }

    pub fn chat_name(&self) -> Option<&str> {
        self.chat_name.as_deref()
    }

    pub fn chat_id(&self) -> Option<i64> {
        self.chat_id
    }
}

impl Iterator for TelegramExportSource {
    type Item = SourceItem;

    fn next(&mut self) -> Option<Self::Item> {
        let message = self.messages.next()?;
        self.index += 1;
        let location = format!("{}#message[{}]", self.path.display(), self.index);
        Some(ExportMessage::decode(message, &location).map_err(SourceError::from))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.messages.size_hint()
    }
}

impl MessageSource for TelegramExportSource {
    fn describe(&self) -> String {
        match &self.chat_name {
            Some(name) => format!("telegram-export:{} ({})", self.path.display(), name),
            None => format!("telegram-export:{}", self.path.display()),
        }
    }
}
