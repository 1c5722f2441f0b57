//! Shaping accumulated threads into the output document

use crate::aggregator::{Accumulators, ThreadAccumulator};
use crate::error::{Result, TallyError};
use crate::{DayKey, ThreadKey};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub topic: String,
    pub messages: u64,
    pub users: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayReport {
    pub date: String,
    pub threads: Vec<ThreadSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub timezone: String,
    pub days: Vec<DayReport>,
}

impl Report {
    pub fn total_messages(&self) -> u64 {
        self.days
            .iter()
            .flat_map(|d| d.threads.iter())
            .map(|t| t.messages)
            .sum()
    }

    pub fn thread_count(&self) -> usize {
        self.days.iter().map(|d| d.threads.len()).sum()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the whole document in one go; nothing is streamed.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json).map_err(|source| TallyError::Output {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub fn topic_label(thread: ThreadKey) -> String {
    format!("Thread {thread}")
}

/// Build the report. Days are ascending by date and threads within a day are
/// ascending by anchor id, so identical input always serializes identically.
pub fn build_report(accumulators: Accumulators, timezone: &Tz) -> Report {
    let mut by_day: BTreeMap<DayKey, Vec<(ThreadKey, ThreadAccumulator)>> = BTreeMap::new();
    for ((day, thread), acc) in accumulators {
        by_day.entry(day).or_default().push((thread, acc));
    }

    let mut days: Vec<DayReport> = Vec::with_capacity(by_day.len());
    days.extend(by_day.into_iter().map(|(day, mut threads)| {
        threads.sort_by_key(|(thread, _)| *thread);
        DayReport {
            date: day.to_string(),
            threads: threads
                .into_iter()
                .map(|(thread, acc)| ThreadSummary {
                    topic: topic_label(thread),
                    messages: acc.message_count,
                    users: acc.user_count(),
                })
                .collect(),
        }
    }));

    Report {
        timezone: timezone.name().to_string(),
        days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::window::Window;
    use crate::RawMessage;
    use chrono::{DateTime, TimeZone, Utc};

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn tashkent_window() -> Window {
        Window::new(utc(2024, 1, 15, 10, 0, 0), chrono_tz::Asia::Tashkent, 7).unwrap()
    }

    #[test]
    fn test_build_report_empty() {
        let report = build_report(Accumulators::new(), &chrono_tz::Asia::Tashkent);
        assert_eq!(report.timezone, "Asia/Tashkent");
        assert!(report.days.is_empty());

        let value: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "timezone": "Asia/Tashkent", "days": [] })
        );
    }

    #[test]
    fn test_build_report_sorts_days_and_threads() {
        let window = tashkent_window();
        let messages = vec![
            RawMessage::new(30, utc(2024, 1, 12, 6, 0, 0)).with_sender(1),
            RawMessage::new(9, utc(2024, 1, 12, 7, 0, 0)).with_sender(1),
            RawMessage::new(200, utc(2024, 1, 12, 8, 0, 0)).with_sender(2),
            RawMessage::new(1, utc(2024, 1, 9, 6, 0, 0)).with_sender(3),
            RawMessage::new(2, utc(2024, 1, 10, 6, 0, 0)).with_sender(3),
        ];

        let report = build_report(aggregate(messages, &window), &window.timezone());
        let dates: Vec<&str> = report.days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-09", "2024-01-10", "2024-01-12"]);

        let topics: Vec<&str> = report.days[2]
            .threads
            .iter()
            .map(|t| t.topic.as_str())
            .collect();
        assert_eq!(topics, vec!["Thread 9", "Thread 30", "Thread 200"]);
    }

    #[test]
    fn test_build_report_counts() {
        let window = tashkent_window();
        let messages = vec![
            RawMessage::new(1, utc(2024, 1, 11, 6, 0, 0)).with_sender(1),
            RawMessage::new(2, utc(2024, 1, 11, 6, 1, 0)).with_sender(1).with_reply_to(1),
            RawMessage::new(3, utc(2024, 1, 11, 6, 2, 0)).with_sender(2).with_reply_to(1),
        ];

        let report = build_report(aggregate(messages, &window), &window.timezone());
        assert_eq!(report.days.len(), 1);
        assert_eq!(
            report.days[0].threads,
            vec![ThreadSummary {
                topic: "Thread 1".to_string(),
                messages: 3,
                users: 2,
            }]
        );
        assert_eq!(report.total_messages(), 3);
        assert_eq!(report.thread_count(), 1);
    }

    #[test]
    fn test_users_never_exceed_messages() {
        let window = tashkent_window();
        let mut messages = Vec::new();
        for i in 0..40 {
            let msg = RawMessage::new(i, utc(2024, 1, 9 + (i % 5) as u32, 6, i as u32, 0))
                .with_sender(i % 7)
                .with_reply_to(i % 3);
            messages.push(msg);
        }

        let report = build_report(aggregate(messages, &window), &window.timezone());
        for day in &report.days {
            for thread in &day.threads {
                assert!(thread.messages >= 1);
                assert!(thread.users >= 1);
                assert!(thread.users <= thread.messages);
            }
        }
        assert_eq!(report.total_messages(), 40);
    }

    #[test]
    fn test_report_json_round_trip() {
        let window = tashkent_window();
        let messages = vec![
            RawMessage::new(5, utc(2024, 1, 9, 0, 30, 0)).with_sender(1),
            RawMessage::new(6, utc(2024, 1, 9, 0, 30, 0)).with_sender(2).with_reply_to(5),
            RawMessage::new(7, utc(2024, 1, 13, 12, 0, 0)).with_sender(u32::MAX as i64),
        ];
        let report = build_report(aggregate(messages, &window), &window.timezone());

        let json = report.to_json_pretty().unwrap();
        let parsed: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.json");
        let report = build_report(Accumulators::new(), &chrono_tz::UTC);

        report.write_to(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: Report = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.timezone, "UTC");
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("result.json");
        let report = build_report(Accumulators::new(), &chrono_tz::UTC);

        let err = report.write_to(&path).unwrap_err();
        assert!(matches!(err, TallyError::Output { .. }));
    }
}
