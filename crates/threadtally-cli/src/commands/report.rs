use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use threadtally_core::{
    run, Clock, FixedClock, JsonlSource, Report, RunOptions, RunOutcome, SystemClock,
    TelegramExportSource,
};
use tracing::info;

use crate::config::{Overrides, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// One message object per line
    Jsonl,
    /// Telegram Desktop "Export chat history" JSON
    TelegramExport,
}

impl InputFormat {
    /// `.json` files are Telegram exports; everything else is read as JSONL.
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => InputFormat::TelegramExport,
            _ => InputFormat::Jsonl,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportArgs {
    pub input: PathBuf,
    pub format: Option<InputFormat>,
    pub config: Option<PathBuf>,
    pub overrides: Overrides,
    pub now: Option<String>,
    pub stdout: bool,
    pub light: bool,
    pub benchmark: bool,
}

pub fn run_report(args: ReportArgs) -> Result<()> {
    let mut settings = Settings::load(args.config.as_deref())?;
    settings.apply_env(|key| std::env::var(key).ok())?;
    settings.apply_overrides(args.overrides);

    let options = RunOptions::new(&settings.timezone, settings.window_days)
        .context("Invalid report configuration")?;

    let clock: Box<dyn Clock> = match args.now.as_deref() {
        Some(raw) => Box::new(FixedClock(parse_now(raw)?)),
        None => Box::new(SystemClock),
    };

    if let Some(group) = settings.group.as_deref() {
        info!(group, "target group");
    }

    let format = args
        .format
        .unwrap_or_else(|| InputFormat::detect(&args.input));
    let outcome = match format {
        InputFormat::Jsonl => {
            let source = JsonlSource::open(&args.input)?;
            run(source, &options, clock.as_ref())?
        }
        InputFormat::TelegramExport => {
            let source = TelegramExportSource::open(&args.input)?;
            if let Some(chat) = source.chat_name() {
                info!(chat, "reading exported chat");
            }
            run(source, &options, clock.as_ref())?
        }
    };

    if args.stdout {
        println!("{}", outcome.report.to_json_pretty()?);
    } else {
        outcome.report.write_to(&settings.output)?;
        print_summary(&outcome, &settings.output);
    }

    if args.light {
        println!("{}", render_table(&outcome.report));
        println!(
            "\nTotal: {} messages | {} threads | {} days",
            outcome.report.total_messages(),
            outcome.report.thread_count(),
            outcome.report.days.len()
        );
    }

    if args.benchmark {
        eprintln!(
            "{}",
            format!("  Processing time: {}ms", outcome.stats.elapsed_ms).bright_black()
        );
    }

    Ok(())
}

fn parse_now(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw.trim())
        .with_context(|| format!("Invalid --now value '{raw}', expected RFC 3339"))?;
    Ok(parsed.with_timezone(&Utc))
}

fn print_summary(outcome: &RunOutcome, output: &Path) {
    eprintln!(
        "{}",
        format!(
            "  Analysing messages from {} to {} ({})",
            outcome.window.start_date(),
            outcome.window.end_date(),
            outcome.report.timezone
        )
        .bright_black()
    );
    eprintln!(
        "{}",
        format!("✓ Analysis complete, results saved to {}", output.display()).green()
    );
    eprintln!(
        "{}",
        format!(
            "  {} days, {} threads, {} messages",
            outcome.report.days.len(),
            outcome.report.thread_count(),
            outcome.report.total_messages()
        )
        .bright_black()
    );
    if outcome.stats.malformed > 0 {
        eprintln!(
            "{}",
            format!("  Skipped {} malformed messages", outcome.stats.malformed).yellow()
        );
    }
}

pub fn render_table(report: &Report) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Date", "Topic", "Messages", "Users"]);

    for day in &report.days {
        for thread in &day.threads {
            table.add_row(vec![
                day.date.clone(),
                thread.topic.clone(),
                thread.messages.to_string(),
                thread.users.to_string(),
            ]);
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadtally_core::{DayReport, ThreadSummary};

    #[test]
    fn test_detect_format() {
        assert_eq!(InputFormat::detect(Path::new("result.json")), InputFormat::TelegramExport);
        assert_eq!(InputFormat::detect(Path::new("RESULT.JSON")), InputFormat::TelegramExport);
        assert_eq!(InputFormat::detect(Path::new("history.jsonl")), InputFormat::Jsonl);
        assert_eq!(InputFormat::detect(Path::new("history")), InputFormat::Jsonl);
    }

    #[test]
    fn test_parse_now() {
        let now = parse_now("2024-01-15T15:00:00+05:00").unwrap();
        assert_eq!(now.to_rfc3339(), "2024-01-15T10:00:00+00:00");
    }

    #[test]
    fn test_parse_now_rejects_garbage() {
        let err = parse_now("tomorrow").unwrap_err();
        assert!(err.to_string().contains("tomorrow"));
    }

    #[test]
    fn test_render_table_rows() {
        let report = Report {
            timezone: "UTC".to_string(),
            days: vec![DayReport {
                date: "2024-01-09".to_string(),
                threads: vec![
                    ThreadSummary {
                        topic: "Thread 5".to_string(),
                        messages: 2,
                        users: 2,
                    },
                    ThreadSummary {
                        topic: "Thread 8".to_string(),
                        messages: 1,
                        users: 1,
                    },
                ],
            }],
        };

        let table = render_table(&report);
        assert_eq!(table.row_iter().count(), 2);
        let rendered = table.to_string();
        assert!(rendered.contains("Thread 5"));
        assert!(rendered.contains("2024-01-09"));
    }
}
