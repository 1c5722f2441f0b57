//! One report run: read the clock once, drain the source, build the report.

use crate::aggregator::Aggregator;
use crate::error::{Result, SourceError};
use crate::report::{build_report, Report};
use crate::sources::MessageSource;
use crate::window::{parse_timezone, Clock, Window};
use crate::DEFAULT_WINDOW_DAYS;
use chrono_tz::Tz;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub timezone: Tz,
    pub window_days: u32,
}

impl RunOptions {
    pub fn new(timezone: &str, window_days: u32) -> Result<Self> {
        Ok(Self {
            timezone: parse_timezone(timezone)?,
            window_days,
        })
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Asia::Tashkent,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub observed: u64,
    pub counted: u64,
    pub before_window: u64,
    pub malformed: u64,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: Report,
    pub window: Window,
    pub stats: RunStats,
}

/// Run the whole pipeline over `source`.
///
/// Malformed messages are logged and skipped. A transport failure aborts the
/// run and is returned as-is.
pub fn run<S>(source: S, options: &RunOptions, clock: &dyn Clock) -> Result<RunOutcome>
where
    S: MessageSource,
{
    let started = Instant::now();
    let now = clock.now()?;
    let window = Window::new(now, options.timezone, options.window_days)?;

    info!(
        source = %source.describe(),
        timezone = %options.timezone.name(),
        from = %window.start_date(),
        to = %window.end_date(),
        "analysing messages"
    );

    let mut aggregator = Aggregator::new(&window);
    let mut malformed = 0u64;

    for item in source {
        match item {
            Ok(msg) => {
                aggregator.observe(&msg);
            }
            Err(SourceError::Malformed(err)) => {
                malformed += 1;
                warn!(location = %err.location, reason = %err.reason, "skipping malformed message");
            }
            Err(SourceError::Transport(err)) => return Err(err.into()),
        }
    }

    let (accumulators, agg_stats) = aggregator.finish();
    let report = build_report(accumulators, &options.timezone);

    for day in &report.days {
        debug!(date = %day.date, threads = day.threads.len(), "day summary");
    }

    let stats = RunStats {
        observed: agg_stats.observed,
        counted: agg_stats.counted,
        before_window: agg_stats.before_window,
        malformed,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    info!(
        counted = stats.counted,
        before_window = stats.before_window,
        malformed = stats.malformed,
        days = report.days.len(),
        threads = report.thread_count(),
        "analysis complete"
    );

    Ok(RunOutcome {
        report,
        window,
        stats,
    })
}
