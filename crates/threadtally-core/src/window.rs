//! Trailing report window in a target timezone
//!
//! The window is anchored to a single "now" read at the start of a run and
//! reaches back a number of local calendar days. Only a lower bound is applied.

use crate::error::{Result, TallyError};
use crate::DayKey;
use chrono::{DateTime, Days, LocalResult, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use std::time::{SystemTime, UNIX_EPOCH};

/// Longest DST gap we step across when a shifted local time does not exist.
const MAX_GAP_MINUTES: i64 = 24 * 60;

pub fn parse_timezone(id: &str) -> Result<Tz> {
    id.trim()
        .parse::<Tz>()
        .map_err(|_| TallyError::InvalidTimezone {
            value: id.to_string(),
        })
}

pub trait Clock {
    fn now(&self) -> Result<DateTime<Utc>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<DateTime<Utc>> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| TallyError::ClockError(format!("system time is before the Unix epoch: {e}")))?;
        let secs = i64::try_from(elapsed.as_secs())
            .map_err(|_| TallyError::ClockError(format!("{}s since epoch overflows", elapsed.as_secs())))?;

        DateTime::<Utc>::from_timestamp(secs, elapsed.subsec_nanos()).ok_or_else(|| {
            TallyError::ClockError(format!("{secs}s since epoch is out of range"))
        })
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> Result<DateTime<Utc>> {
        Ok(self.0)
    }
}

/// Start of the trailing window, as a UTC instant.
///
/// The subtraction happens on the local wall clock, so a week that crosses a
/// DST transition still spans seven local calendar days rather than 168 hours.
pub fn compute_window_start(now: DateTime<Utc>, tz: Tz, days: u32) -> Result<DateTime<Utc>> {
    let invalid = || TallyError::InvalidWindow {
        days,
        now: now.to_rfc3339(),
    };

    if days == 0 {
        return Err(invalid());
    }

    let local = now.with_timezone(&tz).naive_local();
    let shifted = local
        .checked_sub_days(Days::new(u64::from(days)))
        .ok_or_else(invalid)?;

    resolve_local(&tz, shifted)
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}

// Folds resolve to the earlier instant; gaps resolve to the first wall-clock
// minute that exists after the transition.
fn resolve_local(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => (1..=MAX_GAP_MINUTES).find_map(|minutes| {
            let candidate = naive.checked_add_signed(TimeDelta::minutes(minutes))?;
            tz.from_local_datetime(&candidate).earliest()
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    timezone: Tz,
    days: u32,
}

impl Window {
    pub fn new(now: DateTime<Utc>, timezone: Tz, days: u32) -> Result<Self> {
        let start = compute_window_start(now, timezone, days)?;
        Ok(Self {
            start,
            now,
            timezone,
            days,
        })
    }

    /// Inclusive lower bound.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.start
    }

    pub fn day_key(&self, timestamp: DateTime<Utc>) -> DayKey {
        DayKey(timestamp.with_timezone(&self.timezone).date_naive())
    }

    pub fn start_date(&self) -> DayKey {
        self.day_key(self.start)
    }

    pub fn end_date(&self) -> DayKey {
        self.day_key(self.now)
    }
}
