//! Countdown clocks and remaining-time formatting.
//!
//! Everything is derived from a start instant and a sample of the monotonic clock, never from
//! accumulated deltas. Remaining time is a signed quantity so an elapsed time past the end reads
//! as expired instead of wrapping around.

use std::fmt;

use tokio::time::{Duration, Instant};

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;

/// Game countdown for one session attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClock {
    started_at: Instant,
    minutes: u32,
}

impl SessionClock {
    /// Start a countdown of `minutes` at `now`.
    pub fn start(minutes: u32, now: Instant) -> Self {
        Self {
            started_at: now,
            minutes,
        }
    }

    /// When the countdown started.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Configured length in minutes.
    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// Milliseconds since the start; zero for samples taken before it.
    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        duration_ms(now.saturating_duration_since(self.started_at))
    }

    /// Time left at `now`.
    pub fn remaining(&self, now: Instant) -> Remaining {
        Remaining::from_elapsed(self.minutes, self.elapsed_ms(now))
    }

    /// Whether the countdown has reached zero at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.remaining(now).is_expired()
    }
}

/// Signed time left on a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Remaining {
    ms: i64,
}

/// Display fields of a non-negative remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeFields {
    /// Whole hours.
    pub hours: u64,
    /// Minutes within the hour.
    pub minutes: u64,
    /// Seconds within the minute.
    pub seconds: u64,
    /// Milliseconds within the second.
    pub millis: u64,
}

impl Remaining {
    /// Time left on a countdown of `minutes` after `elapsed_ms`.
    pub fn from_elapsed(minutes: u32, elapsed_ms: u64) -> Self {
        let total = i64::from(minutes) * MS_PER_MINUTE;
        let elapsed = i64::try_from(elapsed_ms).unwrap_or(i64::MAX);
        Self {
            ms: total.saturating_sub(elapsed),
        }
    }

    /// Time left on a countdown of `total` after `elapsed`.
    pub fn between(total: Duration, elapsed: Duration) -> Self {
        let total = i64::try_from(total.as_millis()).unwrap_or(i64::MAX);
        let elapsed = i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX);
        Self {
            ms: total.saturating_sub(elapsed),
        }
    }

    /// Whether nothing is left. Zero counts as expired.
    pub fn is_expired(self) -> bool {
        self.ms <= 0
    }

    /// Milliseconds left, clamped at zero.
    pub fn millis(self) -> u64 {
        u64::try_from(self.ms).unwrap_or(0)
    }

    /// Whole minutes left, clamped at zero.
    pub fn whole_minutes(self) -> u64 {
        self.millis() / MS_PER_MINUTE as u64
    }

    /// Hours, minutes, seconds and milliseconds for display.
    pub fn fields(self) -> TimeFields {
        let ms = self.millis();
        let total_seconds = ms / 1_000;
        let total_minutes = total_seconds / 60;
        TimeFields {
            hours: total_minutes / 60,
            minutes: total_minutes % 60,
            seconds: total_seconds % 60,
            millis: ms % 1_000,
        }
    }
}

impl fmt::Display for Remaining {
    /// `MM:SS:mmm`, or `HH:MM:SS:mmm` once an hour or more is left.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let TimeFields {
            hours,
            minutes,
            seconds,
            millis,
        } = self.fields();
        if hours > 0 {
            write!(f, "{hours:02}:")?;
        }
        write!(f, "{minutes:02}:{seconds:02}:{millis:03}")
    }
}

/// Milliseconds in `duration`, saturating.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// `MM:SS` (or `HH:MM:SS`) for an elapsed duration such as a team's control time.
pub fn format_elapsed(duration: Duration) -> String {
    let seconds = duration.as_secs();
    let (hours, minutes, seconds) = (seconds / 3_600, (seconds / 60) % 60, seconds % 60);
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
