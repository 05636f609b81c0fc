//! Rolling interval configuration
//!
//! A rolling interval decides how wall-clock time is bucketed into file
//! checkpoints. Each bucket renders to a fixed-width run of digits so that
//! file names sort chronologically and can be parsed back losslessly.

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde::Deserialize;

/// Granularity at which the active file is replaced
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RollingInterval {
    /// Never roll by time (default)
    #[default]
    Infinite,
    /// Roll on the first of January
    Year,
    /// Roll on the first of each month
    Month,
    /// Roll at midnight
    Day,
    /// Roll at the top of each hour
    Hour,
    /// Roll every minute
    Minute,
}

impl RollingInterval {
    /// strftime pattern used to render a checkpoint of this interval
    pub fn format(&self) -> &'static str {
        match self {
            Self::Infinite => "",
            Self::Year => "%Y",
            Self::Month => "%Y%m",
            Self::Day => "%Y%m%d",
            Self::Hour => "%Y%m%d%H",
            Self::Minute => "%Y%m%d%H%M",
        }
    }

    /// Number of digits a rendered checkpoint occupies
    pub fn checkpoint_width(&self) -> usize {
        match self {
            Self::Infinite => 0,
            Self::Year => 4,
            Self::Month => 6,
            Self::Day => 8,
            Self::Hour => 10,
            Self::Minute => 12,
        }
    }

    /// Truncate `instant` to the start of its bucket
    ///
    /// Returns `None` for [`RollingInterval::Infinite`].
    pub fn current_checkpoint(&self, instant: NaiveDateTime) -> Option<NaiveDateTime> {
        let date = instant.date();
        let (date, hour, minute) = match self {
            Self::Infinite => return None,
            Self::Year => (date.with_ordinal(1)?, 0, 0),
            Self::Month => (date.with_day(1)?, 0, 0),
            Self::Day => (date, 0, 0),
            Self::Hour => (date, instant.hour(), 0),
            Self::Minute => (date, instant.hour(), instant.minute()),
        };
        date.and_hms_opt(hour, minute, 0)
    }

    /// Start of the bucket following the one containing `instant`
    ///
    /// Returns `None` for [`RollingInterval::Infinite`].
    pub fn next_checkpoint(&self, instant: NaiveDateTime) -> Option<NaiveDateTime> {
        let current = self.current_checkpoint(instant)?;
        match self {
            Self::Infinite => None,
            Self::Year => current.checked_add_months(Months::new(12)),
            Self::Month => current.checked_add_months(Months::new(1)),
            Self::Day => current.checked_add_signed(TimeDelta::days(1)),
            Self::Hour => current.checked_add_signed(TimeDelta::hours(1)),
            Self::Minute => current.checked_add_signed(TimeDelta::minutes(1)),
        }
    }

    /// Render a checkpoint with this interval's fixed-width format
    pub fn render(&self, checkpoint: NaiveDateTime) -> String {
        match self {
            Self::Infinite => String::new(),
            _ => checkpoint.format(self.format()).to_string(),
        }
    }

    /// Parse digits produced by [`RollingInterval::render`]
    ///
    /// The input must be exactly [`RollingInterval::checkpoint_width`] ASCII
    /// digits naming a valid calendar instant.
    pub fn parse(&self, digits: &str) -> Option<NaiveDateTime> {
        if *self == Self::Infinite
            || digits.len() != self.checkpoint_width()
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        let field = |start: usize, len: usize| -> Option<u32> {
            digits.get(start..start + len).and_then(|s| s.parse().ok())
        };

        let year = digits.get(0..4)?.parse::<i32>().ok()?;
        let month = if digits.len() >= 6 { field(4, 2)? } else { 1 };
        let day = if digits.len() >= 8 { field(6, 2)? } else { 1 };
        let hour = if digits.len() >= 10 { field(8, 2)? } else { 0 };
        let minute = if digits.len() >= 12 { field(10, 2)? } else { 0 };

        NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
    }
}
