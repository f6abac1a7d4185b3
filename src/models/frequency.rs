// file: src/models/frequency.rs
// description: regular time step with pandas-style alias parsing and rounding
// reference: https://docs.rs/chrono

use crate::error::{DatastoreError, Result};
use chrono::{DateTime, Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A fixed sampling interval such as `15min` or `h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Frequency {
    seconds: i64,
}

impl Frequency {
    pub fn from_seconds(seconds: i64) -> Result<Self> {
        if seconds <= 0 {
            return Err(DatastoreError::Validation(format!(
                "Frequency must be positive, got {} seconds",
                seconds
            )));
        }
        if Duration::try_seconds(seconds).is_none() {
            return Err(DatastoreError::Validation(format!(
                "Frequency of {} seconds is out of range",
                seconds
            )));
        }
        Ok(Self { seconds })
    }

    // u32 counts keep every product well inside the Duration range.
    pub fn minutes(n: u32) -> Self {
        Self {
            seconds: i64::from(n) * 60,
        }
    }

    pub fn hours(n: u32) -> Self {
        Self {
            seconds: i64::from(n) * 3600,
        }
    }

    pub fn days(n: u32) -> Self {
        Self {
            seconds: i64::from(n) * 86400,
        }
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn as_duration(&self) -> Duration {
        Duration::seconds(self.seconds)
    }

    /// Rounds to the nearest multiple of the interval counted from the epoch.
    /// Exact halves round up.
    pub fn round(&self, time: NaiveDateTime) -> NaiveDateTime {
        let stamp = time.and_utc().timestamp();
        let remainder = stamp.rem_euclid(self.seconds);
        let base = stamp - remainder;
        let rounded = if remainder * 2 >= self.seconds {
            base + self.seconds
        } else {
            base
        };
        DateTime::from_timestamp(rounded, 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or(time)
    }

    /// Distance from `time` to the nearest grid point.
    pub fn offset_from_grid(&self, time: NaiveDateTime) -> Duration {
        let rounded = self.round(time);
        (time - rounded).abs()
    }
}

impl FromStr for Frequency {
    type Err = DatastoreError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (count, unit) = trimmed.split_at(split);

        let count: i64 = if count.is_empty() {
            1
        } else {
            count
                .parse()
                .map_err(|_| DatastoreError::Validation(format!("Invalid frequency: {}", s)))?
        };

        let unit_seconds = match unit {
            "s" | "S" => 1,
            "min" | "T" => 60,
            "h" | "H" => 3600,
            "d" | "D" => 86400,
            _ => {
                return Err(DatastoreError::Validation(format!(
                    "Invalid frequency: {}",
                    s
                )));
            }
        };

        let seconds = count.checked_mul(unit_seconds).ok_or_else(|| {
            DatastoreError::Validation(format!("Frequency out of range: {}", s))
        })?;
        Self::from_seconds(seconds)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (count, unit) = if self.seconds % 86400 == 0 {
            (self.seconds / 86400, "d")
        } else if self.seconds % 3600 == 0 {
            (self.seconds / 3600, "h")
        } else if self.seconds % 60 == 0 {
            (self.seconds / 60, "min")
        } else {
            (self.seconds, "s")
        };

        if count == 1 {
            write!(f, "{}", unit)
        } else {
            write!(f, "{}{}", count, unit)
        }
    }
}
