use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Common calendar/clock units measured in milliseconds.
///
/// Zoom providers typically describe their tiers with these, coarsest first,
/// e.g. `[Hour, Minute, Second]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Millisecond,
    TenthSecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
    Decade,
    Century,
    Millennium,
}

const DAY_MS: f64 = 86_400_000.0;
// Mean Gregorian year.
const YEAR_MS: f64 = DAY_MS * 365.2425;

impl TimeUnit {
    pub const ALL: [TimeUnit; 12] = [
        TimeUnit::Millisecond,
        TimeUnit::TenthSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
        TimeUnit::Day,
        TimeUnit::Week,
        TimeUnit::Month,
        TimeUnit::Year,
        TimeUnit::Decade,
        TimeUnit::Century,
        TimeUnit::Millennium,
    ];

    #[must_use]
    pub fn ms(self) -> f64 {
        match self {
            Self::Millisecond => 1.0,
            Self::TenthSecond => 100.0,
            Self::Second => 1_000.0,
            Self::Minute => 60_000.0,
            Self::Hour => 3_600_000.0,
            Self::Day => DAY_MS,
            Self::Week => DAY_MS * 7.0,
            Self::Month => YEAR_MS / 12.0,
            Self::Year => YEAR_MS,
            Self::Decade => YEAR_MS * 10.0,
            Self::Century => YEAR_MS * 100.0,
            Self::Millennium => YEAR_MS * 1_000.0,
        }
    }

    /// The unit as a `chrono` duration, rounded to whole milliseconds.
    #[must_use]
    pub fn as_time_delta(self) -> TimeDelta {
        TimeDelta::milliseconds(self.ms().round() as i64)
    }

    #[must_use]
    pub fn next_largest(self) -> Option<TimeUnit> {
        let position = Self::ALL.iter().position(|unit| *unit == self)?;
        Self::ALL.get(position + 1).copied()
    }

    #[must_use]
    pub fn next_smallest(self) -> Option<TimeUnit> {
        let position = Self::ALL.iter().position(|unit| *unit == self)?;
        position.checked_sub(1).map(|index| Self::ALL[index])
    }

    /// Tier widths for `units`, in the order given.
    #[must_use]
    pub fn widths(units: &[TimeUnit]) -> Vec<f64> {
        units.iter().map(|unit| unit.ms()).collect()
    }
}
