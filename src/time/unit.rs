//! Calendar time units

use std::fmt;

/// Calendar granularity, ordered from finest to coarsest
///
/// The ordering is used both to dispatch arithmetic and to compare units
/// ("is this shift at least as coarse as the period").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeUnit {
    /// One second
    Second,
    /// One minute
    Minute,
    /// One hour
    Hour,
    /// One calendar day
    Day,
    /// One week, starting on Monday
    Week,
    /// One calendar month
    Month,
    /// One calendar year
    Year,
    /// One ISO 8601 week-numbering year
    IsoYear,
}

impl TimeUnit {
    /// Resolve a unit letter (`s m h d w M y Y`)
    ///
    /// `IsoYear` has no letter of its own.
    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            's' => Some(TimeUnit::Second),
            'm' => Some(TimeUnit::Minute),
            'h' => Some(TimeUnit::Hour),
            'd' => Some(TimeUnit::Day),
            'w' => Some(TimeUnit::Week),
            'M' => Some(TimeUnit::Month),
            'y' | 'Y' => Some(TimeUnit::Year),
            _ => None,
        }
    }

    /// Canonical letter of the unit
    pub fn letter(self) -> char {
        match self {
            TimeUnit::Second => 's',
            TimeUnit::Minute => 'm',
            TimeUnit::Hour => 'h',
            TimeUnit::Day => 'd',
            TimeUnit::Week => 'w',
            TimeUnit::Month => 'M',
            TimeUnit::Year | TimeUnit::IsoYear => 'y',
        }
    }

    /// Upper bound of hours covered by one unit
    ///
    /// Sub-hour units report 0. Months count as 30 days and years as a
    /// leap year.
    pub fn hours(self) -> u64 {
        match self {
            TimeUnit::Second | TimeUnit::Minute => 0,
            TimeUnit::Hour => 1,
            TimeUnit::Day => 24,
            TimeUnit::Week => 7 * 24,
            TimeUnit::Month => 30 * 24,
            TimeUnit::Year | TimeUnit::IsoYear => 366 * 24,
        }
    }

    /// Fixed length in seconds for units that have one
    pub(crate) fn fixed_seconds(self) -> Option<i64> {
        match self {
            TimeUnit::Second => Some(1),
            TimeUnit::Minute => Some(60),
            TimeUnit::Hour => Some(3600),
            _ => None,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
            TimeUnit::IsoYear => "ISO year",
        };
        f.write_str(name)
    }
}
