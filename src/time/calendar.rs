//! Broken-down calendar time and its arithmetic
//!
//! Rounding and month/year arithmetic work on calendar fields, never on
//! flat seconds, so variable month lengths, ISO week numbering and DST
//! transitions resolve correctly. Conversion to and from absolute time
//! happens only at the edges through a [`TimeZone`].
//!
//! Calendar rules:
//!
//! - weeks start on Monday
//! - month/year steps clamp the day to the last day of the target month
//! - day/week steps keep the wall-clock time
//! - hour/minute/second steps go through absolute time
//! - ISO year steps keep the ISO week number and weekday (week 53 falls
//!   back to week 52 when the target year has no week 53)
//! - a local time inside a DST gap converts as if one hour later, an
//!   ambiguous local time converts to the earliest instant

use chrono::{
    Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Weekday,
};
use std::fmt;

use super::TimeUnit;
use crate::error::TimeParseError;

/// Broken-down local time (year, month, day, hour, minute, second)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarTime {
    local: NaiveDateTime,
}

impl CalendarTime {
    /// Wrap a naive local date and time
    pub fn new(local: NaiveDateTime) -> Self {
        Self { local }
    }

    /// Build from calendar fields, `None` when they do not form a valid time
    pub fn from_ymd_hms(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)?
            .and_hms_opt(hour, minute, second)
            .map(Self::new)
    }

    /// Break an absolute time down in the given zone (`localtime`)
    pub fn from_timestamp<Tz: TimeZone>(tz: &Tz, ts: i64) -> Result<Self, TimeParseError> {
        tz.timestamp_opt(ts, 0)
            .single()
            .map(|dt| Self::new(dt.naive_local()))
            .ok_or(TimeParseError::InvalidTime)
    }

    /// Convert back to an absolute time in the given zone (`mktime`)
    pub fn to_timestamp<Tz: TimeZone>(&self, tz: &Tz) -> Result<i64, TimeParseError> {
        if let Some(dt) = tz.from_local_datetime(&self.local).earliest() {
            return Ok(dt.timestamp());
        }

        // Inside a DST gap
        let shifted = self
            .local
            .checked_add_signed(Duration::hours(1))
            .ok_or(TimeParseError::InvalidTime)?;

        tz.from_local_datetime(&shifted)
            .earliest()
            .map(|dt| dt.timestamp())
            .ok_or(TimeParseError::InvalidTime)
    }

    /// Underlying naive local date and time
    pub fn naive(&self) -> NaiveDateTime {
        self.local
    }

    /// Calendar year
    pub fn year(&self) -> i32 {
        self.local.year()
    }

    /// Month, 1-12
    pub fn month(&self) -> u32 {
        self.local.month()
    }

    /// Day of month, 1-31
    pub fn day(&self) -> u32 {
        self.local.day()
    }

    /// Hour, 0-23
    pub fn hour(&self) -> u32 {
        self.local.hour()
    }

    /// Minute, 0-59
    pub fn minute(&self) -> u32 {
        self.local.minute()
    }

    /// Second, 0-59
    pub fn second(&self) -> u32 {
        self.local.second()
    }

    /// Day of week
    pub fn weekday(&self) -> Weekday {
        self.local.weekday()
    }

    /// ISO 8601 week-numbering year and week number
    pub fn iso_week(&self) -> (i32, u32) {
        let iso = self.local.iso_week();
        (iso.year(), iso.week())
    }

    /// Truncate to the start of the enclosing `unit`
    pub fn round_down(&mut self, unit: TimeUnit) {
        let date = self.local.date();
        let (hour, minute, second) = (self.hour(), self.minute(), self.second());

        self.local = match unit {
            TimeUnit::Second => at(date, hour, minute, second),
            TimeUnit::Minute => at(date, hour, minute, 0),
            TimeUnit::Hour => at(date, hour, 0, 0),
            TimeUnit::Day => at(date, 0, 0, 0),
            TimeUnit::Week => {
                let back = Days::new(u64::from(date.weekday().num_days_from_monday()));
                at(date.checked_sub_days(back).unwrap_or(date), 0, 0, 0)
            }
            TimeUnit::Month => at(date.with_day(1).unwrap_or(date), 0, 0, 0),
            TimeUnit::Year => at(
                NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
                0,
                0,
                0,
            ),
            TimeUnit::IsoYear => {
                let iso_year = date.iso_week().year();
                at(
                    NaiveDate::from_isoywd_opt(iso_year, 1, Weekday::Mon).unwrap_or(date),
                    0,
                    0,
                    0,
                )
            }
        };
    }

    /// Advance to the start of the next `unit` unless already on a boundary
    pub fn round_up<Tz: TimeZone>(&mut self, unit: TimeUnit, tz: &Tz) -> Result<(), TimeParseError> {
        let original = *self;
        self.round_down(unit);

        if *self != original {
            self.add(1, unit, tz)?;
        }

        Ok(())
    }

    /// Add `n` units (negative `n` goes back in time)
    pub fn add<Tz: TimeZone>(&mut self, n: i64, unit: TimeUnit, tz: &Tz) -> Result<(), TimeParseError> {
        if let Some(seconds) = unit.fixed_seconds() {
            let delta = n.checked_mul(seconds).ok_or(TimeParseError::InvalidTime)?;
            let ts = self
                .to_timestamp(tz)?
                .checked_add(delta)
                .ok_or(TimeParseError::InvalidTime)?;
            *self = Self::from_timestamp(tz, ts)?;
            return Ok(());
        }

        let shifted = match unit {
            TimeUnit::Day => shift_days(self.local, n),
            TimeUnit::Week => n.checked_mul(7).and_then(|days| shift_days(self.local, days)),
            TimeUnit::Month => shift_months(self.local, n),
            TimeUnit::Year => n.checked_mul(12).and_then(|months| shift_months(self.local, months)),
            TimeUnit::IsoYear => shift_iso_years(self.local, n),
            TimeUnit::Second | TimeUnit::Minute | TimeUnit::Hour => None,
        };

        self.local = shifted.ok_or(TimeParseError::InvalidTime)?;
        Ok(())
    }

    /// Subtract `n` units
    pub fn sub<Tz: TimeZone>(&mut self, n: i64, unit: TimeUnit, tz: &Tz) -> Result<(), TimeParseError> {
        let n = n.checked_neg().ok_or(TimeParseError::InvalidTime)?;
        self.add(n, unit, tz)
    }
}

impl fmt::Display for CalendarTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.local.format("%Y-%m-%d %H:%M:%S"))
    }
}

fn at(date: NaiveDate, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
    date.and_hms_opt(hour, minute, second)
        .unwrap_or_else(|| date.and_time(NaiveTime::default()))
}

fn shift_days(local: NaiveDateTime, n: i64) -> Option<NaiveDateTime> {
    let days = Days::new(n.unsigned_abs());
    let date = if n >= 0 {
        local.date().checked_add_days(days)?
    } else {
        local.date().checked_sub_days(days)?
    };
    Some(date.and_time(local.time()))
}

fn shift_months(local: NaiveDateTime, n: i64) -> Option<NaiveDateTime> {
    let date = local.date();
    let total = i64::from(date.year())
        .checked_mul(12)?
        .checked_add(i64::from(date.month0()))?
        .checked_add(n)?;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;
    let day = date.day().min(days_in_month(year, month)?);

    Some(NaiveDate::from_ymd_opt(year, month, day)?.and_time(local.time()))
}

fn shift_iso_years(local: NaiveDateTime, n: i64) -> Option<NaiveDateTime> {
    let date = local.date();
    let iso = date.iso_week();
    let year = i32::try_from(i64::from(iso.year()).checked_add(n)?).ok()?;
    let shifted = NaiveDate::from_isoywd_opt(year, iso.week(), date.weekday())
        .or_else(|| NaiveDate::from_isoywd_opt(year, 52, date.weekday()))?;

    Some(shifted.and_time(local.time()))
}

/// Number of days in `month` (1-12) of `year`
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .map(|last| last.day())
}
