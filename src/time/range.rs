//! Trend period and period shift parsing
//!
//! A trend period parameter has the form `<period>:<shift>`, for example
//! `7d:now/d-1d`: seven days ending at yesterday's midnight. The shift
//! starts with `now` and applies its operators left to right:
//!
//! - `/<unit>` rounds down to the start of the unit
//! - `+<count><unit>` and `-<count><unit>` move by calendar units
//!
//! Trend rows are stored per hour and keyed by the start of the hour, so
//! the end of a resolved range is the clock of the last complete hourly
//! bucket, one hour before the shifted time.

use chrono::{Local, TimeZone};
use nom::{
    character::complete::{anychar, digit1},
    combinator::{map_opt, map_res},
    IResult, Parser,
};

use super::{CalendarTime, TimeUnit};
use crate::error::TimeParseError;
use crate::types::{Timestamp, SEC_PER_HOUR};

/// Seconds in a non-leap year
const SEC_PER_YEAR: i64 = 365 * 24 * SEC_PER_HOUR;

/// Largest distance between evaluation time and period end
const MAX_SHIFT_SECONDS: i64 = 26 * SEC_PER_YEAR;

/// Largest period length in hours
const MAX_PERIOD_HOURS: u64 = 24 * 366;

/// Upper bound on base steps taken while searching the next check
const MAX_NEXTCHECK_STEPS: usize = 10_000;

/// Parsed `<count><unit>` period token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    /// Number of units
    pub count: u64,
    /// Calendar unit
    pub unit: TimeUnit,
    /// Bytes of input consumed by the token
    pub consumed: usize,
}

/// One operator of a shift expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShiftStep {
    Round(TimeUnit),
    Move(i64, TimeUnit),
}

impl ShiftStep {
    fn unit(self) -> TimeUnit {
        match self {
            ShiftStep::Round(unit) | ShiftStep::Move(_, unit) => unit,
        }
    }
}

fn unit_letter(input: &str) -> IResult<&str, TimeUnit> {
    map_opt(anychar, TimeUnit::from_letter).parse(input)
}

fn count_and_unit(input: &str) -> IResult<&str, (u64, TimeUnit)> {
    (map_res(digit1, |digits: &str| digits.parse::<u64>()), unit_letter).parse(input)
}

/// Parse a `<count><unit>` token at the start of `text`
///
/// Trailing input is left unconsumed and reported through
/// [`Period::consumed`].
pub fn parse_period(text: &str) -> Result<Period, TimeParseError> {
    if text.starts_with('-') {
        return Err(TimeParseError::InvalidPeriod(format!(
            "negative period \"{text}\""
        )));
    }

    let (rest, (count, unit)) = count_and_unit(text).map_err(|_| period_error(text))?;

    Ok(Period {
        count,
        unit,
        consumed: text.len() - rest.len(),
    })
}

/// A count that only fails because it does not fit a `u64` is too large,
/// anything else is malformed
fn period_error(text: &str) -> TimeParseError {
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    let unit_follows = unit_letter(&text[digits..]).is_ok();

    if digits > 0 && unit_follows && text[..digits].parse::<u64>().is_err() {
        TimeParseError::PeriodTooLarge
    } else {
        TimeParseError::InvalidPeriod(format!("\"{text}\""))
    }
}

/// Find the coarsest unit the shift rounds to
///
/// Every `/` must be followed by a valid unit letter.
pub fn parse_base(shift: &str) -> Result<TimeUnit, TimeParseError> {
    let mut base: Option<TimeUnit> = None;
    let mut rest = shift;

    while let Some(pos) = rest.find('/') {
        rest = &rest[pos + 1..];
        let (_, unit) = unit_letter(rest).map_err(|_| {
            TimeParseError::InvalidShift(format!("invalid time unit at \"{rest}\""))
        })?;
        base = Some(base.map_or(unit, |b| b.max(unit)));
    }

    base.ok_or_else(|| {
        TimeParseError::InvalidShift("period shift must contain rounding to a time unit".into())
    })
}

fn parse_steps(shift: &str) -> Result<Vec<ShiftStep>, TimeParseError> {
    let mut rest = shift
        .strip_prefix("now")
        .ok_or_else(|| TimeParseError::InvalidShift(format!("\"{shift}\" must start with \"now\"")))?;
    let mut steps = Vec::new();

    while let Some(op) = rest.chars().next() {
        let operand = &rest[op.len_utf8()..];

        match op {
            '/' => {
                let (next, unit) = unit_letter(operand).map_err(|_| {
                    TimeParseError::InvalidShift(format!("invalid time unit at \"{operand}\""))
                })?;
                steps.push(ShiftStep::Round(unit));
                rest = next;
            }
            '+' | '-' => {
                let (next, (count, unit)) = count_and_unit(operand).map_err(|_| {
                    TimeParseError::InvalidShift(format!("invalid time shift at \"{operand}\""))
                })?;
                let count = i64::try_from(count).map_err(|_| TimeParseError::ShiftTooLarge)?;
                steps.push(ShiftStep::Move(if op == '-' { -count } else { count }, unit));
                rest = next;
            }
            _ => return Err(TimeParseError::UnexpectedCharacter(rest.to_string())),
        }
    }

    Ok(steps)
}

/// Year steps in a week-based shift count in ISO years so weeks stay whole
fn effective_unit(unit: TimeUnit, min_unit: TimeUnit) -> TimeUnit {
    if unit == TimeUnit::Year && min_unit == TimeUnit::Week {
        TimeUnit::IsoYear
    } else {
        unit
    }
}

/// Resolve a shift expression relative to `from` in the local zone
pub fn parse_timeshift(
    from: Timestamp,
    shift: &str,
    min_unit: TimeUnit,
) -> Result<CalendarTime, TimeParseError> {
    parse_timeshift_in(&Local, from, shift, min_unit)
}

/// Resolve a shift expression relative to `from` in the zone `tz`
///
/// Operators finer than `min_unit` are rejected: rounding or moving by
/// less than the period unit is ambiguous.
pub fn parse_timeshift_in<Tz: TimeZone>(
    tz: &Tz,
    from: Timestamp,
    shift: &str,
    min_unit: TimeUnit,
) -> Result<CalendarTime, TimeParseError> {
    let steps = parse_steps(shift)?;
    let mut tm = CalendarTime::from_timestamp(tz, from)?;

    for step in steps {
        let unit = effective_unit(step.unit(), min_unit);

        if unit < min_unit {
            return Err(TimeParseError::InvalidShift(format!(
                "time unit \"{}\" in period shift is finer than period unit \"{}\"",
                unit.letter(),
                min_unit.letter()
            )));
        }

        match step {
            ShiftStep::Round(_) => tm.round_down(unit),
            ShiftStep::Move(n, _) => tm.add(n, unit, tz)?,
        }
    }

    Ok(tm)
}

/// Resolve a `<period>:<shift>` parameter in the local zone
pub fn parse_range(from: Timestamp, param: &str) -> Result<(Timestamp, Timestamp), TimeParseError> {
    parse_range_in(&Local, from, param)
}

/// Resolve a `<period>:<shift>` parameter in the zone `tz`
///
/// Returns `(start, end)` hourly bucket clocks, both inclusive, with
/// `start <= end`.
pub fn parse_range_in<Tz: TimeZone>(
    tz: &Tz,
    from: Timestamp,
    param: &str,
) -> Result<(Timestamp, Timestamp), TimeParseError> {
    let (period_text, shift_text) = param
        .split_once(':')
        .ok_or_else(|| TimeParseError::InvalidShift(format!("missing period shift in \"{param}\"")))?;

    let period = parse_period(period_text)?;

    if period.consumed != period_text.len() {
        return Err(TimeParseError::InvalidPeriod(format!("\"{period_text}\"")));
    }

    if period.count == 0 {
        return Err(TimeParseError::ZeroPeriod);
    }

    if period.unit < TimeUnit::Hour {
        return Err(TimeParseError::InvalidPeriod(format!(
            "period unit must be at least an hour in \"{period_text}\""
        )));
    }

    match period.count.checked_mul(period.unit.hours()) {
        Some(hours) if hours <= MAX_PERIOD_HOURS => {}
        _ => return Err(TimeParseError::PeriodTooLarge),
    }

    // bounded by MAX_PERIOD_HOURS
    let count = period.count as i64;

    let tm_end = parse_timeshift_in(tz, from, shift_text, period.unit)?;
    let mut tm_start = tm_end;
    tm_start.sub(count, period.unit, tz)?;

    let end = tm_end.to_timestamp(tz)? - SEC_PER_HOUR;
    let start = tm_start.to_timestamp(tz)?;

    if (from - end).abs() > MAX_SHIFT_SECONDS {
        return Err(TimeParseError::ShiftTooLarge);
    }

    Ok((start, end))
}

/// Next time the window of `shift` rolls over, in the local zone
pub fn parse_nextcheck(from: Timestamp, shift: &str) -> Result<Timestamp, TimeParseError> {
    parse_nextcheck_in(&Local, from, shift)
}

/// Next time the window of `shift` rolls over, in the zone `tz`
///
/// Moves by units at or above the base unit cannot change when the
/// rounded window advances, so only finer moves are applied. The result
/// is always later than `from`.
pub fn parse_nextcheck_in<Tz: TimeZone>(
    tz: &Tz,
    from: Timestamp,
    shift: &str,
) -> Result<Timestamp, TimeParseError> {
    let base = parse_base(shift)?;

    if base < TimeUnit::Hour {
        return Err(TimeParseError::InvalidShift(format!(
            "period shift base \"{}\" must be at least an hour",
            base.letter()
        )));
    }

    let steps = parse_steps(shift)?;
    // parse_base guarantees at least one rounding step
    let split = steps
        .iter()
        .rposition(|step| matches!(step, ShiftStep::Round(_)))
        .map_or(0, |pos| pos + 1);
    let (head, tail) = steps.split_at(split);

    let mut anchor = CalendarTime::from_timestamp(tz, from)?;
    apply_fine_steps(&mut anchor, head, base, tz)?;

    // candidates step the rounded anchor, then re-apply the trailing moves
    for k in 0..MAX_NEXTCHECK_STEPS as i64 {
        let mut tm = anchor;
        if k > 0 {
            tm.add(k, base, tz)?;
        }
        apply_fine_steps(&mut tm, tail, base, tz)?;

        let next = tm.to_timestamp(tz)? - SEC_PER_HOUR;
        if next > from {
            return Ok(next);
        }
    }

    Err(TimeParseError::ShiftTooLarge)
}

fn apply_fine_steps<Tz: TimeZone>(
    tm: &mut CalendarTime,
    steps: &[ShiftStep],
    base: TimeUnit,
    tz: &Tz,
) -> Result<(), TimeParseError> {
    for step in steps {
        match *step {
            ShiftStep::Round(unit) => tm.round_down(unit),
            ShiftStep::Move(n, unit) if unit < base => tm.add(n, unit, tz)?,
            ShiftStep::Move(..) => {}
        }
    }
    Ok(())
}
