//! Time Range Resolution Integration Tests
//!
//! Resolves period parameters in real time zones, covering DST
//! transitions, month lengths and ISO week numbering.

use chrono::{TimeZone, Utc};
use chrono_tz::America::New_York;
use trend_cache::time::{
    parse_base, parse_nextcheck_in, parse_range, parse_range_in, parse_timeshift_in, CalendarTime,
    TimeUnit,
};
use trend_cache::TimeParseError;

const HOUR: i64 = 3600;

// =============================================================================
// Helper Functions
// =============================================================================

fn utc(y: i32, mo: u32, d: u32, h: u32) -> i64 {
    Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap().timestamp()
}

fn new_york(y: i32, mo: u32, d: u32, h: u32) -> i64 {
    New_York.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap().timestamp()
}

// =============================================================================
// Daylight Saving Time
// =============================================================================

#[test]
fn test_day_before_spring_forward() {
    let from = new_york(2024, 3, 10, 12);
    let (start, end) = parse_range_in(&New_York, from, "1d:now/d").unwrap();

    assert_eq!(start, new_york(2024, 3, 9, 0));
    assert_eq!(end, new_york(2024, 3, 9, 23));
    assert_eq!(end + HOUR, new_york(2024, 3, 10, 0));
    assert_eq!(end - start, 23 * HOUR);
}

#[test]
fn test_spring_forward_day_is_23_hours() {
    let from = new_york(2024, 3, 10, 12);
    let (start, end) = parse_range_in(&New_York, from, "1d:now/d+1d").unwrap();

    assert_eq!(start, new_york(2024, 3, 10, 0));
    assert_eq!(end + HOUR, new_york(2024, 3, 11, 0));
    // 23 hourly buckets, 22 hours between first and last
    assert_eq!(end - start, 22 * HOUR);
}

#[test]
fn test_fall_back_day_is_25_hours() {
    let from = new_york(2024, 11, 3, 12);
    let (start, end) = parse_range_in(&New_York, from, "1d:now/d+1d").unwrap();

    assert_eq!(start, new_york(2024, 11, 3, 0));
    assert_eq!(end - start, 24 * HOUR);
}

#[test]
fn test_gap_time_moves_forward() {
    let tm = CalendarTime::from_ymd_hms(2024, 3, 10, 2, 30, 0).unwrap();
    let expected = Utc.with_ymd_and_hms(2024, 3, 10, 7, 30, 0).unwrap().timestamp();

    assert_eq!(tm.to_timestamp(&New_York).unwrap(), expected);
}

#[test]
fn test_ambiguous_time_takes_earliest() {
    let tm = CalendarTime::from_ymd_hms(2024, 11, 3, 1, 30, 0).unwrap();
    let expected = Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap().timestamp();

    assert_eq!(tm.to_timestamp(&New_York).unwrap(), expected);
}

#[test]
fn test_hour_steps_cross_dst() {
    let from = new_york(2024, 3, 10, 0);
    let tm = parse_timeshift_in(&New_York, from, "now+3h", TimeUnit::Hour).unwrap();

    // 00:00 EST + 3 hours is 04:00 EDT
    assert_eq!(tm.hour(), 4);
    assert_eq!(tm.to_timestamp(&New_York).unwrap(), from + 3 * HOUR);
}

// =============================================================================
// Calendar Arithmetic
// =============================================================================

#[test]
fn test_month_add_clamps_day() {
    let mut leap = CalendarTime::from_ymd_hms(2024, 1, 31, 10, 0, 0).unwrap();
    leap.add(1, TimeUnit::Month, &Utc).unwrap();
    assert_eq!((leap.month(), leap.day(), leap.hour()), (2, 29, 10));

    let mut common = CalendarTime::from_ymd_hms(2023, 1, 31, 10, 0, 0).unwrap();
    common.add(1, TimeUnit::Month, &Utc).unwrap();
    assert_eq!((common.month(), common.day()), (2, 28));

    let mut back = CalendarTime::from_ymd_hms(2024, 3, 31, 0, 0, 0).unwrap();
    back.sub(1, TimeUnit::Month, &Utc).unwrap();
    assert_eq!((back.month(), back.day()), (2, 29));
}

#[test]
fn test_year_add_from_leap_day() {
    let mut tm = CalendarTime::from_ymd_hms(2024, 2, 29, 0, 0, 0).unwrap();
    tm.add(1, TimeUnit::Year, &Utc).unwrap();
    assert_eq!((tm.year(), tm.month(), tm.day()), (2025, 2, 28));
}

#[test]
fn test_iso_year_round_down() {
    // Saturday 2021-01-02 belongs to ISO week 53 of 2020
    let mut tm = CalendarTime::from_ymd_hms(2021, 1, 2, 15, 0, 0).unwrap();
    assert_eq!(tm.iso_week(), (2020, 53));

    tm.round_down(TimeUnit::IsoYear);
    assert_eq!((tm.year(), tm.month(), tm.day()), (2019, 12, 30));
}

#[test]
fn test_iso_year_add_clamps_week_53() {
    let mut tm = CalendarTime::from_ymd_hms(2020, 12, 31, 0, 0, 0).unwrap();
    assert_eq!(tm.iso_week(), (2020, 53));

    tm.add(1, TimeUnit::IsoYear, &Utc).unwrap();
    assert_eq!(tm.iso_week(), (2021, 52));
    assert_eq!((tm.year(), tm.month(), tm.day()), (2021, 12, 30));
}

#[test]
fn test_round_up() {
    let mut on_boundary = CalendarTime::from_ymd_hms(2024, 5, 1, 0, 0, 0).unwrap();
    on_boundary.round_up(TimeUnit::Month, &Utc).unwrap();
    assert_eq!((on_boundary.month(), on_boundary.day()), (5, 1));

    let mut inside = CalendarTime::from_ymd_hms(2024, 5, 17, 13, 0, 0).unwrap();
    inside.round_up(TimeUnit::Month, &Utc).unwrap();
    assert_eq!((inside.month(), inside.day(), inside.hour()), (6, 1, 0));
}

// =============================================================================
// Range Resolution
// =============================================================================

#[test]
fn test_week_range_starts_monday() {
    // Friday
    let from = utc(2024, 5, 17, 13);
    let (start, end) = parse_range_in(&Utc, from, "1w:now/w").unwrap();

    assert_eq!(start, utc(2024, 5, 6, 0));
    assert_eq!(end, utc(2024, 5, 12, 23));
}

#[test]
fn test_week_period_anchored_on_iso_year() {
    let from = utc(2021, 5, 17, 13);
    let (start, end) = parse_range_in(&Utc, from, "1w:now/y").unwrap();

    // ISO week 1 of 2021 starts on Monday 2021-01-04
    assert_eq!(start, utc(2020, 12, 28, 0));
    assert_eq!(end, utc(2021, 1, 3, 23));
}

#[test]
fn test_month_range_covers_leap_february() {
    let from = utc(2024, 3, 31, 12);
    let (start, end) = parse_range_in(&Utc, from, "1M:now/M").unwrap();

    assert_eq!(start, utc(2024, 2, 1, 0));
    assert_eq!(end, utc(2024, 2, 29, 23));
}

#[test]
fn test_previous_days_window() {
    let from = utc(2024, 5, 17, 13);
    let (start, end) = parse_range_in(&Utc, from, "7d:now/d-1d").unwrap();

    assert_eq!(start, utc(2024, 5, 9, 0));
    assert_eq!(end, utc(2024, 5, 15, 23));
}

#[test]
fn test_year_period_limit() {
    let from = utc(2024, 5, 17, 13);

    assert!(parse_range_in(&Utc, from, "1y:now/y").is_ok());
    assert!(parse_range_in(&Utc, from, "366d:now/d").is_ok());
    assert_eq!(
        parse_range_in(&Utc, from, "367d:now/d"),
        Err(TimeParseError::PeriodTooLarge)
    );
    assert_eq!(
        parse_range_in(&Utc, from, "13M:now/M"),
        Err(TimeParseError::PeriodTooLarge)
    );
}

#[test]
fn test_shift_must_start_with_now() {
    let from = utc(2024, 5, 17, 13);
    assert!(matches!(
        parse_range_in(&Utc, from, "1d:today/d"),
        Err(TimeParseError::InvalidShift(_))
    ));
}

#[test]
fn test_local_zone_range_is_ordered() {
    let from = utc(2024, 5, 17, 13);
    let (start, end) = parse_range(from, "3d:now/d").unwrap();
    assert!(start <= end);
}

// =============================================================================
// Period Base and Next Check
// =============================================================================

#[test]
fn test_parse_base_examples() {
    assert_eq!(parse_base("now/w-1h").unwrap(), TimeUnit::Week);
    assert_eq!(parse_base("now/h").unwrap(), TimeUnit::Hour);
    assert_eq!(parse_base("now/d-1w/M").unwrap(), TimeUnit::Month);
    assert!(matches!(parse_base("now-1h"), Err(TimeParseError::InvalidShift(_))));
}

#[test]
fn test_nextcheck_month_rollover() {
    let from = utc(2024, 1, 31, 12);
    assert_eq!(parse_nextcheck_in(&Utc, from, "now/M").unwrap(), utc(2024, 1, 31, 23));
}

#[test]
fn test_nextcheck_month_with_day_offset() {
    let from = utc(2024, 1, 31, 12);
    assert_eq!(
        parse_nextcheck_in(&Utc, from, "now/M+30d").unwrap(),
        utc(2024, 3, 1, 23)
    );

    // every later check lands on the 30th day after a month start
    let next = parse_nextcheck_in(&Utc, utc(2024, 3, 2, 0), "now/M+30d").unwrap();
    assert_eq!(next, utc(2024, 3, 30, 23));
}

#[test]
fn test_nextcheck_hourly() {
    let from = Utc.with_ymd_and_hms(2024, 5, 17, 13, 20, 0).unwrap().timestamp();
    assert_eq!(parse_nextcheck_in(&Utc, from, "now/h").unwrap(), utc(2024, 5, 17, 14));
}

#[test]
fn test_nextcheck_across_dst() {
    let from = new_york(2024, 3, 9, 12);
    assert_eq!(
        parse_nextcheck_in(&New_York, from, "now/d").unwrap(),
        new_york(2024, 3, 9, 23)
    );
}
