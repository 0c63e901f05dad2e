//! Calendar-correct trend period resolution
//!
//! Turns human period expressions such as `7d:now/d-1d` into absolute
//! hourly bucket ranges, and computes when such a relative window next
//! rolls over.
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use trend_cache::time::{parse_base, parse_range_in, TimeUnit};
//!
//! let from = Utc.with_ymd_and_hms(2024, 5, 17, 13, 0, 0).unwrap().timestamp();
//! let (start, end) = parse_range_in(&Utc, from, "1d:now/d").unwrap();
//! assert_eq!(end - start, 23 * 3600);
//!
//! assert_eq!(parse_base("now/w-1h").unwrap(), TimeUnit::Week);
//! ```

mod calendar;
mod range;
mod unit;

pub use calendar::{days_in_month, CalendarTime};
pub use range::{
    parse_base, parse_nextcheck, parse_nextcheck_in, parse_period, parse_range, parse_range_in,
    parse_timeshift, parse_timeshift_in, Period,
};
pub use unit::TimeUnit;
