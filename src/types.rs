//! Core data types shared by the parser, the cache and the evaluators
//!
//! # Key Types
//!
//! - **`ItemId`**: identifier of a monitored numeric item
//! - **`FunctionKind`**: aggregate function requested over trend data
//! - **`ResultState`**: categorical outcome of an aggregate evaluation
//! - **`TrendTable`**: which rollup table holds the item's trends
//! - **`RollupRow`**: one hourly trend row (min/avg/max/count)
//!
//! # Example
//!
//! ```rust
//! use trend_cache::types::{FunctionKind, ResultState, TrendTable};
//!
//! assert_eq!(FunctionKind::Avg.name(), "avg");
//! assert!(ResultState::Normal.is_normal());
//! assert_eq!(TrendTable::Unsigned.name(), "trends_uint");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a monitored item
pub type ItemId = u64;

/// Seconds since the Unix epoch
pub type Timestamp = i64;

/// Seconds in one hour, the granularity of trend rows
pub const SEC_PER_HOUR: i64 = 3600;

/// Aggregate function evaluated over a trend period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FunctionKind {
    /// Weighted average of the hourly averages
    Avg,
    /// Total number of raw samples
    Count,
    /// Difference between the largest maximum and the smallest minimum
    Delta,
    /// Largest hourly maximum
    Max,
    /// Smallest hourly minimum
    Min,
    /// Sum of all raw samples
    Sum,
}

impl FunctionKind {
    /// All functions, in declaration order
    pub const ALL: [FunctionKind; 6] = [
        FunctionKind::Avg,
        FunctionKind::Count,
        FunctionKind::Delta,
        FunctionKind::Max,
        FunctionKind::Min,
        FunctionKind::Sum,
    ];

    /// Lowercase function name as used in trigger expressions
    pub fn name(self) -> &'static str {
        match self {
            FunctionKind::Avg => "avg",
            FunctionKind::Count => "count",
            FunctionKind::Delta => "delta",
            FunctionKind::Max => "max",
            FunctionKind::Min => "min",
            FunctionKind::Sum => "sum",
        }
    }

    /// Look a function up by its name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of an aggregate evaluation
///
/// Only `Normal` carries a meaningful value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResultState {
    /// Outcome not determined
    #[default]
    Unknown,
    /// Value was computed
    Normal,
    /// No rollup rows in range
    NoData,
    /// Value does not fit the numeric representation
    Overflow,
}

impl ResultState {
    /// True when the accompanying value is valid
    pub fn is_normal(self) -> bool {
        self == ResultState::Normal
    }

    /// Label used in metrics and logs
    pub fn as_str(self) -> &'static str {
        match self {
            ResultState::Unknown => "unknown",
            ResultState::Normal => "normal",
            ResultState::NoData => "nodata",
            ResultState::Overflow => "overflow",
        }
    }
}

impl fmt::Display for ResultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rollup table an item's trends are stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendTable {
    /// Floating point items (`trends`)
    Float,
    /// Unsigned integer items (`trends_uint`)
    Unsigned,
}

impl TrendTable {
    /// Table name in the rollup store
    pub fn name(self) -> &'static str {
        match self {
            TrendTable::Float => "trends",
            TrendTable::Unsigned => "trends_uint",
        }
    }

    /// Resolve a table by name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "trends" => Some(TrendTable::Float),
            "trends_uint" => Some(TrendTable::Unsigned),
            _ => None,
        }
    }
}

impl fmt::Display for TrendTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One hourly trend row
///
/// `clock` is the start of the hour the row summarises.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollupRow {
    /// Start of the hourly bucket
    pub clock: Timestamp,
    /// Smallest sample in the hour
    pub value_min: f64,
    /// Average of the samples in the hour
    pub value_avg: f64,
    /// Largest sample in the hour
    pub value_max: f64,
    /// Number of raw samples
    pub num: u64,
}

impl RollupRow {
    /// Create a row
    pub fn new(clock: Timestamp, value_min: f64, value_avg: f64, value_max: f64, num: u64) -> Self {
        Self {
            clock,
            value_min,
            value_avg,
            value_max,
            num,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_names_roundtrip() {
        for f in FunctionKind::ALL {
            assert_eq!(FunctionKind::from_name(f.name()), Some(f));
        }
        assert_eq!(FunctionKind::from_name("median"), None);
    }

    #[test]
    fn test_result_state_default_is_unknown() {
        assert_eq!(ResultState::default(), ResultState::Unknown);
        assert!(!ResultState::NoData.is_normal());
    }

    #[test]
    fn test_trend_table_lookup() {
        assert_eq!(TrendTable::from_name("trends"), Some(TrendTable::Float));
        assert_eq!(TrendTable::from_name("history"), None);
    }
}
