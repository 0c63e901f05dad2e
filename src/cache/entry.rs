//! Cache keys and entries

use crate::types::{FunctionKind, ItemId, ResultState, Timestamp};

/// Key of a cached trend function result
///
/// `start == end` is a valid single-hour query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Item the trends belong to
    pub item_id: ItemId,
    /// Clock of the first hourly bucket
    pub start: Timestamp,
    /// Clock of the last hourly bucket
    pub end: Timestamp,
    /// Aggregate function
    pub function: FunctionKind,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(item_id: ItemId, start: Timestamp, end: Timestamp, function: FunctionKind) -> Self {
        Self {
            item_id,
            start,
            end,
            function,
        }
    }

    /// True when the hourly bucket at `clock` lies inside this key's range
    pub fn covers(&self, clock: Timestamp) -> bool {
        self.start <= clock && clock <= self.end
    }
}

/// A cached result stored inline in an arena slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheEntry {
    /// Lookup key
    pub key: CacheKey,
    /// Result state; `value` is meaningful only for `Normal`
    pub state: ResultState,
    /// Computed aggregate
    pub value: f64,
}
