//! Trend function evaluator
//!
//! Every evaluation follows the same path:
//!
//! ```text
//! eval(function, table, item, start, end)
//!   ├─ cache hit  → (value, state)
//!   └─ cache miss → RollupStore::query_rollup → aggregate → cache.put
//! ```
//!
//! The cache lock is never held across the storage query. Two threads
//! missing the same key both query storage and both store the result,
//! which costs duplicate work but never a wrong answer.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, TimeZone};
use tracing::{debug, warn};

use super::aggregate::aggregate;
use super::store::RollupStore;
use crate::cache::{CacheKey, TrendFunctionCache};
use crate::config::CacheConfig;
use crate::error::{EvalError, Result};
use crate::metrics;
use crate::time::parse_range_in;
use crate::types::{FunctionKind, ItemId, ResultState, Timestamp, TrendTable};

/// Evaluates trend functions over a rollup store, optionally cached
///
/// Without a cache every evaluation goes straight to storage; there is
/// no empty cache object to consult.
#[derive(Clone)]
pub struct TrendEvaluator {
    store: Arc<dyn RollupStore>,
    cache: Option<Arc<TrendFunctionCache>>,
}

impl std::fmt::Debug for TrendEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrendEvaluator")
            .field("cache", &self.cache.as_ref().map(|c| c.capacity()))
            .finish_non_exhaustive()
    }
}

impl TrendEvaluator {
    /// Create an evaluator with an optional shared cache
    pub fn new(store: Arc<dyn RollupStore>, cache: Option<Arc<TrendFunctionCache>>) -> Self {
        Self { store, cache }
    }

    /// Create an evaluator with a cache sized by configuration
    pub fn from_config(store: Arc<dyn RollupStore>, config: &CacheConfig) -> Self {
        Self::new(store, TrendFunctionCache::new(config).map(Arc::new))
    }

    /// Create an evaluator that always queries storage
    pub fn uncached(store: Arc<dyn RollupStore>) -> Self {
        Self::new(store, None)
    }

    /// The shared cache, if caching is enabled
    pub fn cache(&self) -> Option<&Arc<TrendFunctionCache>> {
        self.cache.as_ref()
    }

    /// Average of the trend data, weighted by sample count
    pub fn eval_avg(
        &self,
        table: TrendTable,
        item_id: ItemId,
        start: Timestamp,
        end: Timestamp,
    ) -> std::result::Result<f64, EvalError> {
        self.eval(FunctionKind::Avg, table, item_id, start, end)
    }

    /// Number of raw samples; an empty range counts as zero
    pub fn eval_count(
        &self,
        table: TrendTable,
        item_id: ItemId,
        start: Timestamp,
        end: Timestamp,
    ) -> std::result::Result<f64, EvalError> {
        self.eval(FunctionKind::Count, table, item_id, start, end)
    }

    /// Largest maximum minus smallest minimum
    pub fn eval_delta(
        &self,
        table: TrendTable,
        item_id: ItemId,
        start: Timestamp,
        end: Timestamp,
    ) -> std::result::Result<f64, EvalError> {
        self.eval(FunctionKind::Delta, table, item_id, start, end)
    }

    /// Largest hourly maximum
    pub fn eval_max(
        &self,
        table: TrendTable,
        item_id: ItemId,
        start: Timestamp,
        end: Timestamp,
    ) -> std::result::Result<f64, EvalError> {
        self.eval(FunctionKind::Max, table, item_id, start, end)
    }

    /// Smallest hourly minimum
    pub fn eval_min(
        &self,
        table: TrendTable,
        item_id: ItemId,
        start: Timestamp,
        end: Timestamp,
    ) -> std::result::Result<f64, EvalError> {
        self.eval(FunctionKind::Min, table, item_id, start, end)
    }

    /// Sum of all raw samples
    pub fn eval_sum(
        &self,
        table: TrendTable,
        item_id: ItemId,
        start: Timestamp,
        end: Timestamp,
    ) -> std::result::Result<f64, EvalError> {
        self.eval(FunctionKind::Sum, table, item_id, start, end)
    }

    /// Evaluate `function` over the hourly buckets `start..=end`
    ///
    /// Returns the value only for a normal result; every other state is
    /// an error carrying a human-readable reason.
    pub fn eval(
        &self,
        function: FunctionKind,
        table: TrendTable,
        item_id: ItemId,
        start: Timestamp,
        end: Timestamp,
    ) -> std::result::Result<f64, EvalError> {
        let (value, state) = self.evaluate(function, table, item_id, start, end)?;

        metrics::record_evaluation(function.name(), state.as_str());

        match state {
            ResultState::Normal => Ok(value),
            ResultState::NoData => Err(EvalError::NoData),
            ResultState::Overflow => Err(EvalError::Overflow),
            ResultState::Unknown => Err(EvalError::Unknown),
        }
    }

    /// Evaluate `function` and return the raw `(value, state)` pair
    ///
    /// Computed states, including `NoData` and `Overflow`, are cached.
    /// A failed storage query is returned as an error and leaves the
    /// cache untouched.
    pub fn evaluate(
        &self,
        function: FunctionKind,
        table: TrendTable,
        item_id: ItemId,
        start: Timestamp,
        end: Timestamp,
    ) -> std::result::Result<(f64, ResultState), EvalError> {
        let key = CacheKey::new(item_id, start, end, function);

        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get(&key)) {
            return Ok(cached);
        }

        debug!(
            item_id,
            start,
            end,
            function = %function,
            table = %table,
            "Querying trends for function evaluation"
        );

        let timer = Instant::now();
        let rows = self
            .store
            .query_rollup(table.name(), item_id, start, end)
            .map_err(|e| {
                warn!(item_id, table = %table, error = %e, "Trend query failed");
                metrics::record_error("storage", "query_rollup");
                EvalError::Storage(e)
            })?;
        metrics::record_store_query(table.name(), timer.elapsed().as_secs_f64());

        let (value, state) = aggregate(function, table, &rows);

        if let Some(cache) = &self.cache {
            cache.put(key, value, state);
        }

        Ok((value, state))
    }

    /// Evaluate `function` over a `<period>:<shift>` parameter in local time
    pub fn eval_period(
        &self,
        function: FunctionKind,
        table: TrendTable,
        item_id: ItemId,
        from: Timestamp,
        param: &str,
    ) -> Result<f64> {
        self.eval_period_in(&Local, function, table, item_id, from, param)
    }

    /// Evaluate `function` over a `<period>:<shift>` parameter in zone `tz`
    pub fn eval_period_in<Tz: TimeZone>(
        &self,
        tz: &Tz,
        function: FunctionKind,
        table: TrendTable,
        item_id: ItemId,
        from: Timestamp,
        param: &str,
    ) -> Result<f64> {
        let (start, end) = parse_range_in(tz, from, param)?;

        Ok(self.eval(function, table, item_id, start, end)?)
    }
}
