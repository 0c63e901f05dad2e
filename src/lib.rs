//! Trend Cache - cached trend function evaluation for monitoring servers
//!
//! This library provides:
//! - Calendar-correct resolution of period expressions such as `7d:now/d-1d`
//!   into hourly rollup ranges, across month lengths, ISO weeks and DST
//! - A fixed-capacity, index-linked LRU cache of trend function results
//! - avg/count/delta/max/min/sum evaluators that fall back to rollup storage
//!   on a cache miss
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use trend_cache::{
//!     CacheConfig, InMemoryRollupStore, RollupRow, TrendEvaluator, TrendTable,
//! };
//!
//! let store = Arc::new(InMemoryRollupStore::new());
//! store.insert(TrendTable::Float, 42, RollupRow::new(0, 1.0, 10.0, 12.0, 1));
//! store.insert(TrendTable::Float, 42, RollupRow::new(3600, 15.0, 20.0, 30.0, 3));
//!
//! let evaluator = TrendEvaluator::from_config(store, &CacheConfig::default());
//! assert_eq!(evaluator.eval_avg(TrendTable::Float, 42, 0, 3600), Ok(17.5));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod error;
pub mod eval;
pub mod time;
pub mod types;

/// Prometheus metrics and telemetry
pub mod metrics;

/// Configuration management with TOML support
pub mod config;

// Re-export main types
pub use cache::{CacheKey, CacheStats, TrendFunctionCache};
pub use config::{CacheConfig, Config};
pub use error::{Error, EvalError, Result, StoreError, TimeParseError};
pub use eval::{InMemoryRollupStore, RollupStore, TrendEvaluator};
pub use time::{parse_base, parse_nextcheck, parse_range, TimeUnit};
pub use types::{FunctionKind, ItemId, ResultState, RollupRow, Timestamp, TrendTable};
