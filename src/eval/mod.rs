//! Trend function evaluation
//!
//! [`TrendEvaluator`] answers avg/count/delta/max/min/sum queries over
//! hourly rollup rows read through a [`RollupStore`], consulting the
//! [`TrendFunctionCache`](crate::cache::TrendFunctionCache) first when
//! one is configured.

pub mod aggregate;
pub mod evaluator;
pub mod store;

pub use aggregate::{aggregate, WeightedAvg};
pub use evaluator::TrendEvaluator;
pub use store::{InMemoryRollupStore, RollupStore};
