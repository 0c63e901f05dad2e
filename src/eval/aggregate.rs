//! Aggregation of hourly rollup rows
//!
//! Pure functions turning the rows a rollup store returned into one
//! `(value, state)` pair per trend function. Nothing here touches the
//! cache or the store.

use crate::error::EvalError;
use crate::types::{FunctionKind, ResultState, RollupRow, TrendTable};

/// Running weighted mean of per-row averages
///
/// Rows are combined pairwise, each weighted by its sample count, so
/// rows that summarise more samples pull the mean harder.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedAvg {
    avg: f64,
    num: u64,
}

impl WeightedAvg {
    /// Fold one row's average and sample count into the mean
    ///
    /// Fails with [`EvalError::Overflow`] when the total sample count no
    /// longer fits a `u64`; the mean is left unchanged in that case.
    pub fn push(&mut self, avg: f64, num: u64) -> Result<(), EvalError> {
        if num == 0 {
            return Ok(());
        }

        let total = self.num.checked_add(num).ok_or(EvalError::Overflow)?;
        self.avg = self.avg * (self.num as f64 / total as f64) + avg * (num as f64 / total as f64);
        self.num = total;
        Ok(())
    }

    /// Current mean, `None` until a row with samples was pushed
    pub fn value(&self) -> Option<f64> {
        (self.num > 0).then_some(self.avg)
    }

    /// Samples accumulated so far
    pub fn num(&self) -> u64 {
        self.num
    }
}

/// Compute `function` over `rows`
///
/// An empty row set is `NoData` for every function except `Count`, where
/// the count of nothing is a valid zero.
pub fn aggregate(function: FunctionKind, table: TrendTable, rows: &[RollupRow]) -> (f64, ResultState) {
    if rows.is_empty() {
        return match function {
            FunctionKind::Count => (0.0, ResultState::Normal),
            _ => (0.0, ResultState::NoData),
        };
    }

    match function {
        FunctionKind::Avg => avg(rows),
        FunctionKind::Count => count(rows),
        FunctionKind::Delta => delta(rows),
        FunctionKind::Max => normal(rows.iter().map(|r| r.value_max).fold(f64::MIN, f64::max)),
        FunctionKind::Min => normal(rows.iter().map(|r| r.value_min).fold(f64::MAX, f64::min)),
        FunctionKind::Sum => sum(table, rows),
    }
}

fn normal(value: f64) -> (f64, ResultState) {
    (value, ResultState::Normal)
}

fn avg(rows: &[RollupRow]) -> (f64, ResultState) {
    let mut mean = WeightedAvg::default();
    for row in rows {
        if mean.push(row.value_avg, row.num).is_err() {
            return (0.0, ResultState::Overflow);
        }
    }

    match mean.value() {
        Some(value) => normal(value),
        None => (0.0, ResultState::NoData),
    }
}

fn count(rows: &[RollupRow]) -> (f64, ResultState) {
    let total = rows.iter().fold(0u64, |acc, row| acc.saturating_add(row.num));
    normal(total as f64)
}

fn delta(rows: &[RollupRow]) -> (f64, ResultState) {
    let max = rows.iter().map(|r| r.value_max).fold(f64::MIN, f64::max);
    let min = rows.iter().map(|r| r.value_min).fold(f64::MAX, f64::min);

    normal(max - min)
}

/// Sum of all samples, reconstructed as `avg * num` per row
fn sum(table: TrendTable, rows: &[RollupRow]) -> (f64, ResultState) {
    let total: f64 = rows.iter().map(|r| r.value_avg * r.num as f64).sum();

    let overflow = match table {
        TrendTable::Float => !total.is_finite(),
        TrendTable::Unsigned => !total.is_finite() || total > u64::MAX as f64,
    };

    if overflow {
        (0.0, ResultState::Overflow)
    } else {
        normal(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(clock: i64, min: f64, avg: f64, max: f64, num: u64) -> RollupRow {
        RollupRow::new(clock, min, avg, max, num)
    }

    #[test]
    fn test_weighted_avg() {
        let rows = [row(0, 10.0, 10.0, 10.0, 1), row(3600, 20.0, 20.0, 20.0, 3)];
        let (value, state) = aggregate(FunctionKind::Avg, TrendTable::Float, &rows);

        assert_eq!(state, ResultState::Normal);
        assert!((value - 17.5).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_avg_skips_empty_rows() {
        let mut mean = WeightedAvg::default();
        assert_eq!(mean.value(), None);

        mean.push(100.0, 0).unwrap();
        mean.push(4.0, 2).unwrap();
        assert_eq!(mean.value(), Some(4.0));
        assert_eq!(mean.num(), 2);
    }

    #[test]
    fn test_weighted_avg_sample_count_overflow() {
        let rows = [row(0, 1.0, 1.0, 1.0, u64::MAX), row(3600, 2.0, 2.0, 2.0, 1)];

        assert_eq!(
            aggregate(FunctionKind::Avg, TrendTable::Float, &rows),
            (0.0, ResultState::Overflow)
        );
        // count saturates instead
        assert_eq!(
            aggregate(FunctionKind::Count, TrendTable::Float, &rows),
            (u64::MAX as f64, ResultState::Normal)
        );

        let mut mean = WeightedAvg::default();
        mean.push(1.0, u64::MAX).unwrap();
        assert_eq!(mean.push(2.0, 1), Err(EvalError::Overflow));
        assert_eq!(mean.value(), Some(1.0));
        assert_eq!(mean.num(), u64::MAX);
    }

    #[test]
    fn test_empty_rows() {
        for function in FunctionKind::ALL {
            let (value, state) = aggregate(function, TrendTable::Float, &[]);
            if function == FunctionKind::Count {
                assert_eq!((value, state), (0.0, ResultState::Normal));
            } else {
                assert_eq!(state, ResultState::NoData);
            }
        }
    }

    #[test]
    fn test_min_max_delta_count() {
        let rows = [row(0, 1.0, 2.0, 5.0, 4), row(3600, -3.0, 0.0, 2.0, 6)];

        assert_eq!(aggregate(FunctionKind::Min, TrendTable::Float, &rows).0, -3.0);
        assert_eq!(aggregate(FunctionKind::Max, TrendTable::Float, &rows).0, 5.0);
        assert_eq!(aggregate(FunctionKind::Delta, TrendTable::Float, &rows).0, 8.0);
        assert_eq!(aggregate(FunctionKind::Count, TrendTable::Float, &rows).0, 10.0);
    }

    #[test]
    fn test_sum() {
        let rows = [row(0, 1.0, 2.0, 3.0, 4), row(3600, 1.0, 1.5, 2.0, 2)];
        assert_eq!(
            aggregate(FunctionKind::Sum, TrendTable::Float, &rows),
            (11.0, ResultState::Normal)
        );
    }

    #[test]
    fn test_sum_overflow() {
        let huge = [row(0, 0.0, f64::MAX, f64::MAX, 2)];
        assert_eq!(
            aggregate(FunctionKind::Sum, TrendTable::Float, &huge).1,
            ResultState::Overflow
        );

        let unsigned = [row(0, 0.0, u64::MAX as f64, u64::MAX as f64, 2)];
        assert_eq!(
            aggregate(FunctionKind::Sum, TrendTable::Unsigned, &unsigned).1,
            ResultState::Overflow
        );
        // the same total is representable as a float
        assert_eq!(
            aggregate(FunctionKind::Sum, TrendTable::Float, &unsigned).1,
            ResultState::Normal
        );
    }
}
