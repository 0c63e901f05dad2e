//! Rollup storage boundary
//!
//! Evaluators never own trend data; they read it through [`RollupStore`].
//! [`InMemoryRollupStore`] is a thread-safe implementation backed by
//! ordered maps, used by tests, benchmarks and embedders without a
//! database.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::error::StoreError;
use crate::types::{ItemId, RollupRow, Timestamp, TrendTable};

// =============================================================================
// RollupStore Trait
// =============================================================================

/// Read access to hourly rollup rows
pub trait RollupStore: Send + Sync {
    /// Rows of `item_id` in `table` with `start <= clock <= end`, oldest first
    fn query_rollup(
        &self,
        table: &str,
        item_id: ItemId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<RollupRow>, StoreError>;
}

impl<S: RollupStore + ?Sized> RollupStore for std::sync::Arc<S> {
    fn query_rollup(
        &self,
        table: &str,
        item_id: ItemId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<RollupRow>, StoreError> {
        (**self).query_rollup(table, item_id, start, end)
    }
}

// =============================================================================
// In-memory Store
// =============================================================================

type Rows = BTreeMap<(ItemId, Timestamp), RollupRow>;

/// Rollup rows held in memory, one ordered map per table
///
/// - **Thread Safety**: `RwLock` per store, many concurrent readers
/// - **Query accounting**: every served query bumps a counter so callers
///   can tell cache hits from storage round-trips
#[derive(Debug, Default)]
pub struct InMemoryRollupStore {
    tables: RwLock<HashMap<TrendTable, Rows>>,
    queries: AtomicUsize,
}

impl InMemoryRollupStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the row of `item_id` at `row.clock`
    pub fn insert(&self, table: TrendTable, item_id: ItemId, row: RollupRow) {
        self.tables
            .write()
            .entry(table)
            .or_default()
            .insert((item_id, row.clock), row);
    }

    /// Insert many rows for one item
    pub fn insert_rows<I>(&self, table: TrendTable, item_id: ItemId, rows: I)
    where
        I: IntoIterator<Item = RollupRow>,
    {
        let mut tables = self.tables.write();
        let map = tables.entry(table).or_default();

        for row in rows {
            map.insert((item_id, row.clock), row);
        }
    }

    /// Remove every row of `item_id`, returning how many were dropped
    pub fn remove_item(&self, table: TrendTable, item_id: ItemId) -> usize {
        let mut tables = self.tables.write();
        let Some(map) = tables.get_mut(&table) else {
            return 0;
        };

        let before = map.len();
        map.retain(|&(id, _), _| id != item_id);
        before - map.len()
    }

    /// Number of rows in `table`
    pub fn len(&self, table: TrendTable) -> usize {
        self.tables.read().get(&table).map_or(0, BTreeMap::len)
    }

    /// True when no table holds rows
    pub fn is_empty(&self) -> bool {
        self.tables.read().values().all(BTreeMap::is_empty)
    }

    /// Number of queries served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    /// Reset the query counter
    pub fn reset_query_count(&self) {
        self.queries.store(0, Ordering::Relaxed);
    }
}

impl RollupStore for InMemoryRollupStore {
    fn query_rollup(
        &self,
        table: &str,
        item_id: ItemId,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<RollupRow>, StoreError> {
        let table =
            TrendTable::from_name(table).ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;

        self.queries.fetch_add(1, Ordering::Relaxed);

        if start > end {
            return Ok(Vec::new());
        }

        let tables = self.tables.read();
        let rows = tables
            .get(&table)
            .map(|map| {
                map.range((item_id, start)..=(item_id, end))
                    .map(|(_, row)| *row)
                    .collect()
            })
            .unwrap_or_default();

        Ok(rows)
    }
}
