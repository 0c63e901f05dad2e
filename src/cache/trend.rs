//! Trend function cache
//!
//! Caches the results of trend aggregate functions keyed by
//! `(item, start, end, function)`. Capacity is fixed when the cache is
//! created: every entry lives in a [`SlotArena`] slot, the [`HashIndex`]
//! maps keys to slot indices, and an intrusive LRU list threaded through
//! the slots picks the victim when a new key arrives and no slot is free.
//!
//! ```text
//!   get/put ──► Mutex<CacheState>
//!               ├─ HashIndex   key → slot, item → chain ends
//!               ├─ SlotArena   [Slot; slots_num] + free list
//!               └─ lru         head (oldest) … tail (newest)
//! ```
//!
//! A cache is never "empty but enabled by accident": with a zero byte
//! budget no cache object exists at all (see [`TrendFunctionCache::new`]).

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, trace};

use super::{CacheEntry, CacheKey, Chain, HashIndex, ListEnds, SlotArena, SlotIndex, SLOT_NONE};
use crate::config::CacheConfig;
use crate::metrics;
use crate::types::{ItemId, ResultState, Timestamp};

/// Cache statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    /// Lookups that found an entry
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Entries evicted to make room for new keys
    pub evictions: u64,
    /// Entries dropped because newer trend data arrived
    pub invalidations: u64,
    /// Distinct items with cached entries
    pub items_num: usize,
    /// Slots holding entries
    pub entries_num: usize,
    /// Total slots
    pub slots_num: usize,
    /// Bytes taken by live entries
    pub mem_used: usize,
    /// Bytes reserved for the cache
    pub mem_total: usize,
}

impl CacheStats {
    /// Calculate hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Fraction of reserved memory in use (0.0 to 1.0)
    pub fn utilization(&self) -> f64 {
        if self.mem_total == 0 {
            0.0
        } else {
            self.mem_used as f64 / self.mem_total as f64
        }
    }
}

/// Everything guarded by the cache mutex
#[derive(Debug)]
struct CacheState {
    arena: SlotArena,
    index: HashIndex,
    lru: ListEnds,
}

impl CacheState {
    fn new(slots_num: u32) -> Self {
        Self {
            arena: SlotArena::with_slots(slots_num),
            index: HashIndex::with_capacity(slots_num as usize),
            lru: ListEnds::EMPTY,
        }
    }

    /// Move a slot to the most-recently-used end
    fn touch(&mut self, idx: SlotIndex) {
        if self.lru.tail == idx {
            return;
        }

        self.arena.unlink(&mut self.lru, idx, Chain::Lru);
        self.arena.push_back(&mut self.lru, idx, Chain::Lru);
    }

    /// Store a new entry in a free slot and link it everywhere
    fn insert(&mut self, entry: CacheEntry) -> Option<SlotIndex> {
        let idx = self.arena.alloc(entry)?;

        self.index.insert(entry.key, idx);
        self.arena.push_back(&mut self.lru, idx, Chain::Lru);

        let chain = self.index.item_chain_mut(entry.key.item_id);
        self.arena.push_back(chain, idx, Chain::Item);

        Some(idx)
    }

    /// Unlink a slot from every list and index, then recycle it
    fn detach(&mut self, idx: SlotIndex) -> Option<CacheEntry> {
        let key = self.arena.entry(idx)?.key;

        self.arena.unlink(&mut self.lru, idx, Chain::Lru);

        let chain_empty = match self.index.existing_item_chain_mut(key.item_id) {
            Some(chain) => {
                self.arena.unlink(chain, idx, Chain::Item);
                chain.is_empty()
            }
            None => false,
        };
        if chain_empty {
            self.index.remove_item_chain(key.item_id);
        }

        self.index.remove(&key);
        self.arena.free(idx)
    }

    /// Evict the least recently used entry
    fn evict_lru(&mut self) -> Option<CacheEntry> {
        let head = self.lru.head;
        if head == SLOT_NONE {
            return None;
        }

        self.detach(head)
    }

    /// Drop every entry of `item_id` whose range contains `clock`
    fn invalidate(&mut self, item_id: ItemId, clock: Timestamp) -> usize {
        let Some(chain) = self.index.item_chain(item_id) else {
            return 0;
        };

        let stale: Vec<SlotIndex> = self
            .arena
            .iter_chain(chain, Chain::Item)
            .filter(|&idx| {
                self.arena
                    .entry(idx)
                    .is_some_and(|entry| entry.key.covers(clock))
            })
            .collect();

        stale
            .into_iter()
            .filter(|&idx| self.detach(idx).is_some())
            .count()
    }

    fn clear(&mut self) -> usize {
        let removed = self.arena.in_use();

        self.arena.clear();
        self.index.clear();
        self.lru = ListEnds::EMPTY;

        removed
    }

    /// Check every structural invariant, returning the first violation
    fn verify(&self) -> Result<(), String> {
        let in_use = self.arena.in_use();
        let capacity = self.arena.capacity();

        // forward walk, checking back links as we go
        let mut prev = SLOT_NONE;
        let mut forward = 0usize;
        let mut idx = self.lru.head;
        while idx != SLOT_NONE {
            let links = self
                .arena
                .links(idx, Chain::Lru)
                .ok_or_else(|| format!("LRU list reaches free slot {}", idx))?;
            if links.prev != prev {
                return Err(format!(
                    "slot {} has prev {} but follows {}",
                    idx, links.prev, prev
                ));
            }

            forward += 1;
            if forward > in_use {
                return Err("LRU list is longer than the number of used slots".to_string());
            }

            prev = idx;
            idx = links.next;
        }

        if prev != self.lru.tail {
            return Err(format!("LRU walk ends at {} but tail is {}", prev, self.lru.tail));
        }
        if forward != in_use {
            return Err(format!("LRU list has {} slots, {} are in use", forward, in_use));
        }

        let free = self.arena.free_count();
        if free + in_use != capacity {
            return Err(format!(
                "{} free + {} used slots != capacity {}",
                free, in_use, capacity
            ));
        }

        if self.index.len() != in_use {
            return Err(format!("index has {} keys, {} slots in use", self.index.len(), in_use));
        }

        for (key, &idx) in self.index.iter() {
            match self.arena.entry(idx) {
                Some(entry) if entry.key == *key => {}
                Some(_) => return Err(format!("slot {} holds a different key", idx)),
                None => return Err(format!("index points at free slot {}", idx)),
            }
        }

        let mut chained = 0usize;
        for (&item_id, &chain) in self.index.item_chains() {
            for idx in self.arena.iter_chain(chain, Chain::Item) {
                match self.arena.entry(idx) {
                    Some(entry) if entry.key.item_id == item_id => chained += 1,
                    _ => return Err(format!("item {} chain reaches foreign slot {}", item_id, idx)),
                }
            }
        }
        if chained != in_use {
            return Err(format!("item chains hold {} slots, {} in use", chained, in_use));
        }

        Ok(())
    }
}

/// Fixed-capacity LRU cache of trend function results
///
/// Every operation takes the single internal lock for its own bookkeeping
/// only. A get-miss followed by a put is not atomic: two threads may both
/// compute a missing value and both store it, the second write simply
/// overwriting the first.
#[derive(Debug)]
pub struct TrendFunctionCache {
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
    slots_num: usize,
}

impl TrendFunctionCache {
    /// Create a cache sized by configuration
    ///
    /// Returns `None` when the configured size is zero; callers then skip
    /// caching entirely.
    pub fn new(config: &CacheConfig) -> Option<Self> {
        if config.is_disabled() {
            info!("Trend function cache disabled");
            return None;
        }

        Some(Self::from_size(config.size_bytes))
    }

    /// Create a cache from a byte budget, with at least one slot
    pub fn from_size(size_bytes: u64) -> Self {
        let slots_num = Self::slots_for_size(size_bytes);
        let cache = Self::build(slots_num);

        info!(
            size_bytes,
            slots_num,
            entry_bytes = Self::entry_bytes(),
            "Trend function cache initialized"
        );

        cache
    }

    /// Create a cache holding exactly `slots_num` entries
    ///
    /// Returns `None` for zero slots.
    pub fn with_slots(slots_num: u32) -> Option<Self> {
        if slots_num == 0 {
            return None;
        }

        debug!(slots_num, "Trend function cache initialized");
        Some(Self::build(slots_num))
    }

    fn build(slots_num: u32) -> Self {
        let state = CacheState::new(slots_num);
        let slots_num = state.arena.capacity();

        metrics::update_cache_slots(0, slots_num);

        Self {
            state: Mutex::new(state),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            slots_num,
        }
    }

    /// Bytes budgeted per entry: one slot plus its index overhead
    pub const fn entry_bytes() -> usize {
        SlotArena::slot_size() + HashIndex::bytes_per_entry()
    }

    /// Number of slots a byte budget pays for
    pub fn slots_for_size(size_bytes: u64) -> u32 {
        let slots = size_bytes / Self::entry_bytes() as u64;
        slots.clamp(1, u64::from(SLOT_NONE)) as u32
    }

    /// Look up a cached result, marking it most recently used
    pub fn get(&self, key: &CacheKey) -> Option<(f64, ResultState)> {
        let found = {
            let mut state = self.state.lock();

            match state.index.get(key) {
                Some(idx) => {
                    state.touch(idx);
                    state.arena.entry(idx).map(|entry| (entry.value, entry.state))
                }
                None => None,
            }
        };

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        metrics::record_cache_lookup(found.is_some());

        found
    }

    /// True when `key` is cached; does not affect LRU order or counters
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().index.get(key).is_some()
    }

    /// Store a result, overwriting any existing entry for `key`
    ///
    /// When every slot is taken the least recently used entry is evicted.
    pub fn put(&self, key: CacheKey, value: f64, result_state: ResultState) {
        let entry = CacheEntry {
            key,
            state: result_state,
            value,
        };

        let (evicted, in_use) = {
            let mut state = self.state.lock();

            if let Some(idx) = state.index.get(&key) {
                if let Some(existing) = state.arena.entry_mut(idx) {
                    existing.state = result_state;
                    existing.value = value;
                }
                state.touch(idx);
                return;
            }

            let evicted = if state.arena.has_free() {
                None
            } else {
                state.evict_lru()
            };

            state.insert(entry);
            (evicted, state.arena.in_use())
        };

        metrics::update_cache_slots(in_use, self.slots_num);

        if let Some(victim) = evicted {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            metrics::record_cache_removal("evicted", 1);
            trace!(
                item_id = victim.key.item_id,
                start = victim.key.start,
                end = victim.key.end,
                function = %victim.key.function,
                "Evicted trend function cache entry"
            );
        }
    }

    /// Remove a single entry, returning its value and state
    pub fn remove(&self, key: &CacheKey) -> Option<(f64, ResultState)> {
        let (removed, in_use) = {
            let mut state = self.state.lock();
            let idx = state.index.get(key)?;
            let removed = state.detach(idx);
            (removed, state.arena.in_use())
        };

        metrics::update_cache_slots(in_use, self.slots_num);

        removed.map(|entry| {
            metrics::record_cache_removal("removed", 1);
            (entry.value, entry.state)
        })
    }

    /// Drop cached results made stale by new trend rows
    ///
    /// Each `(item_id, clock)` pair names an hourly trend row that was just
    /// written; every entry of that item whose range covers the clock is
    /// removed. Returns the number of entries removed.
    pub fn invalidate_trends(&self, trends: &[(ItemId, Timestamp)]) -> usize {
        if trends.is_empty() {
            return 0;
        }

        let (removed, in_use) = {
            let mut state = self.state.lock();
            let removed = trends
                .iter()
                .map(|&(item_id, clock)| state.invalidate(item_id, clock))
                .sum::<usize>();
            (removed, state.arena.in_use())
        };

        if removed > 0 {
            metrics::update_cache_slots(in_use, self.slots_num);
            self.invalidations
                .fetch_add(removed as u64, Ordering::Relaxed);
            metrics::record_cache_removal("invalidated", removed);
            debug!(
                trends = trends.len(),
                removed, "Invalidated trend function cache entries"
            );
        }

        removed
    }

    /// Drop every entry, returning all slots to the free list
    pub fn clear(&self) {
        let removed = self.state.lock().clear();

        metrics::record_cache_removal("cleared", removed);
        metrics::update_cache_slots(0, self.slots_num);
        debug!(removed, "Cleared trend function cache");
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.state.lock().arena.in_use()
    }

    /// True when nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.slots_num
    }

    /// Snapshot of counters and occupancy
    pub fn stats(&self) -> CacheStats {
        let (entries_num, items_num) = {
            let state = self.state.lock();
            (state.arena.in_use(), state.index.items_len())
        };

        metrics::update_cache_slots(entries_num, self.slots_num);

        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            items_num,
            entries_num,
            slots_num: self.slots_num,
            mem_used: entries_num * Self::entry_bytes(),
            mem_total: self.slots_num * Self::entry_bytes(),
        }
    }

    /// Check the internal lists and index agree with each other
    ///
    /// Intended for tests and debugging; takes the cache lock.
    pub fn verify_integrity(&self) -> Result<(), String> {
        self.state.lock().verify()
    }
}
