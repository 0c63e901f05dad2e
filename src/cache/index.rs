//! Hash index over arena slots
//!
//! The index only maps keys to slot indices; the slots themselves stay
//! owned by the [`SlotArena`](super::SlotArena). It also keeps, per item,
//! the ends of the intrusive chain linking all of that item's entries so
//! fresh trend data can invalidate them without scanning the arena.
//!
//! The index allocates its own variable-size storage once, up front, in
//! [`HashIndex::with_capacity`]; slot storage is drawn separately from the
//! arena.

use std::collections::HashMap;

use super::{CacheKey, ListEnds, SlotIndex};
use crate::types::ItemId;

/// Approximate per-entry overhead of the hash tables (control bytes and
/// the per-item head)
const TABLE_OVERHEAD: usize = 16;

/// Key → slot lookup plus per-item chain heads
#[derive(Debug, Default)]
pub struct HashIndex {
    keys: HashMap<CacheKey, SlotIndex>,
    items: HashMap<ItemId, ListEnds>,
}

impl HashIndex {
    /// Allocate index storage for `entries` keys
    pub fn with_capacity(entries: usize) -> Self {
        Self {
            keys: HashMap::with_capacity(entries),
            items: HashMap::new(),
        }
    }

    /// Bytes of index storage budgeted per cached entry
    pub const fn bytes_per_entry() -> usize {
        std::mem::size_of::<CacheKey>() + std::mem::size_of::<SlotIndex>() + TABLE_OVERHEAD
    }

    /// Slot holding `key`
    pub fn get(&self, key: &CacheKey) -> Option<SlotIndex> {
        self.keys.get(key).copied()
    }

    /// Map `key` to `idx`
    pub fn insert(&mut self, key: CacheKey, idx: SlotIndex) {
        self.keys.insert(key, idx);
    }

    /// Forget `key`
    pub fn remove(&mut self, key: &CacheKey) -> Option<SlotIndex> {
        self.keys.remove(key)
    }

    /// Number of indexed keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no key is indexed
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate indexed keys and their slots
    pub fn iter(&self) -> impl Iterator<Item = (&CacheKey, &SlotIndex)> {
        self.keys.iter()
    }

    /// Chain ends for `item_id`, if it has cached entries
    pub fn item_chain(&self, item_id: ItemId) -> Option<ListEnds> {
        self.items.get(&item_id).copied()
    }

    /// Mutable chain ends for `item_id`, created empty on first use
    pub fn item_chain_mut(&mut self, item_id: ItemId) -> &mut ListEnds {
        self.items.entry(item_id).or_default()
    }

    /// Mutable chain ends for `item_id` if present
    pub fn existing_item_chain_mut(&mut self, item_id: ItemId) -> Option<&mut ListEnds> {
        self.items.get_mut(&item_id)
    }

    /// Drop the chain head of an item with no entries left
    pub fn remove_item_chain(&mut self, item_id: ItemId) {
        self.items.remove(&item_id);
    }

    /// Number of items with cached entries
    pub fn items_len(&self) -> usize {
        self.items.len()
    }

    /// Iterate per-item chain ends
    pub fn item_chains(&self) -> impl Iterator<Item = (&ItemId, &ListEnds)> {
        self.items.iter()
    }

    /// Remove everything, keeping allocated storage
    pub fn clear(&mut self) {
        self.keys.clear();
        self.items.clear();
    }
}
