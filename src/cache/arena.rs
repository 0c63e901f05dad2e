//! Fixed-capacity slot arena
//!
//! All cache entries live in one pre-allocated `Vec<Slot>`. Lists are
//! threaded through the slots with `u32` indices rather than pointers, so
//! the arena never allocates after construction and a slot can be
//! recycled without touching the allocator.
//!
//! A slot is either on the free list or holding an entry, and the enum
//! makes the two link interpretations impossible to mix up:
//!
//! ```text
//! Free  { next }                      singly linked free list
//! InUse { entry, lru, item }          doubly linked LRU list
//!                                     doubly linked per-item chain
//! ```

use super::CacheEntry;

/// Index of a slot in the arena
pub type SlotIndex = u32;

/// Sentinel meaning "no slot"
pub const SLOT_NONE: SlotIndex = SlotIndex::MAX;

/// Previous/next links of a doubly linked list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Links {
    /// Previous slot, `SLOT_NONE` at the head
    pub prev: SlotIndex,
    /// Next slot, `SLOT_NONE` at the tail
    pub next: SlotIndex,
}

impl Links {
    /// Links of an unlinked slot
    pub const DETACHED: Links = Links {
        prev: SLOT_NONE,
        next: SLOT_NONE,
    };
}

/// One unit of arena storage
#[derive(Debug, Clone)]
pub enum Slot {
    /// On the free list
    Free {
        /// Next free slot
        next: SlotIndex,
    },
    /// Holding a live entry
    InUse {
        /// The cached entry
        entry: CacheEntry,
        /// Position in the LRU list
        lru: Links,
        /// Position in the chain of entries for the same item
        item: Links,
    },
}

/// Which intrusive list a link operation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain {
    /// Least-recently-used ordering
    Lru,
    /// Entries sharing an item id
    Item,
}

/// Head and tail of an intrusive list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListEnds {
    /// First slot
    pub head: SlotIndex,
    /// Last slot
    pub tail: SlotIndex,
}

impl ListEnds {
    /// An empty list
    pub const EMPTY: ListEnds = ListEnds {
        head: SLOT_NONE,
        tail: SLOT_NONE,
    };

    /// True when the list holds no slots
    pub fn is_empty(&self) -> bool {
        self.head == SLOT_NONE
    }
}

impl Default for ListEnds {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Fixed array of slots plus a free list
#[derive(Debug)]
pub struct SlotArena {
    slots: Vec<Slot>,
    free_head: SlotIndex,
    in_use: usize,
}

impl SlotArena {
    /// Allocate `slots_num` slots, all on the free list
    ///
    /// `SLOT_NONE` is reserved, so at most `SlotIndex::MAX` slots fit.
    pub fn with_slots(slots_num: u32) -> Self {
        let slots_num = slots_num.min(SLOT_NONE);
        let slots = (0..slots_num)
            .map(|i| Slot::Free {
                next: if i + 1 < slots_num { i + 1 } else { SLOT_NONE },
            })
            .collect();

        Self {
            slots,
            free_head: if slots_num > 0 { 0 } else { SLOT_NONE },
            in_use: 0,
        }
    }

    /// Bytes taken by one slot
    pub const fn slot_size() -> usize {
        std::mem::size_of::<Slot>()
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots holding entries
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// True when a slot can be allocated without eviction
    pub fn has_free(&self) -> bool {
        self.free_head != SLOT_NONE
    }

    /// Head of the free list
    pub fn free_head(&self) -> SlotIndex {
        self.free_head
    }

    /// Take a slot off the free list and store `entry` in it
    ///
    /// Returns `None` when the arena is exhausted; callers evict first.
    pub fn alloc(&mut self, entry: CacheEntry) -> Option<SlotIndex> {
        let idx = self.free_head;
        let slot = self.slots.get_mut(idx as usize)?;

        let Slot::Free { next } = *slot else {
            return None;
        };

        *slot = Slot::InUse {
            entry,
            lru: Links::DETACHED,
            item: Links::DETACHED,
        };
        self.free_head = next;
        self.in_use += 1;

        Some(idx)
    }

    /// Return a slot to the free list, handing back its entry
    ///
    /// The slot must already be unlinked from every chain.
    pub fn free(&mut self, idx: SlotIndex) -> Option<CacheEntry> {
        let free_head = self.free_head;
        let slot = self.slots.get_mut(idx as usize)?;

        let Slot::InUse { entry, lru, item } = *slot else {
            return None;
        };
        debug_assert_eq!(lru, Links::DETACHED, "freeing a slot still on the LRU list");
        debug_assert_eq!(item, Links::DETACHED, "freeing a slot still on an item chain");

        *slot = Slot::Free { next: free_head };
        self.free_head = idx;
        self.in_use -= 1;

        Some(entry)
    }

    /// Entry stored at `idx`
    pub fn entry(&self, idx: SlotIndex) -> Option<&CacheEntry> {
        match self.slots.get(idx as usize)? {
            Slot::InUse { entry, .. } => Some(entry),
            Slot::Free { .. } => None,
        }
    }

    /// Mutable entry stored at `idx`
    pub fn entry_mut(&mut self, idx: SlotIndex) -> Option<&mut CacheEntry> {
        match self.slots.get_mut(idx as usize)? {
            Slot::InUse { entry, .. } => Some(entry),
            Slot::Free { .. } => None,
        }
    }

    /// Links of an in-use slot in `chain`
    pub fn links(&self, idx: SlotIndex, chain: Chain) -> Option<Links> {
        match self.slots.get(idx as usize)? {
            Slot::InUse { lru, item, .. } => Some(match chain {
                Chain::Lru => *lru,
                Chain::Item => *item,
            }),
            Slot::Free { .. } => None,
        }
    }

    fn links_mut(&mut self, idx: SlotIndex, chain: Chain) -> Option<&mut Links> {
        match self.slots.get_mut(idx as usize)? {
            Slot::InUse { lru, item, .. } => Some(match chain {
                Chain::Lru => lru,
                Chain::Item => item,
            }),
            Slot::Free { .. } => None,
        }
    }

    /// Append an in-use slot at the tail of a list
    pub fn push_back(&mut self, ends: &mut ListEnds, idx: SlotIndex, chain: Chain) {
        let tail = ends.tail;

        match self.links_mut(idx, chain) {
            Some(links) => {
                links.prev = tail;
                links.next = SLOT_NONE;
            }
            None => return,
        }

        if tail == SLOT_NONE {
            ends.head = idx;
        } else if let Some(links) = self.links_mut(tail, chain) {
            links.next = idx;
        }

        ends.tail = idx;
    }

    /// Remove an in-use slot from a list
    pub fn unlink(&mut self, ends: &mut ListEnds, idx: SlotIndex, chain: Chain) {
        let Some(Links { prev, next }) = self.links(idx, chain) else {
            return;
        };

        if prev == SLOT_NONE {
            ends.head = next;
        } else if let Some(links) = self.links_mut(prev, chain) {
            links.next = next;
        }

        if next == SLOT_NONE {
            ends.tail = prev;
        } else if let Some(links) = self.links_mut(next, chain) {
            links.prev = prev;
        }

        if let Some(links) = self.links_mut(idx, chain) {
            *links = Links::DETACHED;
        }
    }

    /// Iterate slot indices of a list from head to tail
    pub fn iter_chain(&self, ends: ListEnds, chain: Chain) -> ChainIter<'_> {
        ChainIter {
            arena: self,
            chain,
            current: ends.head,
            remaining: self.in_use,
        }
    }

    /// Number of slots reachable from the free list head
    pub fn free_count(&self) -> usize {
        let mut count = 0;
        let mut idx = self.free_head;

        while let Some(Slot::Free { next }) = self.slots.get(idx as usize) {
            count += 1;
            if count > self.slots.len() {
                break;
            }
            idx = *next;
        }

        count
    }

    /// Put every slot back on the free list
    pub fn clear(&mut self) {
        *self = Self::with_slots(self.slots.len() as u32);
    }
}

/// Iterator over a list threaded through the arena
///
/// Bounded by the number of in-use slots so a corrupted list cannot loop
/// forever.
pub struct ChainIter<'a> {
    arena: &'a SlotArena,
    chain: Chain,
    current: SlotIndex,
    remaining: usize,
}

impl Iterator for ChainIter<'_> {
    type Item = SlotIndex;

    fn next(&mut self) -> Option<SlotIndex> {
        if self.current == SLOT_NONE || self.remaining == 0 {
            return None;
        }

        let idx = self.current;
        self.current = self.arena.links(idx, self.chain)?.next;
        self.remaining -= 1;

        Some(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::types::{FunctionKind, ResultState};

    fn entry(item_id: u64) -> CacheEntry {
        CacheEntry {
            key: CacheKey::new(item_id, 0, 0, FunctionKind::Avg),
            state: ResultState::Normal,
            value: item_id as f64,
        }
    }

    #[test]
    fn test_new_arena_is_all_free() {
        let arena = SlotArena::with_slots(4);
        assert_eq!(arena.capacity(), 4);
        assert_eq!(arena.in_use(), 0);
        assert_eq!(arena.free_count(), 4);
        assert_eq!(arena.free_head(), 0);
    }

    #[test]
    fn test_alloc_until_exhausted() {
        let mut arena = SlotArena::with_slots(2);
        assert_eq!(arena.alloc(entry(1)), Some(0));
        assert_eq!(arena.alloc(entry(2)), Some(1));
        assert!(!arena.has_free());
        assert_eq!(arena.alloc(entry(3)), None);
        assert_eq!(arena.in_use(), 2);
    }

    #[test]
    fn test_free_recycles_slot() {
        let mut arena = SlotArena::with_slots(2);
        let a = arena.alloc(entry(1)).unwrap();
        let _b = arena.alloc(entry(2)).unwrap();

        let freed = arena.free(a).unwrap();
        assert_eq!(freed.key.item_id, 1);
        assert!(arena.entry(a).is_none());
        assert_eq!(arena.free_head(), a);

        // freeing twice is refused
        assert!(arena.free(a).is_none());

        assert_eq!(arena.alloc(entry(3)), Some(a));
        assert_eq!(arena.entry(a).unwrap().key.item_id, 3);
    }

    #[test]
    fn test_list_push_and_unlink() {
        let mut arena = SlotArena::with_slots(3);
        let mut lru = ListEnds::EMPTY;
        let ids: Vec<_> = (0..3).map(|i| arena.alloc(entry(i)).unwrap()).collect();

        for &idx in &ids {
            arena.push_back(&mut lru, idx, Chain::Lru);
        }
        assert_eq!(arena.iter_chain(lru, Chain::Lru).collect::<Vec<_>>(), ids);

        arena.unlink(&mut lru, ids[1], Chain::Lru);
        assert_eq!(
            arena.iter_chain(lru, Chain::Lru).collect::<Vec<_>>(),
            vec![ids[0], ids[2]]
        );
        assert_eq!(arena.links(ids[1], Chain::Lru), Some(Links::DETACHED));

        arena.unlink(&mut lru, ids[0], Chain::Lru);
        arena.unlink(&mut lru, ids[2], Chain::Lru);
        assert!(lru.is_empty());
        assert_eq!(lru.tail, SLOT_NONE);
    }

    #[test]
    fn test_chains_are_independent() {
        let mut arena = SlotArena::with_slots(2);
        let mut lru = ListEnds::EMPTY;
        let mut item = ListEnds::EMPTY;
        let a = arena.alloc(entry(1)).unwrap();
        let b = arena.alloc(entry(1)).unwrap();

        arena.push_back(&mut lru, a, Chain::Lru);
        arena.push_back(&mut lru, b, Chain::Lru);
        arena.push_back(&mut item, b, Chain::Item);
        arena.push_back(&mut item, a, Chain::Item);

        assert_eq!(arena.iter_chain(lru, Chain::Lru).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(arena.iter_chain(item, Chain::Item).collect::<Vec<_>>(), vec![b, a]);
    }

    #[test]
    fn test_clear_resets_free_list() {
        let mut arena = SlotArena::with_slots(3);
        arena.alloc(entry(1));
        arena.alloc(entry(2));
        arena.clear();
        assert_eq!(arena.in_use(), 0);
        assert_eq!(arena.free_count(), 3);
    }

    #[test]
    fn test_zero_slots() {
        let mut arena = SlotArena::with_slots(0);
        assert!(!arena.has_free());
        assert_eq!(arena.alloc(entry(1)), None);
    }
}
