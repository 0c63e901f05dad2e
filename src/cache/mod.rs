//! Trend function result caching
//!
//! - [`arena`]: fixed slot storage with index-linked lists
//! - [`index`]: key and per-item lookup over arena slots
//! - [`trend`]: the LRU cache evaluators talk to

pub mod arena;
pub mod entry;
pub mod index;
pub mod trend;

pub use arena::{Chain, Links, ListEnds, Slot, SlotArena, SlotIndex, SLOT_NONE};
pub use entry::{CacheEntry, CacheKey};
pub use index::HashIndex;
pub use trend::{CacheStats, TrendFunctionCache};
