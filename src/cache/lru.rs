//! Capacity-bounded recency eviction.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::cache::EvictionPolicy;
use crate::data::ItemId;

#[derive(Debug)]
pub struct LruPolicy {
    entries: LruCache<ItemId, ()>,
}

impl LruPolicy {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl EvictionPolicy for LruPolicy {
    /// A hit promotes the item to most-recently-used.
    fn get(&mut self, item: ItemId) -> bool {
        self.entries.get(&item).is_some()
    }

    fn put(&mut self, items: &[ItemId]) {
        for &item in items {
            // Resident keys are promoted; new keys evict the LRU entry once full.
            self.entries.put(item, ());
        }
    }

    fn contains(&self, item: ItemId) -> bool {
        self.entries.contains(&item)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Least-recently-used first, most-recently-used last.
    fn resident_snapshot(&self) -> Vec<ItemId> {
        self.entries.iter().rev().map(|(item, _)| *item).collect()
    }

    fn remaining_life(&self, _item: ItemId) -> Option<u32> {
        None
    }

    fn seed(&mut self, items: &[ItemId]) {
        self.put(items);
    }
}
