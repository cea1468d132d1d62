//! TTL decay with a hard capacity bound layered on top ("combination" cache).

use indexmap::IndexMap;

use crate::cache::{decay, EvictionPolicy};
use crate::data::ItemId;

const PREALLOCATE_LIMIT: usize = 4096;

#[derive(Debug, Clone)]
pub struct HybridPolicy {
    entries: IndexMap<ItemId, u32>,
    capacity: usize,
    life_span: u32,
}

impl HybridPolicy {
    /// Both `capacity` and `life_span` must be non-zero.
    pub fn new(capacity: usize, life_span: u32) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity.min(PREALLOCATE_LIMIT)),
            capacity,
            life_span,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn life_span(&self) -> u32 {
        self.life_span
    }

    fn insert(&mut self, item: ItemId) {
        let refreshed = self.entries.shift_remove(&item).is_some();
        if !refreshed {
            while self.entries.len() >= self.capacity {
                self.entries.shift_remove_index(0);
            }
        }
        self.entries.insert(item, self.life_span);
    }
}

impl EvictionPolicy for HybridPolicy {
    fn get(&mut self, item: ItemId) -> bool {
        self.entries.contains_key(&item)
    }

    fn put(&mut self, items: &[ItemId]) {
        if items.is_empty() {
            return;
        }
        decay(&mut self.entries);
        for &item in items {
            self.insert(item);
        }
    }

    fn contains(&self, item: ItemId) -> bool {
        self.entries.contains_key(&item)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Oldest insertion or refresh first.
    fn resident_snapshot(&self) -> Vec<ItemId> {
        self.entries.keys().copied().collect()
    }

    fn remaining_life(&self, item: ItemId) -> Option<u32> {
        self.entries.get(&item).copied()
    }

    fn seed(&mut self, items: &[ItemId]) {
        for &item in items {
            self.insert(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_evicts_oldest_insertion() {
        let mut cache = HybridPolicy::new(2, 10);
        cache.put(&[1, 2, 3]);
        assert_eq!(cache.resident_snapshot(), vec![2, 3]);
    }

    #[test]
    fn refresh_moves_key_to_back_without_eviction() {
        let mut cache = HybridPolicy::new(3, 10);
        cache.put(&[1, 2, 3]);
        cache.put(&[1]);
        assert_eq!(cache.resident_snapshot(), vec![2, 3, 1]);
        assert_eq!(cache.remaining_life(1), Some(10));
        assert_eq!(cache.remaining_life(2), Some(9));
    }

    #[test]
    fn expiry_frees_room_before_capacity_eviction() {
        let mut cache = HybridPolicy::new(2, 1);
        cache.put(&[1, 2]);
        cache.put(&[3]);
        // Both residents expire on this put, so nothing is evicted for capacity.
        assert_eq!(cache.resident_snapshot(), vec![3]);
    }

    #[test]
    fn seeded_entries_respect_capacity() {
        let mut cache = HybridPolicy::new(2, 5);
        cache.seed(&[7, 8, 9]);
        assert_eq!(cache.resident_snapshot(), vec![8, 9]);
        assert_eq!(cache.remaining_life(9), Some(5));
    }
}
