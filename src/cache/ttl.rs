//! Counter-based expiry ("time cache"): every `put` is one tick of the clock.

use indexmap::IndexMap;

use crate::cache::{decay, EvictionPolicy};
use crate::data::ItemId;

#[derive(Debug, Clone)]
pub struct TtlPolicy {
    entries: IndexMap<ItemId, u32>,
    life_span: u32,
}

impl TtlPolicy {
    /// `life_span` is the number of `put` cycles an untouched entry survives; must be non-zero.
    pub fn new(life_span: u32) -> Self {
        Self {
            entries: IndexMap::new(),
            life_span,
        }
    }

    pub fn life_span(&self) -> u32 {
        self.life_span
    }
}

impl EvictionPolicy for TtlPolicy {
    fn get(&mut self, item: ItemId) -> bool {
        self.entries.contains_key(&item)
    }

    fn put(&mut self, items: &[ItemId]) {
        if items.is_empty() {
            return;
        }
        decay(&mut self.entries);
        for &item in items {
            // Re-inserting a resident key keeps its position and resets the counter.
            self.entries.insert(item, self.life_span);
        }
    }

    fn contains(&self, item: ItemId) -> bool {
        self.entries.contains_key(&item)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    /// Insertion order.
    fn resident_snapshot(&self) -> Vec<ItemId> {
        self.entries.keys().copied().collect()
    }

    fn remaining_life(&self, item: ItemId) -> Option<u32> {
        self.entries.get(&item).copied()
    }

    fn seed(&mut self, items: &[ItemId]) {
        for &item in items {
            self.entries.insert(item, self.life_span);
        }
    }
}
