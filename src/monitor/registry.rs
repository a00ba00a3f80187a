//! De-duplicating, newest-first item registry.

use std::collections::{HashSet, VecDeque};

use crate::models::Item;

/// Retained items plus every id already shown in this session.
#[derive(Debug, Clone)]
pub struct ItemRegistry {
    max_items: usize,
    items: VecDeque<Item>,
    seen: HashSet<String>,
}

impl ItemRegistry {
    pub fn new(max_items: usize) -> Self {
        Self {
            max_items,
            items: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Register one fetch worth of items and return the ones not seen before.
    ///
    /// New items go to the front in their incoming order, the list is then
    /// truncated to `max_items` (oldest dropped). An empty return means
    /// nothing new arrived.
    pub fn register_items(&mut self, incoming: Vec<Item>) -> Vec<Item> {
        let mut fresh = Vec::new();
        for item in incoming {
            if self.seen.insert(item.id.clone()) {
                fresh.push(item);
            }
        }

        for item in fresh.iter().rev() {
            self.items.push_front(item.clone());
        }
        self.items.truncate(self.max_items);

        fresh
    }

    /// Forget everything; used when the monitored catalog changes.
    pub fn clear(&mut self) {
        self.items.clear();
        self.seen.clear();
    }

    /// Retained items, newest first.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }
}
