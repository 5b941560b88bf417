//! Bounded, ordered, id-unique collection backing a synced view.

use crate::types::{EntityId, ViewEntity};
use std::collections::VecDeque;
use std::sync::Arc;

/// The materialized collection: capacity-capped, ordered non-increasing by
/// recency key, unique by id.
///
/// Mutations are staged in a `VecDeque` (O(1) prepend and tail-truncate,
/// O(n) id lookups with n bounded by capacity). Readers only ever see the
/// last committed snapshot, so a collection is never observed mid-mutation.
pub struct BoundedOrderedStore<T> {
    entries: VecDeque<T>,
    capacity: usize,
    committed: Arc<[T]>,
}

impl<T: ViewEntity> BoundedOrderedStore<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            committed: Arc::from(Vec::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.position(id).is_some()
    }

    /// Index of the entity with the given id, if present.
    pub fn position(&self, id: &EntityId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }

    /// Prepend a newly visible entity, then truncate to capacity. Eviction
    /// removes from the tail (oldest by recency key) only, never the
    /// just-inserted position. Returns the number of evicted entries.
    pub fn prepend(&mut self, entity: T) -> usize {
        self.entries.push_front(entity);
        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
            evicted += 1;
        }
        evicted
    }

    /// Remove by id. Returns the removed entity, or `None` if absent.
    pub fn remove(&mut self, id: &EntityId) -> Option<T> {
        let index = self.position(id)?;
        self.entries.remove(index)
    }

    /// Replace the entry with the same id in place, keeping its position.
    /// Returns false if no entry with that id exists.
    pub fn replace(&mut self, entity: T) -> bool {
        match self.position(entity.id()) {
            Some(index) => {
                self.entries[index] = entity;
                true
            }
            None => false,
        }
    }

    /// Wholesale replacement, used for snapshot loads and refreshes. The
    /// input is expected ordered by recency key descending; anything past
    /// capacity is dropped.
    pub fn replace_all(&mut self, entities: Vec<T>) {
        self.entries = entities.into_iter().take(self.capacity).collect();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Publish the current contents as the committed snapshot.
    pub fn commit(&mut self) -> Arc<[T]> {
        self.committed = self.entries.iter().cloned().collect::<Vec<_>>().into();
        Arc::clone(&self.committed)
    }

    /// The last committed snapshot. Cheap to clone and safe to hold across
    /// later mutations.
    pub fn snapshot(&self) -> Arc<[T]> {
        Arc::clone(&self.committed)
    }
}
