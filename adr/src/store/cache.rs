// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! The in-memory object cache.
//!
//! Every load and save passes through here first. An entry is only
//! eligible for eviction once nothing outside the cache still holds a
//! strong reference to it -- `Rc::strong_count` doubling as the "is anyone
//! using this" check the single-threaded cooperative model relies on
//! instead of a lock.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use log::trace;

use crate::id::Uuid;
use crate::object::Object;

struct Entry {
    object: Rc<Object>,
    last_access: Instant,
}

#[derive(Default)]
pub struct Cache {
    entries: HashMap<Uuid, Entry>,
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, uuid: Uuid) -> Option<Rc<Object>> {
        let entry = self.entries.get_mut(&uuid)?;
        entry.last_access = Instant::now();
        Some(Rc::clone(&entry.object))
    }

    pub fn insert(&mut self, object: Rc<Object>) {
        self.entries.insert(
            object.uuid(),
            Entry {
                object,
                last_access: Instant::now(),
            },
        );
    }

    pub fn remove(&mut self, uuid: Uuid) {
        self.entries.remove(&uuid);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evicts every entry with no external strong reference, oldest access
    /// first (informational only -- eviction is unconditional, not
    /// age-gated, so a caller asking to reclaim memory always gets
    /// everything reclaimable). Returns how many entries were evicted.
    pub fn flush(&mut self) -> usize {
        let mut evictable: Vec<(Uuid, Instant)> = self
            .entries
            .iter()
            .filter(|(_, e)| Rc::strong_count(&e.object) == 1)
            .map(|(uuid, e)| (*uuid, e.last_access))
            .collect();
        evictable.sort_by_key(|&(_, t)| t);

        for (uuid, _) in &evictable {
            self.entries.remove(uuid);
        }

        trace!("cache flush complete: {} resident, {} evicted", self.entries.len(), evictable.len());
        evictable.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VariantKind;

    #[test]
    fn entry_held_externally_survives_flush() {
        let mut cache = Cache::new();
        let obj = Rc::new(Object::new(Uuid::new_random(), VariantKind::Airport));
        let uuid = obj.uuid();
        cache.insert(Rc::clone(&obj));
        cache.flush();
        assert!(cache.get(uuid).is_some());
        drop(obj);
    }
}
