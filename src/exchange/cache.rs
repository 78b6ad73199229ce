use std::collections::HashMap;

use dah::{AvailableData, ObjectLocator};
use tracing::{debug, warn};
use uuid::Uuid;

/// Table of locators keyed by descriptor id.
///
/// Entries are never mutated once inserted, only removed.
#[derive(Debug, Default)]
pub struct LocatorCache {
    entries: HashMap<Uuid, ObjectLocator>,
}

impl LocatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `locator` under `id`; returns false and keeps the existing entry
    /// when `id` is already present.
    pub fn insert(&mut self, id: Uuid, locator: ObjectLocator) -> bool {
        if self.entries.contains_key(&id) {
            debug!("Ignoring duplicate locator for {}", id);
            return false;
        }
        self.entries.insert(id, locator);
        true
    }

    pub fn find(&self, id: &Uuid) -> Option<&ObjectLocator> {
        self.entries.get(id)
    }

    /// Whether every descriptor reachable in `data` has a cache entry
    pub fn is_fully_cached(&self, data: &AvailableData) -> bool {
        data.descriptor_ids().all(|id| self.entries.contains_key(&id))
    }

    /// Locators for `ids`, in request order. Unknown ids are skipped.
    pub fn get_data(&self, ids: &[Uuid]) -> Vec<ObjectLocator> {
        let mut locators = Vec::with_capacity(ids.len());
        let mut missing = 0usize;
        for id in ids {
            match self.entries.get(id) {
                Some(locator) => locators.push(locator.clone()),
                None => {
                    missing += 1;
                    debug!("No locator cached for {}", id);
                }
            }
        }
        if missing > 0 {
            warn!(
                "getData skipped {} of {} requested ids with no cached locator",
                missing,
                ids.len()
            );
        }
        locators
    }

    /// Drop the entries for `ids`; returns how many were present
    pub fn remove(&mut self, ids: &[Uuid]) -> usize {
        ids.iter()
            .filter(|id| self.entries.remove(id).is_some())
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
