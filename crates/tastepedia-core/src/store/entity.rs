//! In-memory map from entity key to its current observed state.
//!
//! Written only by the mutation controller. The generation counter carries
//! the last-intent-wins discipline: every new mutation bumps it, and a
//! completion is only acted on if its captured generation is still current.
//! Check and commit happen in one call while the caller already holds the
//! store lock, so there is no window for a newer mutation to slip between.

use std::collections::HashMap;

use crate::models::{EntityKey, EntityValue};

/// One tracked entity.
#[derive(Debug, Clone)]
pub struct OptimisticEntry {
    /// Last value confirmed by (or assumed consistent with) the server.
    pub committed: EntityValue,
    /// Tentative value shown to the user; equals `committed` when idle.
    pub pending: EntityValue,
    /// Whether a mutation request is outstanding for this key.
    pub in_flight: bool,
    /// Bumped on every initiated mutation; stale completions are discarded.
    pub generation: u64,
}

#[derive(Default)]
pub struct EntityStateStore {
    entries: HashMap<EntityKey, OptimisticEntry>,
}

impl EntityStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed (or refresh) an entry with server-observed state.
    ///
    /// Ignored while a mutation is in flight; a background refetch must not
    /// clobber an optimistic value the user is looking at.
    pub fn observe(&mut self, key: EntityKey, value: EntityValue) {
        match self.entries.get_mut(&key) {
            Some(entry) if entry.in_flight => {}
            Some(entry) => {
                entry.committed = value.clone();
                entry.pending = value;
            }
            None => {
                self.entries.insert(
                    key,
                    OptimisticEntry {
                        committed: value.clone(),
                        pending: value,
                        in_flight: false,
                        generation: 0,
                    },
                );
            }
        }
    }

    pub fn get(&self, key: &EntityKey) -> Option<&OptimisticEntry> {
        self.entries.get(key)
    }

    /// The single value the UI should display for `key` right now.
    pub fn visible(&self, key: &EntityKey) -> Option<EntityValue> {
        self.entries.get(key).map(|e| e.pending.clone())
    }

    /// Current pending value, seeding an idle entry from `default` when the
    /// key has never been seen.
    pub fn pending_or_seed(&mut self, key: &EntityKey, default: EntityValue) -> EntityValue {
        self.entries
            .entry(key.clone())
            .or_insert_with(|| OptimisticEntry {
                committed: default.clone(),
                pending: default,
                in_flight: false,
                generation: 0,
            })
            .pending
            .clone()
    }

    /// Begin a mutation: install the optimistic value and bump the
    /// generation. Returns the generation owning this attempt.
    ///
    /// Callers must have materialized the entry (via `observe` or
    /// `pending_or_seed`) first.
    pub fn begin(&mut self, key: &EntityKey, new_pending: EntityValue) -> u64 {
        let entry = self
            .entries
            .get_mut(key)
            .expect("begin() on unmaterialized entry");
        entry.pending = new_pending;
        entry.generation += 1;
        entry.in_flight = true;
        entry.generation
    }

    /// Commit `value` if `generation` still owns the entry.
    ///
    /// Returns false when a newer mutation superseded this one, in which
    /// case nothing is touched; the newer attempt owns the pending value.
    pub fn commit_if_current(
        &mut self,
        key: &EntityKey,
        generation: u64,
        value: EntityValue,
    ) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) if entry.generation == generation => {
                entry.committed = value.clone();
                entry.pending = value;
                entry.in_flight = false;
                true
            }
            _ => false,
        }
    }

    /// Revert the pending value to the committed one if `generation` still
    /// owns the entry. Returns the now-visible value on success.
    pub fn rollback_if_current(
        &mut self,
        key: &EntityKey,
        generation: u64,
    ) -> Option<EntityValue> {
        match self.entries.get_mut(key) {
            Some(entry) if entry.generation == generation => {
                entry.pending = entry.committed.clone();
                entry.in_flight = false;
                Some(entry.pending.clone())
            }
            _ => None,
        }
    }

    /// Drop a tracked entry entirely.
    pub fn evict(&mut self, key: &EntityKey) {
        self.entries.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FavoriteState;

    fn fav(favorited: bool) -> EntityValue {
        EntityValue::Favorite(FavoriteState { favorited })
    }

    #[test]
    fn test_begin_commit_round_trip() {
        let mut store = EntityStateStore::new();
        let key = EntityKey::new("r1");
        store.observe(key.clone(), fav(false));

        let g = store.begin(&key, fav(true));
        assert_eq!(store.visible(&key), Some(fav(true)));
        assert!(store.get(&key).unwrap().in_flight);

        assert!(store.commit_if_current(&key, g, fav(true)));
        let entry = store.get(&key).unwrap();
        assert_eq!(entry.committed, fav(true));
        assert!(!entry.in_flight);
    }

    #[test]
    fn test_superseded_commit_is_discarded() {
        let mut store = EntityStateStore::new();
        let key = EntityKey::new("r1");
        store.observe(key.clone(), fav(false));

        let g1 = store.begin(&key, fav(true));
        let g2 = store.begin(&key, fav(false));

        // Old completion: neither commit nor rollback may touch the entry.
        assert!(!store.commit_if_current(&key, g1, fav(true)));
        assert!(store.rollback_if_current(&key, g1).is_none());
        assert_eq!(store.visible(&key), Some(fav(false)));

        assert!(store.commit_if_current(&key, g2, fav(false)));
    }

    #[test]
    fn test_rollback_restores_committed_value() {
        let mut store = EntityStateStore::new();
        let key = EntityKey::new("r1");
        store.observe(key.clone(), fav(false));

        let g = store.begin(&key, fav(true));
        let reverted = store.rollback_if_current(&key, g).unwrap();
        assert_eq!(reverted, fav(false));
        assert_eq!(store.visible(&key), Some(fav(false)));
        assert!(!store.get(&key).unwrap().in_flight);
    }

    #[test]
    fn test_observe_does_not_clobber_in_flight_entry() {
        let mut store = EntityStateStore::new();
        let key = EntityKey::new("r1");
        store.observe(key.clone(), fav(false));
        store.begin(&key, fav(true));

        store.observe(key.clone(), fav(false));
        assert_eq!(store.visible(&key), Some(fav(true)));
    }
}
