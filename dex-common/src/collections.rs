//! Persisted id collections (favorites, team)
//!
//! Each collection is an ordered, duplicate-free list of Pokémon ids stored as
//! a JSON array under one storage key. Every operation re-reads storage, so
//! membership always reflects the latest persisted state.
//!
//! Persistence is best effort: unreadable or corrupt storage reads as an empty
//! collection, and failed writes are logged and dropped.
//!
//! Mutations run through [`KeyValueStorage::update`], so the read and the
//! write of one add/remove happen under the storage lock.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::events::{CollectionKind, DexEvent, EventBus};
use crate::models::{Pokemon, PokemonId};
use crate::storage::{ItemUpdate, KeyValueStorage};

/// Storage key of the favorites list
pub const FAVORITES_KEY: &str = "mypokedex-favorites";

/// Storage key of the team list
pub const TEAM_KEY: &str = "mypokedex-team";

/// Maximum number of team members
pub const TEAM_MAX_SIZE: usize = 6;

// ========================================
// IdCollection
// ========================================

/// Generic persisted id set, optionally bounded
#[derive(Clone)]
pub struct IdCollection {
    storage: Arc<dyn KeyValueStorage>,
    key: &'static str,
    kind: CollectionKind,
    capacity: Option<usize>,
    events: Option<EventBus>,
}

impl IdCollection {
    /// Unbounded collection
    pub fn unbounded(
        storage: Arc<dyn KeyValueStorage>,
        key: &'static str,
        kind: CollectionKind,
    ) -> Self {
        Self {
            storage,
            key,
            kind,
            capacity: None,
            events: None,
        }
    }

    /// Collection that refuses inserts beyond `capacity`
    pub fn bounded(
        storage: Arc<dyn KeyValueStorage>,
        key: &'static str,
        kind: CollectionKind,
        capacity: usize,
    ) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::unbounded(storage, key, kind)
        }
    }

    /// Announce successful mutations on `events`
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Persisted ids in insertion order
    ///
    /// Duplicates and entries past the capacity (hand-edited storage) are
    /// dropped on read.
    pub fn list(&self) -> Vec<PokemonId> {
        match self.storage.get_item(self.key) {
            Ok(raw) => self.decode(raw.as_deref()),
            Err(e) => {
                warn!(key = self.key, "Storage unavailable, treating collection as empty: {}", e);
                Vec::new()
            }
        }
    }

    fn decode(&self, raw: Option<&str>) -> Vec<PokemonId> {
        let Some(raw) = raw else {
            return Vec::new();
        };
        let parsed: Vec<PokemonId> = match serde_json::from_str(raw) {
            Ok(ids) => ids,
            Err(e) => {
                debug!(key = self.key, "Corrupt collection content, treating as empty: {}", e);
                return Vec::new();
            }
        };

        let mut ids: Vec<PokemonId> = Vec::with_capacity(parsed.len());
        for id in parsed {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if let Some(cap) = self.capacity {
            ids.truncate(cap);
        }
        ids
    }

    pub fn contains(&self, id: PokemonId) -> bool {
        self.list().contains(&id)
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.capacity.is_some_and(|cap| self.len() >= cap)
    }

    /// Append `id`; no-op when already present or at capacity
    ///
    /// Returns true when the id was appended and persisted.
    pub fn add(&self, id: PokemonId) -> bool {
        let capacity = self.capacity;
        let key = self.key;
        self.mutate(|ids| {
            if ids.contains(&id) {
                return false;
            }
            if capacity.is_some_and(|cap| ids.len() >= cap) {
                debug!(key, id, "Collection full, add ignored");
                return false;
            }
            ids.push(id);
            true
        })
    }

    /// Remove `id`; returns true when it was present and the change persisted
    pub fn remove(&self, id: PokemonId) -> bool {
        self.mutate(|ids| {
            let before = ids.len();
            ids.retain(|item| *item != id);
            ids.len() != before
        })
    }

    pub fn clear(&self) {
        self.mutate(|ids| {
            ids.clear();
            true
        });
    }

    /// Apply `change` to the stored list in one locked read-modify-write
    ///
    /// `change` returns false to leave storage untouched. Returns true when a
    /// change was written.
    fn mutate<F>(&self, change: F) -> bool
    where
        F: FnOnce(&mut Vec<PokemonId>) -> bool,
    {
        let mut change = Some(change);
        let mut written: Option<Vec<PokemonId>> = None;

        let result = self.storage.update(self.key, &mut |current| {
            let Some(change) = change.take() else {
                return ItemUpdate::Keep;
            };
            let mut ids = self.decode(current);
            if !change(&mut ids) {
                return ItemUpdate::Keep;
            }
            match serde_json::to_string(&ids) {
                Ok(json) => {
                    written = Some(ids);
                    ItemUpdate::Set(json)
                }
                Err(e) => {
                    warn!(key = self.key, "Failed to encode collection: {}", e);
                    ItemUpdate::Keep
                }
            }
        });

        if let Err(e) = result {
            warn!(key = self.key, "Failed to persist collection: {}", e);
            return false;
        }
        let Some(ids) = written else {
            return false;
        };

        if let Some(events) = &self.events {
            events.emit_lossy(DexEvent::CollectionChanged {
                collection: self.kind,
                ids,
                timestamp: chrono::Utc::now(),
            });
        }
        true
    }
}

// ========================================
// Favorites
// ========================================

/// Unbounded favorites list
#[derive(Clone)]
pub struct Favorites {
    inner: IdCollection,
}

impl Favorites {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            inner: IdCollection::unbounded(storage, FAVORITES_KEY, CollectionKind::Favorites),
        }
    }

    pub fn with_events(self, events: EventBus) -> Self {
        Self {
            inner: self.inner.with_events(events),
        }
    }

    pub fn add(&self, id: PokemonId) -> bool {
        self.inner.add(id)
    }

    pub fn remove(&self, id: PokemonId) -> bool {
        self.inner.remove(id)
    }

    pub fn is_favorite(&self, id: PokemonId) -> bool {
        self.inner.contains(id)
    }

    /// Flip membership; returns the new membership
    pub fn toggle(&self, id: PokemonId) -> bool {
        if self.is_favorite(id) {
            self.remove(id);
        } else {
            self.add(id);
        }
        self.is_favorite(id)
    }

    pub fn list(&self) -> Vec<PokemonId> {
        self.inner.list()
    }

    pub fn clear(&self) {
        self.inner.clear()
    }
}

// ========================================
// Team
// ========================================

/// Team of at most [`TEAM_MAX_SIZE`] members
#[derive(Clone)]
pub struct Team {
    inner: IdCollection,
}

impl Team {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            inner: IdCollection::bounded(storage, TEAM_KEY, CollectionKind::Team, TEAM_MAX_SIZE),
        }
    }

    pub fn with_events(self, events: EventBus) -> Self {
        Self {
            inner: self.inner.with_events(events),
        }
    }

    pub fn capacity(&self) -> usize {
        TEAM_MAX_SIZE
    }

    pub fn add(&self, id: PokemonId) -> bool {
        self.inner.add(id)
    }

    pub fn remove(&self, id: PokemonId) -> bool {
        self.inner.remove(id)
    }

    pub fn contains(&self, id: PokemonId) -> bool {
        self.inner.contains(id)
    }

    pub fn list(&self) -> Vec<PokemonId> {
        self.inner.list()
    }

    pub fn clear(&self) {
        self.inner.clear()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// Not already a member and a slot is free
    pub fn can_add(&self, id: PokemonId) -> bool {
        let ids = self.list();
        !ids.contains(&id) && ids.len() < TEAM_MAX_SIZE
    }

    /// Six slots in team order; members missing from the catalog and unused
    /// slots are `None`
    pub fn slots<'a, F>(&self, lookup: F) -> Vec<Option<&'a Pokemon>>
    where
        F: Fn(PokemonId) -> Option<&'a Pokemon>,
    {
        let mut slots: Vec<Option<&'a Pokemon>> = self.list().into_iter().map(lookup).collect();
        slots.resize(TEAM_MAX_SIZE, None);
        slots
    }
}
