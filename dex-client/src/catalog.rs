//! Catalog snapshot and cache
//!
//! A [`Catalog`] is an immutable snapshot of every Pokémon fetched by one
//! `GET /api/pokemons`, plus the indexes derived from it. [`CatalogCache`]
//! holds the current snapshot; each load replaces it wholesale.
//!
//! Loads are ticketed. A response is applied only when its ticket is still
//! the most recent one issued, so a slow, superseded load cannot overwrite a
//! newer snapshot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use dex_common::events::{DexEvent, EventBus};
use dex_common::models::{Pokemon, PokemonId};
use dex_common::Result;

use crate::api::PokedexClient;
use crate::filter::{type_options, StatCeiling, SuggestionIndex};

/// Immutable catalog snapshot with derived indexes
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pokemons: Vec<Pokemon>,
    by_id: HashMap<PokemonId, usize>,
    suggestions: SuggestionIndex,
    ceiling: StatCeiling,
    type_options: Vec<String>,
}

impl Catalog {
    pub fn new(pokemons: Vec<Pokemon>) -> Self {
        let mut by_id = HashMap::with_capacity(pokemons.len());
        for (index, pokemon) in pokemons.iter().enumerate() {
            // First occurrence wins on duplicate ids
            by_id.entry(pokemon.id).or_insert(index);
        }

        Self {
            suggestions: SuggestionIndex::new(&pokemons),
            ceiling: StatCeiling::from_catalog(&pokemons),
            type_options: type_options(&pokemons),
            by_id,
            pokemons,
        }
    }

    /// Entities in backend order
    pub fn pokemons(&self) -> &[Pokemon] {
        &self.pokemons
    }

    pub fn get(&self, id: PokemonId) -> Option<&Pokemon> {
        self.by_id.get(&id).map(|&index| &self.pokemons[index])
    }

    pub fn find_by_pokedex_number(&self, number: i64) -> Option<&Pokemon> {
        self.pokemons.iter().find(|p| p.pokedex_number == number)
    }

    /// Exact name match, case-insensitive
    pub fn find_by_name(&self, name: &str) -> Option<&Pokemon> {
        let wanted = name.to_lowercase();
        self.pokemons.iter().find(|p| p.name.to_lowercase() == wanted)
    }

    pub fn len(&self) -> usize {
        self.pokemons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pokemons.is_empty()
    }

    pub fn suggestions(&self) -> &SuggestionIndex {
        &self.suggestions
    }

    /// Catalog-wide stat maxima (floor 1)
    pub fn ceiling(&self) -> &StatCeiling {
        &self.ceiling
    }

    /// Sorted distinct type tags
    pub fn type_options(&self) -> &[String] {
        &self.type_options
    }
}

/// Holder of the current catalog snapshot
pub struct CatalogCache {
    snapshot: RwLock<Arc<Catalog>>,
    latest_ticket: AtomicU64,
    events: Option<EventBus>,
}

impl CatalogCache {
    /// Empty cache; nothing is fetched until [`CatalogCache::load`]
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Catalog::default())),
            latest_ticket: AtomicU64::new(0),
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Current snapshot (cheap clone of an `Arc`)
    pub fn snapshot(&self) -> Arc<Catalog> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, id: PokemonId) -> Option<Pokemon> {
        self.snapshot().get(id).cloned()
    }

    /// Fetch the full catalog and make it the current snapshot
    ///
    /// If a newer load was started while this one was in flight, the newer
    /// snapshot wins and is returned instead.
    pub async fn load(&self, api: &PokedexClient) -> Result<Arc<Catalog>> {
        let ticket = self.begin_load();
        let pokemons = api.list_pokemons().await?;
        Ok(self.complete_load(ticket, pokemons))
    }

    /// Reserve a ticket for a load about to start
    pub fn begin_load(&self) -> u64 {
        self.latest_ticket.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply a finished load if `ticket` is still the latest; returns the
    /// snapshot that is current afterwards
    pub fn complete_load(&self, ticket: u64, pokemons: Vec<Pokemon>) -> Arc<Catalog> {
        let mut current = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);

        if ticket != self.latest_ticket.load(Ordering::SeqCst) {
            debug!(ticket, "Discarding superseded catalog response");
            return current.clone();
        }

        let catalog = Arc::new(Catalog::new(pokemons));
        *current = catalog.clone();
        drop(current);

        info!(count = catalog.len(), ticket, "Catalog loaded");
        if let Some(events) = &self.events {
            events.emit_lossy(DexEvent::CatalogLoaded {
                count: catalog.len(),
                ticket,
                timestamp: chrono::Utc::now(),
            });
        }
        catalog
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}
