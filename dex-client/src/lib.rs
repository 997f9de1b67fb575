//! # MyPokedex client library
//!
//! Client-side state for the MyPokedex backend:
//! - [`api`]: REST client sharing one cookie jar
//! - [`catalog`]: ticketed catalog snapshot cache
//! - [`filter`]: query/facet/sort pipeline and stat scaling
//! - [`compare`]: comparison selection and view
//! - [`session`]: session presence tracking
//! - [`guard`]: access decision for session-only commands
//! - [`render`]: text output used by the `mypokedex` binary
//!
//! Favorites and team live in `dex_common::collections`.

pub mod api;
pub mod catalog;
pub mod compare;
pub mod filter;
pub mod guard;
pub mod render;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use dex_common::collections::{Favorites, Team};
use dex_common::config::ClientConfig;
use dex_common::events::EventBus;
use dex_common::models::{Pokemon, PokemonId};
use dex_common::storage::{FileStorage, KeyValueStorage, MemoryStorage};
use dex_common::Result;

use crate::api::PokedexClient;
use crate::catalog::{Catalog, CatalogCache};
use crate::filter::{StatCeiling, ViewState};
use crate::session::SessionTracker;

/// Every client service, constructed once and passed to consumers
pub struct DexContext {
    pub api: Arc<PokedexClient>,
    pub storage: Arc<dyn KeyValueStorage>,
    pub events: EventBus,
    pub catalog: CatalogCache,
    pub favorites: Favorites,
    pub team: Team,
    pub session: SessionTracker,
}

impl DexContext {
    /// Context backed by the on-disk storage file under `config.data_dir`
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.ensure_data_dir()?;
        let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::new(config.storage_path()));
        info!(path = %config.storage_path().display(), "Using local storage");
        Self::with_storage(&config.api_base_url, config.request_timeout, storage)
    }

    /// Context with volatile storage, mostly for tests
    pub fn in_memory(api_base_url: &str) -> Result<Self> {
        Self::with_storage(api_base_url, None, Arc::new(MemoryStorage::new()))
    }

    pub fn with_storage(
        api_base_url: &str,
        request_timeout: Option<Duration>,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Result<Self> {
        let events = EventBus::default();
        let api = Arc::new(PokedexClient::new(api_base_url, request_timeout)?);
        debug!(base_url = %api.base_url(), "API client ready");

        Ok(Self {
            catalog: CatalogCache::new().with_events(events.clone()),
            favorites: Favorites::new(storage.clone()).with_events(events.clone()),
            team: Team::new(storage.clone()).with_events(events.clone()),
            session: SessionTracker::new(api.clone(), storage.clone()).with_events(events.clone()),
            api,
            storage,
            events,
        })
    }

    /// Current catalog, fetching it first when nothing is loaded yet
    pub async fn ensure_catalog(&self) -> Result<Arc<Catalog>> {
        let snapshot = self.catalog.snapshot();
        if !snapshot.is_empty() {
            return Ok(snapshot);
        }
        self.catalog.load(&self.api).await
    }

    /// Roster rows for `view`, using the persisted favorites
    pub fn roster(&self, catalog: &Catalog, view: &ViewState) -> Vec<Pokemon> {
        let favorites = self.favorites.list();
        filter::apply(catalog.pokemons(), view, &favorites)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Favorite Pokémon narrowed by the text query
    pub fn favorites_view(&self, catalog: &Catalog, query: &str) -> Vec<Pokemon> {
        let view = ViewState {
            query: query.to_string(),
            favorites_only: true,
            ..ViewState::default()
        };
        self.roster(catalog, &view)
    }

    /// Catalog entries matching `query` that could still join the team
    pub fn team_candidates(&self, catalog: &Catalog, query: &str) -> Vec<Pokemon> {
        let view = ViewState {
            query: query.to_string(),
            ..ViewState::default()
        };
        self.roster(catalog, &view)
            .into_iter()
            .filter(|p| self.team.can_add(p.id))
            .collect()
    }

    /// One Pokémon fetched fresh from the backend, with catalog-relative scaling
    pub async fn detail(&self, id: PokemonId) -> Result<PokemonDetail> {
        let pokemon = self.api.get_pokemon(id).await?;
        let catalog = self.ensure_catalog().await?;
        Ok(PokemonDetail {
            favorite: self.favorites.is_favorite(pokemon.id),
            ceiling: *catalog.ceiling(),
            pokemon,
        })
    }
}

/// Data behind the detail view
#[derive(Debug, Clone, PartialEq)]
pub struct PokemonDetail {
    pub pokemon: Pokemon,
    pub favorite: bool,
    pub ceiling: StatCeiling,
}
