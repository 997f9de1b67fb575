//! Roster filtering and sorting
//!
//! [`apply`] turns a catalog and a [`ViewState`] into the ordered list shown to
//! the trainer. It is a pure function: the same inputs always produce the same
//! output, and nothing about the view is remembered between calls.
//!
//! Stages, in order:
//! 1. text query (name substring, case-insensitive, or pokedex-number substring)
//! 2. favorites-only membership
//! 3. type facet
//! 4. minimum stat thresholds
//! 5. stable sort by [`SortKey`]
//!
//! Also here: the type-ahead [`SuggestionIndex`] and the [`StatCeiling`] used
//! to scale stat bars.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use dex_common::models::{Pokemon, PokemonId, Stat};
use dex_common::Error;

/// Maximum number of type-ahead suggestions
pub const SUGGESTION_LIMIT: usize = 6;

// ========================================
// View state
// ========================================

/// Roster ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Ascending pokedex number
    #[default]
    Dex,
    /// Ascending name, case-insensitive
    Name,
    /// Descending HP
    Hp,
    /// Descending attack
    Attack,
    /// Descending speed
    Speed,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Dex => "dex",
            SortKey::Name => "name",
            SortKey::Hp => "hp",
            SortKey::Attack => "attack",
            SortKey::Speed => "speed",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dex" => Ok(SortKey::Dex),
            "name" => Ok(SortKey::Name),
            "hp" => Ok(SortKey::Hp),
            "attack" => Ok(SortKey::Attack),
            "speed" => Ok(SortKey::Speed),
            other => Err(Error::InvalidInput(format!("unknown sort key {:?}", other))),
        }
    }
}

/// Type filter; `All` disables it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TypeFacet {
    #[default]
    All,
    Only(String),
}

impl TypeFacet {
    /// `"all"` (any case) or blank means no type filter
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("all") {
            TypeFacet::All
        } else {
            TypeFacet::Only(value.to_string())
        }
    }

    fn matches(&self, pokemon: &Pokemon) -> bool {
        match self {
            TypeFacet::All => true,
            TypeFacet::Only(type_name) => pokemon.has_type(type_name),
        }
    }
}

/// Filter dimensions beyond the text query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Facets {
    pub type_facet: TypeFacet,
    pub min_hp: i64,
    pub min_attack: i64,
    pub min_defense: i64,
    pub min_speed: i64,
}

impl Facets {
    fn thresholds_pass(&self, pokemon: &Pokemon) -> bool {
        pokemon.hp >= self.min_hp
            && pokemon.attack >= self.min_attack
            && pokemon.defense >= self.min_defense
            && pokemon.speed >= self.min_speed
    }
}

/// Everything the roster view is derived from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub query: String,
    pub favorites_only: bool,
    pub facets: Facets,
    pub sort_key: SortKey,
}

// ========================================
// Pipeline
// ========================================

/// Name or pokedex-number match against an already lower-cased query
pub fn matches_query(pokemon: &Pokemon, query_lower: &str) -> bool {
    query_lower.is_empty()
        || pokemon.name.to_lowercase().contains(query_lower)
        || pokemon.pokedex_number.to_string().contains(query_lower)
}

/// Filter and sort `catalog` according to `view`
///
/// The query is lower-cased but used as typed, surrounding whitespace
/// included. `favorites` is only consulted when `view.favorites_only` is set. The
/// result borrows from `catalog`; entities with equal sort keys keep their
/// catalog order.
pub fn apply<'a>(catalog: &'a [Pokemon], view: &ViewState, favorites: &[PokemonId]) -> Vec<&'a Pokemon> {
    let query = view.query.to_lowercase();
    let favorite_set: HashSet<PokemonId> = if view.favorites_only {
        favorites.iter().copied().collect()
    } else {
        HashSet::new()
    };

    let mut result: Vec<&Pokemon> = catalog
        .iter()
        .filter(|p| matches_query(p, &query))
        .filter(|p| !view.favorites_only || favorite_set.contains(&p.id))
        .filter(|p| view.facets.type_facet.matches(p))
        .filter(|p| view.facets.thresholds_pass(p))
        .collect();

    sort_stable(&mut result, view.sort_key);
    result
}

fn sort_stable(result: &mut [&Pokemon], key: SortKey) {
    // All slice sorts used here are stable
    match key {
        SortKey::Dex => result.sort_by_key(|p| p.pokedex_number),
        SortKey::Name => result.sort_by_cached_key(|p| p.name.to_lowercase()),
        SortKey::Hp => result.sort_by_key(|p| Reverse(p.hp)),
        SortKey::Attack => result.sort_by_key(|p| Reverse(p.attack)),
        SortKey::Speed => result.sort_by_key(|p| Reverse(p.speed)),
    }
}

/// Comparison picker search: name, id or pokedex number contains the query
pub fn search_candidates<'a>(catalog: &'a [Pokemon], query: &str) -> Vec<&'a Pokemon> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return catalog.iter().collect();
    }
    catalog
        .iter()
        .filter(|p| matches_query(p, &query) || p.id.to_string().contains(&query))
        .collect()
}

/// Sorted distinct type tags
pub fn type_options(catalog: &[Pokemon]) -> Vec<String> {
    catalog
        .iter()
        .flat_map(|p| p.types.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ========================================
// Suggestions
// ========================================

/// Names and pokedex numbers for type-ahead, deduplicated and sorted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionIndex {
    entries: Vec<String>,
}

impl SuggestionIndex {
    pub fn new(catalog: &[Pokemon]) -> Self {
        let entries: BTreeSet<String> = catalog
            .iter()
            .flat_map(|p| [p.name.clone(), p.pokedex_number.to_string()])
            .collect();
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// First [`SUGGESTION_LIMIT`] entries containing `query`, case-insensitive
    pub fn suggest(&self, query: &str) -> Vec<&str> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.entries
            .iter()
            .filter(|entry| entry.to_lowercase().contains(&query))
            .take(SUGGESTION_LIMIT)
            .map(String::as_str)
            .collect()
    }
}

// ========================================
// Stat bars
// ========================================

/// Per-stat maximum used to scale stat bars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatCeiling {
    pub hp: i64,
    pub attack: i64,
    pub defense: i64,
    pub speed: i64,
}

impl StatCeiling {
    /// Catalog-wide maxima, each at least 1
    pub fn from_catalog(catalog: &[Pokemon]) -> Self {
        let floor = Self {
            hp: 1,
            attack: 1,
            defense: 1,
            speed: 1,
        };
        catalog.iter().fold(floor, |acc, p| acc.raised_by(p))
    }

    /// Maxima among `subset` only, no floor (0 for an empty subset)
    pub fn local(subset: &[Pokemon]) -> Self {
        let mut iter = subset.iter();
        let Some(first) = iter.next() else {
            return Self {
                hp: 0,
                attack: 0,
                defense: 0,
                speed: 0,
            };
        };
        let start = Self {
            hp: first.hp,
            attack: first.attack,
            defense: first.defense,
            speed: first.speed,
        };
        iter.fold(start, |acc, p| acc.raised_by(p))
    }

    fn raised_by(self, p: &Pokemon) -> Self {
        Self {
            hp: self.hp.max(p.hp),
            attack: self.attack.max(p.attack),
            defense: self.defense.max(p.defense),
            speed: self.speed.max(p.speed),
        }
    }

    pub fn max(&self, stat: Stat) -> i64 {
        match stat {
            Stat::Hp => self.hp,
            Stat::Attack => self.attack,
            Stat::Defense => self.defense,
            Stat::Speed => self.speed,
        }
    }

    /// Bar width for `pokemon`'s `stat`, 0..=100
    pub fn percent(&self, pokemon: &Pokemon, stat: Stat) -> u8 {
        stat_percent(pokemon.stat(stat), self.max(stat))
    }
}

impl Default for StatCeiling {
    fn default() -> Self {
        Self::from_catalog(&[])
    }
}

/// `round(min(100, value / max * 100))`; 0 when `max <= 0`
pub fn stat_percent(value: i64, max: i64) -> u8 {
    if max <= 0 {
        return 0;
    }
    let pct = (value as f64 / max as f64 * 100.0).min(100.0).round();
    pct.max(0.0) as u8
}
