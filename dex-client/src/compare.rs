//! Pokémon comparison
//!
//! The aggregate numbers (min/max/avg per stat) come from the backend and are
//! shown as returned. The only local computation is bar scaling, which uses the
//! maximum among the compared Pokémon rather than the catalog maximum.

use tracing::debug;

use dex_common::models::{ComparisonStats, Pokemon, PokemonComparison, PokemonId, Stat};
use dex_common::Result;

use crate::api::PokedexClient;
use crate::catalog::Catalog;
use crate::filter::StatCeiling;

/// Resolve one picker token against the catalog
///
/// Numeric tokens match an id first, then a pokedex number. Other tokens match
/// a name exactly, ignoring case.
pub fn resolve_token<'a>(token: &str, catalog: &'a Catalog) -> Option<&'a Pokemon> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    match token.parse::<i64>() {
        Ok(number) => catalog
            .get(number)
            .or_else(|| catalog.find_by_pokedex_number(number)),
        Err(_) => catalog.find_by_name(token),
    }
}

/// Pokémon picked for comparison, unique, in pick order
#[derive(Debug, Clone, Default)]
pub struct CompareSelection {
    selected: Vec<Pokemon>,
}

impl CompareSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every resolvable token of a comma-separated list
    ///
    /// Unresolvable tokens are dropped. Returns how many Pokémon were added.
    pub fn add_from_input(&mut self, input: &str, catalog: &Catalog) -> usize {
        let mut added = 0;
        for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match resolve_token(token, catalog) {
                Some(pokemon) => {
                    if self.add(pokemon.clone()) {
                        added += 1;
                    }
                }
                None => debug!(token, "Dropping unresolved compare token"),
            }
        }
        added
    }

    /// Returns false when already selected
    pub fn add(&mut self, pokemon: Pokemon) -> bool {
        if self.is_selected(pokemon.id) {
            return false;
        }
        self.selected.push(pokemon);
        true
    }

    pub fn remove(&mut self, id: PokemonId) -> bool {
        let before = self.selected.len();
        self.selected.retain(|p| p.id != id);
        self.selected.len() != before
    }

    /// Select or deselect; returns whether `pokemon` is selected afterwards
    pub fn toggle(&mut self, pokemon: &Pokemon) -> bool {
        if self.remove(pokemon.id) {
            false
        } else {
            self.add(pokemon.clone())
        }
    }

    pub fn is_selected(&self, id: PokemonId) -> bool {
        self.selected.iter().any(|p| p.id == id)
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn selected(&self) -> &[Pokemon] {
        &self.selected
    }

    pub fn ids(&self) -> Vec<PokemonId> {
        self.selected.iter().map(|p| p.id).collect()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Compare the current selection; `None` without a request when empty
    pub async fn compare(&self, api: &PokedexClient) -> Result<Option<ComparisonView>> {
        compare(api, &self.ids()).await
    }
}

/// Backend comparison plus locally scaled stat bars
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonView {
    result: PokemonComparison,
    ceiling: StatCeiling,
}

impl ComparisonView {
    pub fn new(result: PokemonComparison) -> Self {
        let ceiling = StatCeiling::local(&result.pokemons);
        Self { result, ceiling }
    }

    /// Resolved Pokémon, in backend order
    pub fn pokemons(&self) -> &[Pokemon] {
        &self.result.pokemons
    }

    /// Aggregates exactly as returned by the backend
    pub fn stats(&self) -> &ComparisonStats {
        &self.result.stats
    }

    /// Bar width relative to the strongest compared Pokémon
    pub fn stat_percent(&self, pokemon: &Pokemon, stat: Stat) -> u8 {
        self.ceiling.percent(pokemon, stat)
    }
}

/// Ask the backend to compare `ids`; `None` without a request when empty
pub async fn compare(api: &PokedexClient, ids: &[PokemonId]) -> Result<Option<ComparisonView>> {
    if ids.is_empty() {
        return Ok(None);
    }
    let result = api.compare(ids).await?;
    Ok(Some(ComparisonView::new(result)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pokemon(id: PokemonId, dex: i64, name: &str, hp: i64) -> Pokemon {
        Pokemon {
            id,
            pokedex_number: dex,
            name: name.to_string(),
            hp,
            attack: 50,
            defense: 50,
            speed: 50,
            types: Vec::new(),
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            pokemon(1, 25, "Pikachu", 35),
            pokemon(2, 1, "Bulbasaur", 45),
            pokemon(25, 4, "Charmander", 39),
        ])
    }

    #[test]
    fn test_numeric_token_prefers_id_over_dex() {
        let catalog = catalog();
        // 25 is both Charmander's id and Pikachu's pokedex number
        assert_eq!(resolve_token("25", &catalog).map(|p| p.id), Some(25));
        // 4 is only a pokedex number
        assert_eq!(resolve_token("4", &catalog).map(|p| p.id), Some(25));
        assert!(resolve_token("999", &catalog).is_none());
    }

    #[test]
    fn test_name_token_exact_case_insensitive() {
        let catalog = catalog();
        assert_eq!(resolve_token("bulbasaur", &catalog).map(|p| p.id), Some(2));
        assert!(resolve_token("bulba", &catalog).is_none());
    }

    #[test]
    fn test_add_from_input_drops_unknown_and_duplicates() {
        let catalog = catalog();
        let mut selection = CompareSelection::new();
        let added = selection.add_from_input(" pikachu, 2 ,, missingno, 1, PIKACHU", &catalog);
        assert_eq!(added, 2);
        assert_eq!(selection.ids(), vec![1, 2]);
    }

    #[test]
    fn test_toggle_removes_selected() {
        let catalog = catalog();
        let mut selection = CompareSelection::new();
        let pikachu = catalog.get(1).unwrap().clone();

        assert!(selection.toggle(&pikachu));
        assert!(selection.is_selected(1));
        assert!(!selection.toggle(&pikachu));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_clear() {
        let catalog = catalog();
        let mut selection = CompareSelection::new();
        selection.add_from_input("1,2", &catalog);
        selection.clear();
        assert_eq!(selection.len(), 0);
    }

    #[test]
    fn test_view_scales_against_compared_subset() {
        let result = PokemonComparison {
            pokemons: vec![pokemon(1, 25, "Pikachu", 35), pokemon(2, 1, "Bulbasaur", 70)],
            stats: ComparisonStats {
                min_hp: 35,
                max_hp: 70,
                avg_hp: 52.5,
                min_attack: 50,
                max_attack: 50,
                avg_attack: 50.0,
                min_defense: 50,
                max_defense: 50,
                avg_defense: 50.0,
                min_speed: 50,
                max_speed: 50,
                avg_speed: 50.0,
            },
        };
        let view = ComparisonView::new(result);
        let pikachu = &view.pokemons()[0];
        assert_eq!(view.stat_percent(pikachu, Stat::Hp), 50);
        assert_eq!(view.stat_percent(pikachu, Stat::Speed), 100);
        assert_eq!(view.stats().avg_hp, 52.5);
    }
}
