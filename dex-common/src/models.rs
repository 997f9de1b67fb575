//! Wire models shared by the MyPokedex client
//!
//! Field names follow the backend's camelCase JSON.

use serde::{Deserialize, Deserializer, Serialize};

/// Backend identifier of a Pokémon record
pub type PokemonId = i64;

const SPRITE_BASE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/other/official-artwork";

/// A catalog record with fixed base stats and type tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pokemon {
    pub id: PokemonId,
    pub pokedex_number: i64,
    pub name: String,
    pub hp: i64,
    pub attack: i64,
    pub defense: i64,
    pub speed: i64,
    /// Missing or `null` decodes as empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub types: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Base stat selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stat {
    Hp,
    Attack,
    Defense,
    Speed,
}

impl Stat {
    /// All stats in display order
    pub const ALL: [Stat; 4] = [Stat::Hp, Stat::Attack, Stat::Defense, Stat::Speed];

    pub fn label(self) -> &'static str {
        match self {
            Stat::Hp => "HP",
            Stat::Attack => "Attack",
            Stat::Defense => "Defense",
            Stat::Speed => "Speed",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            Stat::Hp => "HP",
            Stat::Attack => "ATK",
            Stat::Defense => "DEF",
            Stat::Speed => "SPD",
        }
    }
}

impl Pokemon {
    /// Value of one base stat
    pub fn stat(&self, stat: Stat) -> i64 {
        match stat {
            Stat::Hp => self.hp,
            Stat::Attack => self.attack,
            Stat::Defense => self.defense,
            Stat::Speed => self.speed,
        }
    }

    /// First type tag, lower-cased (`normal` when untyped)
    pub fn primary_type(&self) -> String {
        self.types
            .first()
            .map(|t| t.to_lowercase())
            .unwrap_or_else(|| "normal".to_string())
    }

    /// Official artwork URL keyed by pokedex number
    pub fn sprite_url(&self) -> String {
        format!("{}/{}.png", SPRITE_BASE_URL, self.pokedex_number)
    }

    /// Deterministic shiny flag (about 15% of ids), stable across runs
    pub fn is_shiny(&self) -> bool {
        self.id.wrapping_mul(97).wrapping_add(13).rem_euclid(100) < 15
    }

    /// Case-insensitive type membership
    pub fn has_type(&self, type_name: &str) -> bool {
        let wanted = type_name.to_lowercase();
        self.types.iter().any(|t| t.to_lowercase() == wanted)
    }
}

/// Aggregate stats computed by the backend for a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonStats {
    pub min_hp: i64,
    pub max_hp: i64,
    pub avg_hp: f64,
    pub min_attack: i64,
    pub max_attack: i64,
    pub avg_attack: f64,
    pub min_defense: i64,
    pub max_defense: i64,
    pub avg_defense: f64,
    pub min_speed: i64,
    pub max_speed: i64,
    pub avg_speed: f64,
}

impl ComparisonStats {
    /// `(min, max, avg)` for one stat
    pub fn summary(&self, stat: Stat) -> (i64, i64, f64) {
        match stat {
            Stat::Hp => (self.min_hp, self.max_hp, self.avg_hp),
            Stat::Attack => (self.min_attack, self.max_attack, self.avg_attack),
            Stat::Defense => (self.min_defense, self.max_defense, self.avg_defense),
            Stat::Speed => (self.min_speed, self.max_speed, self.avg_speed),
        }
    }
}

/// Response of `POST /api/pokemons/compare`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PokemonComparison {
    pub pokemons: Vec<Pokemon>,
    pub stats: ComparisonStats,
}

/// Body of `POST /api/auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /api/auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Trainer identity returned by login/register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerIdentity {
    pub trainer_id: i64,
    pub email: String,
    pub name: String,
}
