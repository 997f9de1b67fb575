//! # MyPokedex Common Library
//!
//! Shared code for the MyPokedex client crates:
//! - Wire models (Pokémon, comparison, auth payloads)
//! - Error type
//! - Configuration loading
//! - Event types and EventBus
//! - Local key/value storage and the persisted favorites/team collections

pub mod collections;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod storage;

pub use error::{Error, Result};
pub use models::{Pokemon, PokemonId, Stat};
