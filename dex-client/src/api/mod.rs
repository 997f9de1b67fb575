//! Backend access
//!
//! [`PokedexClient`] wraps the REST endpoints; [`SessionCookies`] carries the
//! session cookie across process restarts.

pub mod client;
pub mod cookies;

pub use client::{PokedexClient, SESSION_PROBE_PATH};
pub use cookies::{SessionCookies, COOKIES_KEY};
