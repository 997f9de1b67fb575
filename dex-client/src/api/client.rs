//! REST client for the Pokedex backend
//!
//! All requests share one cookie jar so the session cookie set by
//! `POST /api/auth/login` is sent with every later call.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use dex_common::models::{
    LoginRequest, Pokemon, PokemonComparison, PokemonId, RegisterRequest, TrainerIdentity,
};
use dex_common::{Error, Result};

const USER_AGENT: &str = concat!("mypokedex/", env!("CARGO_PKG_VERSION"));

/// Endpoint used only to test whether the session cookie is still valid
pub const SESSION_PROBE_PATH: &str = "/api/trainers";

/// Pokedex backend client
pub struct PokedexClient {
    http: reqwest::Client,
    base_url: Url,
    jar: Arc<Jar>,
}

impl PokedexClient {
    /// Client for `base_url` (e.g. `http://localhost:8080`)
    ///
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid API base URL {:?}: {}", base_url, e)))?;
        let jar = Arc::new(Jar::default());

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_provider(jar.clone());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            jar,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    // ========================================
    // Cookie jar
    // ========================================

    /// Cookies the jar would send to the backend, as a `Cookie` header value
    pub fn export_cookies(&self) -> Option<String> {
        self.jar
            .cookies(&self.base_url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// Seed the jar from a previously exported `Cookie` header value
    pub fn import_cookies(&self, header: &str) {
        for pair in header.split(';').map(str::trim).filter(|p| p.contains('=')) {
            self.jar.add_cookie_str(pair, &self.base_url);
        }
    }

    // ========================================
    // Auth
    // ========================================

    /// `POST /api/auth/login`; the session is delivered as a cookie
    pub async fn login(&self, request: &LoginRequest) -> Result<TrainerIdentity> {
        debug!(email = %request.email, "Logging in");
        let response = self
            .http
            .post(self.url("/api/auth/login"))
            .json(request)
            .send()
            .await
            .map_err(network_error)?;
        let identity: TrainerIdentity = decode(response).await?;
        info!(trainer_id = identity.trainer_id, "Logged in");
        Ok(identity)
    }

    /// `POST /api/auth/register`
    pub async fn register(&self, request: &RegisterRequest) -> Result<TrainerIdentity> {
        debug!(email = %request.email, "Registering trainer");
        let response = self
            .http
            .post(self.url("/api/auth/register"))
            .json(request)
            .send()
            .await
            .map_err(network_error)?;
        decode(response).await
    }

    /// `POST /api/auth/logout`, returns the backend's text body
    pub async fn logout(&self) -> Result<String> {
        let response = self
            .http
            .post(self.url("/api/auth/logout"))
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::from_status(status.as_u16(), body));
        }
        Ok(body)
    }

    /// Status of `GET /api/trainers`; the body is ignored
    pub async fn probe_session(&self) -> Result<StatusCode> {
        let response = self
            .http
            .get(self.url(SESSION_PROBE_PATH))
            .send()
            .await
            .map_err(network_error)?;
        Ok(response.status())
    }

    // ========================================
    // Pokémon
    // ========================================

    /// `GET /api/pokemons`
    pub async fn list_pokemons(&self) -> Result<Vec<Pokemon>> {
        let response = self
            .http
            .get(self.url("/api/pokemons"))
            .send()
            .await
            .map_err(network_error)?;
        let pokemons: Vec<Pokemon> = decode(response).await?;
        debug!(count = pokemons.len(), "Fetched catalog");
        Ok(pokemons)
    }

    /// `GET /api/pokemons/{id}`
    pub async fn get_pokemon(&self, id: PokemonId) -> Result<Pokemon> {
        let response = self
            .http
            .get(self.url(&format!("/api/pokemons/{}", id)))
            .send()
            .await
            .map_err(network_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("pokemon {}", id)));
        }
        decode(response).await
    }

    /// `POST /api/pokemons/compare` with the id list as body
    pub async fn compare(&self, ids: &[PokemonId]) -> Result<PokemonComparison> {
        debug!(?ids, "Requesting comparison");
        let response = self
            .http
            .post(self.url("/api/pokemons/compare"))
            .json(ids)
            .send()
            .await
            .map_err(network_error)?;
        decode(response).await
    }
}

fn network_error(e: reqwest::Error) -> Error {
    Error::Network(e.to_string())
}

/// Turn a response into `T`, mapping non-2xx statuses to errors
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::from_status(status.as_u16(), body));
    }

    let bytes = response.bytes().await.map_err(network_error)?;
    serde_json::from_slice(&bytes).map_err(|e| Error::Decode(e.to_string()))
}
