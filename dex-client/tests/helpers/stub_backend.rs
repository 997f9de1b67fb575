//! In-process stand-in for the Pokedex backend
//!
//! Serves the REST endpoints the client uses on `127.0.0.1:0`. Sessions are
//! tracked by a `JSESSIONID` cookie; catalog, detail and compare endpoints
//! answer 401 without a live session.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

pub const ASH_EMAIL: &str = "ash@pallet.town";
pub const ASH_PASSWORD: &str = "pikachu";

#[derive(Debug, Clone, Copy, Default)]
pub struct StubOptions {
    /// Answer `POST /api/auth/logout` with 500
    pub fail_logout: bool,
}

#[derive(Clone)]
struct Stub {
    options: StubOptions,
    sessions: Arc<Mutex<HashSet<String>>>,
    next_session: Arc<AtomicU64>,
}

/// Start the stub and return its base URL
pub async fn spawn_stub(options: StubOptions) -> String {
    let stub = Stub {
        options,
        sessions: Arc::new(Mutex::new(HashSet::new())),
        next_session: Arc::new(AtomicU64::new(1)),
    };

    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/logout", post(logout))
        .route("/api/trainers", get(trainers))
        .route("/api/pokemons", get(list_pokemons))
        .route("/api/pokemons/compare", post(compare))
        .route("/api/pokemons/:id", get(get_pokemon))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Base URL of a port nothing listens on
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn catalog() -> Vec<Value> {
    vec![
        json!({"id": 1, "pokedexNumber": 25, "name": "Pikachu", "hp": 35, "attack": 55,
               "defense": 40, "speed": 90, "types": ["Electric"]}),
        json!({"id": 2, "pokedexNumber": 1, "name": "Bulbasaur", "hp": 45, "attack": 49,
               "defense": 49, "speed": 45, "types": ["Grass", "Poison"]}),
    ]
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("JSESSIONID=").map(str::to_string))
}

fn authorized(stub: &Stub, headers: &HeaderMap) -> bool {
    session_token(headers)
        .map(|token| stub.sessions.lock().unwrap().contains(&token))
        .unwrap_or(false)
}

async fn login(State(stub): State<Stub>, Json(body): Json<Value>) -> Response {
    if body["email"] != ASH_EMAIL || body["password"] != ASH_PASSWORD {
        return (StatusCode::UNAUTHORIZED, "Bad credentials").into_response();
    }
    let token = format!("s{}", stub.next_session.fetch_add(1, Ordering::SeqCst));
    stub.sessions.lock().unwrap().insert(token.clone());
    (
        [(header::SET_COOKIE, format!("JSESSIONID={}; Path=/; HttpOnly", token))],
        Json(json!({"trainerId": 1, "email": ASH_EMAIL, "name": "Ash"})),
    )
        .into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == ASH_EMAIL {
        return (StatusCode::CONFLICT, "Email already registered").into_response();
    }
    Json(json!({"trainerId": 2, "email": body["email"], "name": body["name"]})).into_response()
}

async fn logout(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    if stub.options.fail_logout {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    if let Some(token) = session_token(&headers) {
        stub.sessions.lock().unwrap().remove(&token);
    }
    "Logged out successfully".into_response()
}

async fn trainers(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    if !authorized(&stub, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!([{"trainerId": 1, "email": ASH_EMAIL, "name": "Ash"}])).into_response()
}

async fn list_pokemons(State(stub): State<Stub>, headers: HeaderMap) -> Response {
    if !authorized(&stub, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(catalog()).into_response()
}

async fn get_pokemon(State(stub): State<Stub>, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    if !authorized(&stub, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match catalog().into_iter().find(|p| p["id"] == id) {
        Some(pokemon) => Json(pokemon).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn compare(State(stub): State<Stub>, headers: HeaderMap, Json(ids): Json<Vec<i64>>) -> Response {
    if !authorized(&stub, &headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let pokemons: Vec<Value> = catalog()
        .into_iter()
        .filter(|p| p["id"].as_i64().map(|id| ids.contains(&id)).unwrap_or(false))
        .collect();
    Json(json!({
        "pokemons": pokemons,
        "stats": {
            "minHp": 35, "maxHp": 45, "avgHp": 40.0,
            "minAttack": 49, "maxAttack": 55, "avgAttack": 52.0,
            "minDefense": 40, "maxDefense": 49, "avgDefense": 44.5,
            "minSpeed": 45, "maxSpeed": 90, "avgSpeed": 67.5
        }
    }))
    .into_response()
}
