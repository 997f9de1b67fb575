//! Session presence tracking
//!
//! The backend owns the session (a cookie); this module only tracks whether
//! the client believes it has one. State starts as [`SessionStatus::Unknown`]
//! and becomes `Authenticated` or `Anonymous` after a login, logout or probe.
//!
//! A small hint (`mypokedex.auth`) is persisted so the trainer's name survives
//! restarts. The hint alone never counts as authenticated; only a successful
//! login or probe does.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use dex_common::events::{DexEvent, EventBus};
use dex_common::models::{LoginRequest, RegisterRequest, TrainerIdentity};
use dex_common::storage::KeyValueStorage;
use dex_common::{Error, Result};

use crate::api::{PokedexClient, SessionCookies};

/// Storage key of the persisted auth hint
pub const AUTH_HINT_KEY: &str = "mypokedex.auth";

/// What the client currently believes about the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// Not checked yet in this process
    #[default]
    Unknown,
    Authenticated,
    Anonymous,
}

/// Value published to session subscribers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub status: SessionStatus,
    /// Last known identity; may be set while status is still `Unknown`
    pub user: Option<TrainerIdentity>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthHint {
    is_logged_in: bool,
    #[serde(default)]
    current_user: Option<TrainerIdentity>,
}

/// Tracks session presence and publishes it over a watch channel
pub struct SessionTracker {
    api: Arc<PokedexClient>,
    storage: Arc<dyn KeyValueStorage>,
    cookies: SessionCookies,
    state: watch::Sender<SessionState>,
    events: Option<EventBus>,
}

impl SessionTracker {
    /// Restore stored cookies and the auth hint; status stays `Unknown`
    pub fn new(api: Arc<PokedexClient>, storage: Arc<dyn KeyValueStorage>) -> Self {
        let cookies = SessionCookies::new(storage.clone());
        cookies.restore(&api);

        let user = read_hint(storage.as_ref());
        if let Some(user) = &user {
            debug!(trainer_id = user.trainer_id, "Restored auth hint");
        }

        let (state, _) = watch::channel(SessionState {
            status: SessionStatus::Unknown,
            user,
        });

        Self {
            api,
            storage,
            cookies,
            state,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// In-memory check only, never touches the network
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Receiver that always holds the latest state
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn api(&self) -> &Arc<PokedexClient> {
        &self.api
    }

    /// Log in; on failure the state is left untouched
    pub async fn login(&self, email: &str, password: &str) -> Result<TrainerIdentity> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let identity = match self.api.login(&request).await {
            Ok(identity) => identity,
            Err(e) => {
                warn!("Login failed: {}", e);
                return Err(e);
            }
        };

        self.transition(SessionState {
            status: SessionStatus::Authenticated,
            user: Some(identity.clone()),
        });
        self.cookies.save(&self.api);
        Ok(identity)
    }

    /// Create an account; does not log the trainer in
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<TrainerIdentity> {
        let request = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        match self.api.register(&request).await {
            Ok(identity) => {
                info!(trainer_id = identity.trainer_id, "Trainer registered");
                Ok(identity)
            }
            Err(e) => {
                warn!("Registration failed: {}", e);
                Err(e)
            }
        }
    }

    /// Log out remotely and forget the session locally, whatever the backend says
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            warn!("Remote logout failed, clearing local session anyway: {}", e);
        }
        self.transition(SessionState {
            status: SessionStatus::Anonymous,
            user: None,
        });
        self.cookies.clear();
    }

    /// Drop the local session when a backend call was rejected as unauthorized
    ///
    /// Other errors leave the session alone. Returns true when it was dropped.
    pub fn observe_error(&self, error: &Error) -> bool {
        if !error.is_unauthorized() {
            return false;
        }
        info!("Backend rejected the session, logging out locally");
        self.transition(SessionState {
            status: SessionStatus::Anonymous,
            user: None,
        });
        self.cookies.clear();
        true
    }

    /// Ask the backend whether the session cookie is still valid
    ///
    /// Any non-2xx answer or transport failure means anonymous. Cookies are
    /// kept after a transport failure so a later probe can still succeed.
    pub async fn probe(&self) -> bool {
        match self.api.probe_session().await {
            Ok(status) if status.is_success() => {
                let user = self.state.borrow().user.clone();
                self.transition(SessionState {
                    status: SessionStatus::Authenticated,
                    user,
                });
                self.cookies.save(&self.api);
                true
            }
            Ok(status) => {
                debug!(status = status.as_u16(), "Session probe rejected");
                self.transition(SessionState {
                    status: SessionStatus::Anonymous,
                    user: None,
                });
                self.cookies.clear();
                false
            }
            Err(e) => {
                warn!("Session probe failed: {}", e);
                self.transition(SessionState {
                    status: SessionStatus::Anonymous,
                    user: None,
                });
                false
            }
        }
    }

    fn transition(&self, next: SessionState) {
        write_hint(self.storage.as_ref(), &next);

        let authenticated = next.is_authenticated();
        let previous = self.state.send_replace(next);
        if previous.is_authenticated() != authenticated {
            info!(authenticated, "Session changed");
            if let Some(events) = &self.events {
                events.emit_lossy(DexEvent::SessionChanged {
                    authenticated,
                    timestamp: chrono::Utc::now(),
                });
            }
        }
    }
}

fn read_hint(storage: &dyn KeyValueStorage) -> Option<TrainerIdentity> {
    let raw = match storage.get_item(AUTH_HINT_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!("Could not read auth hint: {}", e);
            return None;
        }
    };
    match serde_json::from_str::<AuthHint>(&raw) {
        Ok(hint) if hint.is_logged_in => hint.current_user,
        Ok(_) => None,
        Err(e) => {
            warn!("Ignoring malformed auth hint: {}", e);
            None
        }
    }
}

fn write_hint(storage: &dyn KeyValueStorage, state: &SessionState) {
    let result = if state.is_authenticated() {
        let hint = AuthHint {
            is_logged_in: true,
            current_user: state.user.clone(),
        };
        match serde_json::to_string(&hint) {
            Ok(json) => storage.set_item(AUTH_HINT_KEY, &json),
            Err(e) => {
                warn!("Could not encode auth hint: {}", e);
                return;
            }
        }
    } else {
        storage.remove_item(AUTH_HINT_KEY)
    };
    if let Err(e) = result {
        warn!("Could not persist auth hint: {}", e);
    }
}
