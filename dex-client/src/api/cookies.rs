//! Persistence of the session cookie jar
//!
//! The backend keeps the session server-side and identifies it with a cookie.
//! A browser keeps that cookie for us; the CLI stores the `Cookie` header value
//! for the API origin in local storage instead.

use std::sync::Arc;

use tracing::{debug, warn};

use dex_common::storage::KeyValueStorage;

use super::PokedexClient;

/// Storage key of the persisted cookie header
pub const COOKIES_KEY: &str = "mypokedex.cookies";

/// Best-effort cookie persistence
#[derive(Clone)]
pub struct SessionCookies {
    storage: Arc<dyn KeyValueStorage>,
}

impl SessionCookies {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Load stored cookies into the client's jar
    pub fn restore(&self, client: &PokedexClient) {
        match self.storage.get_item(COOKIES_KEY) {
            Ok(Some(header)) => {
                client.import_cookies(&header);
                debug!("Restored session cookies");
            }
            Ok(None) => {}
            Err(e) => warn!("Could not read stored cookies: {}", e),
        }
    }

    /// Store whatever the jar currently holds for the backend
    pub fn save(&self, client: &PokedexClient) {
        let result = match client.export_cookies() {
            Some(header) => self.storage.set_item(COOKIES_KEY, &header),
            None => self.storage.remove_item(COOKIES_KEY),
        };
        if let Err(e) = result {
            warn!("Could not persist session cookies: {}", e);
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.storage.remove_item(COOKIES_KEY) {
            warn!("Could not remove stored cookies: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_common::storage::MemoryStorage;

    #[test]
    fn test_save_then_restore_into_fresh_client() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let cookies = SessionCookies::new(storage.clone());

        let first = PokedexClient::new("http://localhost:8080", None).unwrap();
        first.import_cookies("JSESSIONID=s3ss10n");
        cookies.save(&first);
        assert!(storage.get_item(COOKIES_KEY).unwrap().is_some());

        let second = PokedexClient::new("http://localhost:8080", None).unwrap();
        cookies.restore(&second);
        assert_eq!(second.export_cookies().as_deref(), Some("JSESSIONID=s3ss10n"));
    }

    #[test]
    fn test_save_with_empty_jar_removes_entry() {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        storage.set_item(COOKIES_KEY, "JSESSIONID=old").unwrap();

        let client = PokedexClient::new("http://localhost:8080", None).unwrap();
        SessionCookies::new(storage.clone()).save(&client);
        assert_eq!(storage.get_item(COOKIES_KEY).unwrap(), None);
    }
}
