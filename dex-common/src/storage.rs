//! Local key/value storage
//!
//! String-valued storage with the same shape as browser local storage. The
//! client persists favorites, the team, the auth display hint and the session
//! cookie jar through it.
//!
//! Two implementations:
//! - [`MemoryStorage`]: process-local map, used by tests and ephemeral runs
//! - [`FileStorage`]: one JSON object file, rewritten atomically (temp + rename)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::{Error, Result};

/// File name used by [`FileStorage`] inside the data directory
pub const STORAGE_FILE_NAME: &str = "storage.json";

/// Outcome of an [`KeyValueStorage::update`] callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemUpdate {
    /// Leave the stored value as it is
    Keep,
    Set(String),
    Remove,
}

/// String key/value store
///
/// Errors are reported, never hidden here; callers that want best-effort
/// semantics (collections, auth hint) decide to swallow them.
pub trait KeyValueStorage: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value (absent key is not an error)
    fn remove_item(&self, key: &str) -> Result<()>;

    /// Read-modify-write of one key under the storage lock
    ///
    /// `apply` sees the current value and decides the new one. No other
    /// operation on the same storage can interleave between the read and the
    /// write.
    fn update(&self, key: &str, apply: &mut dyn FnMut(Option<&str>) -> ItemUpdate) -> Result<()>;
}

// ========================================
// MemoryStorage
// ========================================

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.items
            .lock()
            .map_err(|_| Error::Storage("memory storage lock poisoned".to_string()))
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn update(&self, key: &str, apply: &mut dyn FnMut(Option<&str>) -> ItemUpdate) -> Result<()> {
        let mut items = self.lock()?;
        match apply(items.get(key).map(String::as_str)) {
            ItemUpdate::Keep => {}
            ItemUpdate::Set(value) => {
                items.insert(key.to_string(), value);
            }
            ItemUpdate::Remove => {
                items.remove(key);
            }
        }
        Ok(())
    }
}

// ========================================
// FileStorage
// ========================================

/// JSON-file backed storage
///
/// The whole map lives in a single file. Each mutation is a read-modify-write
/// under an in-process mutex; other processes writing the same file are not
/// coordinated (last write wins).
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Storage file at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Storage file `storage.json` inside `data_dir`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(STORAGE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the map; a missing file is an empty map, a corrupt file is an error
    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content)
            .map_err(|e| Error::Storage(format!("{}: {}", self.path.display(), e)))
    }

    /// Load the map for a mutation; corrupt content is discarded so the
    /// write can proceed from an empty map
    fn read_map_for_write(&self) -> Result<BTreeMap<String, String>> {
        match self.read_map() {
            Err(Error::Storage(reason)) => {
                warn!("Discarding corrupt storage file: {}", reason);
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(map)
            .map_err(|e| Error::Storage(e.to_string()))?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        std::fs::write(&tmp_path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // Holds the session cookie
            std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp_path, &self.path)?;
        debug!(path = %self.path.display(), keys = map.len(), "Storage file written");
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| Error::Storage("file storage lock poisoned".to_string()))
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock()?;
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock()?;
        let mut map = self.read_map_for_write()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let _guard = self.lock()?;
        let mut map = self.read_map_for_write()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }

    fn update(&self, key: &str, apply: &mut dyn FnMut(Option<&str>) -> ItemUpdate) -> Result<()> {
        let _guard = self.lock()?;
        let mut map = self.read_map_for_write()?;
        match apply(map.get(key).map(String::as_str)) {
            ItemUpdate::Keep => Ok(()),
            ItemUpdate::Set(value) => {
                map.insert(key.to_string(), value);
                self.write_map(&map)
            }
            ItemUpdate::Remove => {
                if map.remove(key).is_some() {
                    self.write_map(&map)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("k").unwrap(), None);
        storage.set_item("k", "v").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v"));
        storage.remove_item("k").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), None);
    }

    #[test]
    fn test_file_storage_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::in_dir(dir.path());
        assert_eq!(storage.get_item("anything").unwrap(), None);
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        FileStorage::in_dir(dir.path()).set_item("mypokedex-team", "[1,2]").unwrap();

        let reopened = FileStorage::in_dir(dir.path());
        assert_eq!(
            reopened.get_item("mypokedex-team").unwrap().as_deref(),
            Some("[1,2]")
        );
        assert!(!dir.path().join("storage.json.tmp").exists());
    }

    #[test]
    fn test_file_storage_corrupt_file_reports_error_then_recovers_on_write() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::in_dir(dir.path());
        std::fs::write(storage.path(), "{not json").unwrap();

        assert!(matches!(storage.get_item("k"), Err(Error::Storage(_))));

        storage.set_item("k", "v").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_file_storage_creates_data_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = FileStorage::in_dir(&nested);
        storage.set_item("k", "v").unwrap();
        assert!(nested.join(STORAGE_FILE_NAME).exists());
    }

    #[test]
    fn test_update_sees_current_value() {
        let dir = TempDir::new().unwrap();
        let stores: [Box<dyn KeyValueStorage>; 2] = [
            Box::new(MemoryStorage::new()),
            Box::new(FileStorage::in_dir(dir.path())),
        ];

        for storage in &stores {
            storage
                .update("n", &mut |current| {
                    assert_eq!(current, None);
                    ItemUpdate::Set("1".to_string())
                })
                .unwrap();
            storage
                .update("n", &mut |current| {
                    let n: u32 = current.unwrap().parse().unwrap();
                    ItemUpdate::Set((n + 1).to_string())
                })
                .unwrap();
            assert_eq!(storage.get_item("n").unwrap().as_deref(), Some("2"));

            storage.update("n", &mut |_| ItemUpdate::Keep).unwrap();
            assert_eq!(storage.get_item("n").unwrap().as_deref(), Some("2"));

            storage.update("n", &mut |_| ItemUpdate::Remove).unwrap();
            assert_eq!(storage.get_item("n").unwrap(), None);
        }
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let storage = std::sync::Arc::new(FileStorage::in_dir(dir.path()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let storage = storage.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        storage
                            .update("counter", &mut |current| {
                                let n: u32 = current.map_or(0, |v| v.parse().unwrap());
                                ItemUpdate::Set((n + 1).to_string())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(storage.get_item("counter").unwrap().as_deref(), Some("100"));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_permissions_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let storage = FileStorage::in_dir(dir.path());
        storage.set_item("k", "v").unwrap();

        let mode = std::fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
