//! Integration tests for favorites and team persisted through FileStorage
//!
//! Tests cover:
//! - Collections survive a restart (new storage instance on the same file)
//! - Corrupt storage file reads as empty without panicking
//! - Favorites and team share one storage file without clobbering each other
//! - Concurrent writers sharing one storage file lose no updates

use std::sync::Arc;

use dex_common::collections::{Favorites, Team, FAVORITES_KEY, TEAM_KEY};
use dex_common::storage::{FileStorage, KeyValueStorage};
use tempfile::TempDir;

fn file_storage(dir: &TempDir) -> Arc<dyn KeyValueStorage> {
    Arc::new(FileStorage::in_dir(dir.path()))
}

#[test]
fn test_collections_survive_restart() {
    let dir = TempDir::new().unwrap();

    {
        let storage = file_storage(&dir);
        let favorites = Favorites::new(storage.clone());
        let team = Team::new(storage);
        favorites.add(25);
        favorites.add(1);
        team.add(6);
    }

    let storage = file_storage(&dir);
    assert_eq!(Favorites::new(storage.clone()).list(), vec![25, 1]);
    assert_eq!(Team::new(storage).list(), vec![6]);
}

#[test]
fn test_corrupt_storage_file_reads_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("storage.json"), "<<<garbage>>>").unwrap();

    let storage = file_storage(&dir);
    let favorites = Favorites::new(storage.clone());
    assert!(favorites.list().is_empty());
    assert!(!favorites.is_favorite(1));

    // First write replaces the corrupt file
    assert!(favorites.add(1));
    assert_eq!(Favorites::new(storage).list(), vec![1]);
}

#[test]
fn test_corrupt_value_for_one_key_leaves_other_intact() {
    let dir = TempDir::new().unwrap();
    let storage = file_storage(&dir);
    storage.set_item(TEAM_KEY, "[1,2,3]").unwrap();
    storage.set_item(FAVORITES_KEY, "not-an-array").unwrap();

    assert!(Favorites::new(storage.clone()).list().is_empty());
    assert_eq!(Team::new(storage).list(), vec![1, 2, 3]);
}

#[test]
fn test_team_never_exceeds_six_across_restarts() {
    let dir = TempDir::new().unwrap();
    for id in 1..=4 {
        Team::new(file_storage(&dir)).add(id);
    }
    for id in 5..=9 {
        Team::new(file_storage(&dir)).add(id);
    }

    let team = Team::new(file_storage(&dir));
    assert_eq!(team.list(), vec![1, 2, 3, 4, 5, 6]);

    team.clear();
    assert!(Team::new(file_storage(&dir)).list().is_empty());
}

#[test]
fn test_shared_file_storage_keeps_concurrent_writes() {
    // Given: favorites and team writers on one storage file
    let dir = TempDir::new().unwrap();
    let storage = file_storage(&dir);
    let favorites = Favorites::new(storage.clone());
    let team = Team::new(storage);

    // When: several threads add at the same time
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let favorites = favorites.clone();
            let team = team.clone();
            std::thread::spawn(move || {
                for n in 0..20 {
                    favorites.add(worker * 100 + n);
                }
                team.add(worker);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Then: nothing was overwritten, on disk or in memory
    let reopened = file_storage(&dir);
    assert_eq!(Favorites::new(reopened.clone()).list().len(), 80);
    let mut members = Team::new(reopened).list();
    members.sort_unstable();
    assert_eq!(members, vec![0, 1, 2, 3]);
}
