mod support;

use std::collections::HashMap;
use std::sync::Arc;
use support::{settle, MemoryStore};
use voxlate::history::{HistoryEntry, HistorySynchronizer, MAX_CACHED_ENTRIES};
use voxlate::session::LanguageSet;

fn entry(n: usize) -> HistoryEntry {
    HistoryEntry::new("en", "es", &format!("original {}", n), &format!("translated {}", n))
}

#[tokio::test]
async fn test_cache_is_bounded_and_newest_first() {
    let mut sync = HistorySynchronizer::new(Arc::new(MemoryStore::new()));

    for n in 0..55 {
        sync.record(entry(n));
    }

    assert_eq!(sync.entries().len(), MAX_CACHED_ENTRIES);
    // Most recent entry first
    assert_eq!(sync.entries()[0].original, "original 54");
    // Entries 0..=4 were evicted
    assert_eq!(sync.entries().last().unwrap().original, "original 5");
}

#[tokio::test]
async fn test_eviction_on_full_cache() {
    let mut sync = HistorySynchronizer::new(Arc::new(MemoryStore::new()));

    for n in 0..MAX_CACHED_ENTRIES {
        sync.record(entry(n));
    }
    assert_eq!(sync.entries().len(), MAX_CACHED_ENTRIES);
    let oldest = sync.entries().last().unwrap().original.clone();

    sync.record(entry(999));

    assert_eq!(sync.entries().len(), MAX_CACHED_ENTRIES);
    assert_eq!(sync.entries()[0].original, "original 999");
    assert_ne!(sync.entries().last().unwrap().original, oldest);
}

#[tokio::test]
async fn test_load_seeds_cache_in_server_order() {
    let seed: Vec<HistoryEntry> = (0..60).map(entry).collect();
    let mut sync = HistorySynchronizer::new(Arc::new(MemoryStore::with_seed(seed)));

    sync.load().await.unwrap();

    // Server order preserved, truncated to the cache bound
    assert_eq!(sync.entries().len(), MAX_CACHED_ENTRIES);
    assert_eq!(sync.entries()[0].original, "original 0");
    assert_eq!(sync.entries()[49].original, "original 49");
}

#[tokio::test]
async fn test_record_persists_to_store() {
    let store = MemoryStore::new();
    let saved = store.saved();
    let mut sync = HistorySynchronizer::new(Arc::new(store));

    sync.record(entry(1));
    settle().await;

    let saved = saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].original, "original 1");
}

#[tokio::test]
async fn test_persistence_failure_is_not_rolled_back() {
    let mut sync = HistorySynchronizer::new(Arc::new(MemoryStore::failing_saves()));

    sync.record(entry(1));
    settle().await;

    // Local cache is optimistic and authoritative for the session
    assert_eq!(sync.entries().len(), 1);
    assert_eq!(sync.entries()[0].original, "original 1");
}

#[tokio::test]
async fn test_clear_is_local_only() {
    let store = MemoryStore::new();
    let saved = store.saved();
    let mut sync = HistorySynchronizer::new(Arc::new(store));

    sync.record(entry(1));
    sync.record(entry(2));
    settle().await;

    sync.clear();

    assert!(sync.entries().is_empty());
    // Remote history untouched
    assert_eq!(saved.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_resolve_display_name_falls_back_to_code() {
    let mut sync = HistorySynchronizer::new(Arc::new(MemoryStore::new()));

    let mut mapping = HashMap::new();
    mapping.insert("Spanish".to_string(), "es".to_string());
    mapping.insert("French".to_string(), "fr".to_string());

    let mut languages = LanguageSet::default();
    languages.update(mapping);
    sync.set_languages(languages);

    assert_eq!(sync.resolve_display_name("es"), "Spanish");
    assert_eq!(sync.resolve_display_name("fr"), "French");
    // Unknown codes come back unchanged, never an error
    assert_eq!(sync.resolve_display_name("xx"), "xx");
    assert_eq!(sync.resolve_display_name(""), "");
}
