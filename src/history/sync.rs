use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use super::store::{HistoryEntry, HistoryStore};
use crate::session::languages::LanguageSet;

/// Most recent entries kept in the local cache
pub const MAX_CACHED_ENTRIES: usize = 50;

/// Merges server-confirmed history with a bounded in-memory cache.
///
/// The cache is ordered newest-first and is authoritative for the
/// session; the external store is updated best-effort and failures are
/// logged, never surfaced.
pub struct HistorySynchronizer {
    store: Arc<dyn HistoryStore>,
    entries: Vec<HistoryEntry>,
    languages: LanguageSet,
}

impl HistorySynchronizer {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self {
            store,
            entries: Vec::new(),
            languages: LanguageSet::default(),
        }
    }

    /// Seed the cache from the external store in server-provided order.
    pub async fn load(&mut self) -> Result<()> {
        let mut entries = self.store.load().await?;
        entries.truncate(MAX_CACHED_ENTRIES);
        self.entries = entries;
        Ok(())
    }

    /// Prepend a new entry and persist it asynchronously.
    ///
    /// The local update is optimistic: a persistence failure does not
    /// roll it back.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.insert(0, entry.clone());
        self.entries.truncate(MAX_CACHED_ENTRIES);

        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            match store.save(&entry).await {
                Ok(()) => info!("History entry {} persisted", entry.id),
                Err(e) => warn!("Failed to persist history entry {}: {}", entry.id, e),
            }
        });
    }

    /// Empty the local cache only; remote history is untouched.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Newest-first cached entries
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn set_languages(&mut self, languages: LanguageSet) {
        self.languages = languages;
    }

    /// Display name for a language code; unknown codes come back
    /// unchanged.
    pub fn resolve_display_name(&self, code: &str) -> String {
        self.languages.display_name_for(code)
    }
}
