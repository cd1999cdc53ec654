use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One confirmed translation, immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "sourceLang")]
    pub source_lang: String,
    #[serde(rename = "targetLang")]
    pub target_lang: String,
    pub original: String,
    pub translated: String,
}

impl HistoryEntry {
    pub fn new(source_lang: &str, target_lang: &str, original: &str, translated: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            original: original.to_string(),
            translated: translated.to_string(),
        }
    }
}

/// Durable storage collaborator for history entries.
///
/// Keyed by session identity on the server side; the synchronizer
/// treats it as eventually-consistent best-effort.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Fetch prior entries in server-provided order
    async fn load(&self) -> Result<Vec<HistoryEntry>>;

    /// Persist one entry
    async fn save(&self, entry: &HistoryEntry) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

/// REST implementation against the history persistence collaborator
pub struct RestHistoryStore {
    http: reqwest::Client,
    url: String,
}

impl RestHistoryStore {
    /// `http` must share the session cookie jar so requests carry the
    /// ambient identity.
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            url: format!(
                "{}/api/translation_history",
                base_url.trim_end_matches('/')
            ),
        }
    }
}

#[async_trait::async_trait]
impl HistoryStore for RestHistoryStore {
    async fn load(&self) -> Result<Vec<HistoryEntry>> {
        let response: HistoryResponse = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("History fetch request failed")?
            .error_for_status()
            .context("History fetch rejected")?
            .json()
            .await
            .context("Failed to parse history response")?;

        info!("Loaded {} history entries", response.history.len());
        Ok(response.history)
    }

    async fn save(&self, entry: &HistoryEntry) -> Result<()> {
        self.http
            .post(&self.url)
            .json(entry)
            .send()
            .await
            .context("History save request failed")?
            .error_for_status()
            .context("History save rejected")?;

        Ok(())
    }
}
