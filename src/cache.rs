use crate::types::{MediaDetail, MediaType, ParsedName};
use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};

/// Build the stable cache key for a parsed name.
///
/// Deterministic over `(type, name, year, season)` so repeated resolutions of
/// the same input hit the same entry.
pub fn resolution_key(parsed: &ParsedName) -> String {
    format!(
        "[{}]{}-{}-{}",
        parsed.media_type,
        parsed.title,
        parsed.year.map(|y| y.to_string()).unwrap_or_default(),
        parsed
            .begin_season
            .map(|s| s.to_string())
            .unwrap_or_default(),
    )
}

/// Minimal resolution record stored per key.
///
/// `id == 0` marks a confirmed-not-found lookup, distinct from the key being
/// absent; entries are always replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: i64,
    pub media_type: MediaType,
    /// Four-digit release year
    pub year: Option<String>,
    pub title: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
}

impl CacheEntry {
    /// The terminal negative entry.
    pub fn not_found() -> Self {
        Self {
            id: 0,
            media_type: MediaType::Unknown,
            year: None,
            title: None,
            poster_path: None,
            backdrop_path: None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.id == 0
    }

    pub fn from_detail(detail: &MediaDetail) -> Self {
        Self {
            id: detail.id,
            media_type: detail.media_type,
            year: detail.year().map(str::to_string),
            title: Some(detail.title.clone()),
            poster_path: detail.poster_path.clone(),
            backdrop_path: detail.backdrop_path.clone(),
        }
    }
}

/// Key/value store behind the resolution cache.
///
/// Persistence is the implementor's concern; this crate only dictates the
/// opaque string key and the entry payload. Last-writer-wins semantics are
/// acceptable under concurrent use.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<CacheEntry>;
    async fn set(&self, key: &str, entry: CacheEntry);
}

/// Bundled in-memory store. Capacity-bounded, no expiry: a negative entry
/// stays terminal until overwritten by a cache-disabled re-resolution.
pub struct MemoryCacheStore {
    entries: Cache<String, CacheEntry>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    pub fn with_capacity(max_entries: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_entries).build(),
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).await
    }

    async fn set(&self, key: &str, entry: CacheEntry) {
        self.entries.insert(key.to_string(), entry).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_stable_and_distinct() {
        let movie = ParsedName::new("Poor Things", MediaType::Movie).with_year(Some(2023));
        assert_eq!(resolution_key(&movie), "[movie]Poor Things-2023-");
        assert_eq!(resolution_key(&movie), resolution_key(&movie.clone()));

        let tv = ParsedName::new("Poor Things", MediaType::Tv)
            .with_year(Some(2023))
            .with_season(Some(1));
        assert_eq!(resolution_key(&tv), "[tv]Poor Things-2023-1");
        assert_ne!(resolution_key(&movie), resolution_key(&tv));
    }

    #[test]
    fn test_key_without_year_or_season() {
        let parsed = ParsedName::new("Poor Things", MediaType::Unknown);
        assert_eq!(resolution_key(&parsed), "[unknown]Poor Things--");
    }

    #[test]
    fn test_not_found_entry() {
        let entry = CacheEntry::not_found();
        assert!(entry.is_not_found());
        assert_eq!(entry.id, 0);
    }

    #[test]
    fn test_entry_from_detail() {
        let detail = MediaDetail {
            id: 792307,
            media_type: MediaType::Movie,
            title: "Poor Things".to_string(),
            release_date: Some("2023-12-07".to_string()),
            poster_path: Some("/poster.jpg".to_string()),
            ..Default::default()
        };

        let entry = CacheEntry::from_detail(&detail);
        assert_eq!(entry.id, 792307);
        assert_eq!(entry.year.as_deref(), Some("2023"));
        assert_eq!(entry.title.as_deref(), Some("Poor Things"));
        assert!(!entry.is_not_found());
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryCacheStore::new();
        let key = "[movie]Poor Things-2023-";

        assert!(store.get(key).await.is_none());

        store.set(key, CacheEntry::not_found()).await;
        let entry = store.get(key).await.unwrap();
        assert!(entry.is_not_found());

        // Entries are replaced wholesale, last writer wins
        let detail = MediaDetail {
            id: 1,
            media_type: MediaType::Movie,
            title: "Poor Things".to_string(),
            ..Default::default()
        };
        store.set(key, CacheEntry::from_detail(&detail)).await;
        assert_eq!(store.get(key).await.unwrap().id, 1);
    }
}
