//! Aggregation across both backends.
//!
//! A [`MediaManager`] owns one adapter per configured backend and fans each
//! operation out to them one after the other. Adapters never fail (see
//! [`Backend`]), so a dead backend only ever shows up as an empty entry.
//!
//! The manager is a scoped resource: both adapter connections live exactly
//! as long as the manager value and are released together when it is
//! dropped, whichever way the owning scope exits.

use anyhow::Result;
use std::collections::BTreeMap;

use crate::booklore::BookloreAdapter;
use crate::config::Config;
use crate::emby::EmbyAdapter;
use crate::models::{BackendRecord, Book, CollectionStats, Source, VideoItem};
use crate::traits::Backend;

pub type VideoBackend = Box<dyn Backend<Record = VideoItem>>;
pub type BookBackend = Box<dyn Backend<Record = Book>>;

/// Default per-source result cap for [`MediaManager::search_all`].
pub const SEARCH_LIMIT: usize = 20;
/// Per-library fetch size used when computing statistics.
pub const STATS_FETCH_LIMIT: usize = 1000;

pub struct MediaManager {
    emby: Option<VideoBackend>,
    booklore: Option<BookBackend>,
}

impl MediaManager {
    /// Build adapters for every backend present in `config`.
    pub fn connect(config: &Config) -> Result<Self> {
        let emby = match &config.emby {
            Some(c) => Some(Box::new(EmbyAdapter::new(c)?) as VideoBackend),
            None => None,
        };
        let booklore = match &config.booklore {
            Some(c) => Some(Box::new(BookloreAdapter::new(c)?) as BookBackend),
            None => None,
        };
        tracing::debug!(
            emby = emby.is_some(),
            booklore = booklore.is_some(),
            "Opened backend connections"
        );
        Ok(Self::new(emby, booklore))
    }

    /// Assemble a manager from already-built adapters.
    pub fn new(emby: Option<VideoBackend>, booklore: Option<BookBackend>) -> Self {
        Self { emby, booklore }
    }

    pub fn is_configured(&self, source: Source) -> bool {
        match source {
            Source::Emby => self.emby.is_some(),
            Source::Booklore => self.booklore.is_some(),
        }
    }

    /// Search the requested sources. Every requested source gets an entry,
    /// empty when the source failed or is not configured.
    pub async fn search_all(
        &self,
        query: &str,
        sources: &[Source],
    ) -> BTreeMap<Source, Vec<BackendRecord>> {
        let mut results = BTreeMap::new();

        for source in sources {
            if results.contains_key(source) {
                continue;
            }
            let records: Vec<BackendRecord> = match source {
                Source::Emby => match &self.emby {
                    Some(emby) => emby
                        .search(query, SEARCH_LIMIT)
                        .await
                        .into_iter()
                        .map(BackendRecord::Video)
                        .collect(),
                    None => {
                        tracing::warn!("Emby is not configured; skipping search");
                        Vec::new()
                    }
                },
                Source::Booklore => match &self.booklore {
                    Some(booklore) => booklore
                        .search(query, SEARCH_LIMIT)
                        .await
                        .into_iter()
                        .map(BackendRecord::Book)
                        .collect(),
                    None => {
                        tracing::warn!("Booklore is not configured; skipping search");
                        Vec::new()
                    }
                },
            };
            tracing::info!("Found {} results in {}", records.len(), source);
            results.insert(*source, records);
        }

        results
    }

    /// Grouping names per configured source: Emby libraries and Booklore
    /// collections.
    pub async fn list_groupings(&self) -> BTreeMap<Source, Vec<String>> {
        let mut out = BTreeMap::new();
        if let Some(emby) = &self.emby {
            let names = emby.list_groupings().await.into_iter().map(|g| g.name).collect();
            out.insert(emby.source(), names);
        }
        if let Some(booklore) = &self.booklore {
            let names = booklore
                .list_groupings()
                .await
                .into_iter()
                .map(|g| g.name)
                .collect();
            out.insert(booklore.source(), names);
        }
        out
    }

    /// Emby items, from one named library or from every library.
    ///
    /// An unknown library name logs a warning and returns nothing without
    /// fetching any items.
    pub async fn list_items(&self, library: Option<&str>, limit: usize) -> Vec<VideoItem> {
        let Some(emby) = &self.emby else {
            return Vec::new();
        };

        let libraries = emby.list_groupings().await;

        match library {
            Some(name) => match libraries.iter().find(|l| l.name == name) {
                Some(lib) => emby.fetch_items(Some(lib.id.as_str()), limit, 0).await,
                None => {
                    tracing::warn!("Library '{}' not found", name);
                    Vec::new()
                }
            },
            None => {
                let mut all = Vec::new();
                for lib in &libraries {
                    all.extend(emby.fetch_items(Some(lib.id.as_str()), limit, 0).await);
                }
                all
            }
        }
    }

    pub async fn list_books(&self, limit: usize) -> Vec<Book> {
        match &self.booklore {
            Some(booklore) => booklore.fetch_items(None, limit, 0).await,
            None => Vec::new(),
        }
    }

    pub async fn collection_stats(&self) -> CollectionStats {
        let mut stats = CollectionStats::default();

        if let Some(emby) = &self.emby {
            let libraries = emby.list_groupings().await;
            for lib in &libraries {
                stats.emby.total_items +=
                    emby.fetch_items(Some(lib.id.as_str()), STATS_FETCH_LIMIT, 0).await.len();
            }
            stats.emby.libraries = libraries.into_iter().map(|l| l.name).collect();
        }

        if let Some(booklore) = &self.booklore {
            stats.booklore.total_books = booklore.fetch_items(None, STATS_FETCH_LIMIT, 0).await.len();
            stats.booklore.collections = booklore
                .list_groupings()
                .await
                .into_iter()
                .map(|c| c.name)
                .collect();
        }

        stats
    }

    /// Reachability of every configured backend.
    pub async fn health_all(&self) -> BTreeMap<Source, bool> {
        let mut health = BTreeMap::new();
        if let Some(emby) = &self.emby {
            health.insert(emby.source(), emby.health().await);
        }
        if let Some(booklore) = &self.booklore {
            health.insert(booklore.source(), booklore.health().await);
        }
        health
    }
}

impl Drop for MediaManager {
    fn drop(&mut self) {
        // Both boxes are dropped right after this, in field order.
        tracing::debug!("Releasing backend connections");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Grouping;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// In-memory Emby stand-in recording fetches and its own release.
    struct FakeEmby {
        libraries: Vec<Grouping>,
        items: Vec<(String, VideoItem)>,
        healthy: bool,
        fetches: Arc<AtomicUsize>,
        released: Arc<AtomicBool>,
    }

    impl Drop for FakeEmby {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Backend for FakeEmby {
        type Record = VideoItem;

        fn source(&self) -> Source {
            Source::Emby
        }

        async fn fetch_items(
            &self,
            grouping: Option<&str>,
            limit: usize,
            _offset: usize,
        ) -> Vec<VideoItem> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.items
                .iter()
                .filter(|(lib, _)| grouping.map_or(true, |g| g == lib.as_str()))
                .map(|(_, item)| item.clone())
                .take(limit)
                .collect()
        }

        async fn fetch_item(&self, id: &str) -> Option<VideoItem> {
            self.items.iter().map(|(_, i)| i).find(|i| i.id == id).cloned()
        }

        async fn search(&self, query: &str, _limit: usize) -> Vec<VideoItem> {
            self.items
                .iter()
                .map(|(_, i)| i)
                .filter(|i| i.name.contains(query))
                .cloned()
                .collect()
        }

        async fn list_groupings(&self) -> Vec<Grouping> {
            self.libraries.clone()
        }

        async fn health(&self) -> bool {
            self.healthy
        }
    }

    /// A Booklore stand-in that behaves like an unreachable server.
    struct DeadBooklore {
        released: Arc<AtomicBool>,
    }

    impl Drop for DeadBooklore {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Backend for DeadBooklore {
        type Record = Book;

        fn source(&self) -> Source {
            Source::Booklore
        }
        async fn fetch_items(&self, _: Option<&str>, _: usize, _: usize) -> Vec<Book> {
            Vec::new()
        }
        async fn fetch_item(&self, _: &str) -> Option<Book> {
            None
        }
        async fn search(&self, _: &str, _: usize) -> Vec<Book> {
            Vec::new()
        }
        async fn list_groupings(&self) -> Vec<Grouping> {
            Vec::new()
        }
        async fn health(&self) -> bool {
            false
        }
    }

    fn video(id: &str, name: &str) -> VideoItem {
        serde_json::from_value(serde_json::json!({"Id": id, "Name": name, "Type": "Movie"}))
            .unwrap()
    }

    fn library(id: &str, name: &str) -> Grouping {
        Grouping {
            id: id.to_string(),
            name: name.to_string(),
            item_count: None,
            kind: None,
            description: None,
        }
    }

    struct Harness {
        manager: MediaManager,
        fetches: Arc<AtomicUsize>,
        emby_released: Arc<AtomicBool>,
        booklore_released: Arc<AtomicBool>,
    }

    fn harness() -> Harness {
        let fetches = Arc::new(AtomicUsize::new(0));
        let emby_released = Arc::new(AtomicBool::new(false));
        let booklore_released = Arc::new(AtomicBool::new(false));
        let emby = FakeEmby {
            libraries: vec![library("m", "Movies"), library("s", "Shows")],
            items: vec![
                ("m".to_string(), video("1", "Alien")),
                ("m".to_string(), video("2", "Aliens")),
                ("s".to_string(), video("3", "Dark")),
            ],
            healthy: true,
            fetches: fetches.clone(),
            released: emby_released.clone(),
        };
        let booklore = DeadBooklore {
            released: booklore_released.clone(),
        };
        Harness {
            manager: MediaManager::new(Some(Box::new(emby)), Some(Box::new(booklore))),
            fetches,
            emby_released,
            booklore_released,
        }
    }

    #[tokio::test]
    async fn search_all_has_entry_per_requested_source() {
        let h = harness();
        let results = h.manager.search_all("Alien", &Source::all()).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[&Source::Emby].len(), 2);
        assert!(results[&Source::Booklore].is_empty());
    }

    #[tokio::test]
    async fn search_all_respects_source_selection() {
        let h = harness();
        let results = h.manager.search_all("Alien", &[Source::Booklore]).await;
        assert_eq!(results.keys().copied().collect::<Vec<_>>(), vec![Source::Booklore]);
    }

    #[tokio::test]
    async fn unconfigured_source_gets_empty_entry() {
        let manager = MediaManager::new(None, None);
        let results = manager.search_all("x", &Source::all()).await;
        assert!(results.values().all(|v| v.is_empty()));
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn list_items_unknown_library_fetches_nothing() {
        let h = harness();
        let items = h.manager.list_items(Some("Nonexistent"), 50).await;
        assert!(items.is_empty());
        assert_eq!(h.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn list_items_by_name_and_across_libraries() {
        let h = harness();
        let movies = h.manager.list_items(Some("Movies"), 50).await;
        assert_eq!(movies.len(), 2);

        let all = h.manager.list_items(None, 50).await;
        let ids: Vec<_> = all.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn stats_and_health_isolate_failures() {
        let h = harness();
        let stats = h.manager.collection_stats().await;
        assert_eq!(stats.emby.libraries, vec!["Movies", "Shows"]);
        assert_eq!(stats.emby.total_items, 3);
        assert_eq!(stats.booklore.total_books, 0);

        let health = h.manager.health_all().await;
        assert!(health[&Source::Emby]);
        assert!(!health[&Source::Booklore]);
    }

    #[tokio::test]
    async fn both_adapters_released_on_error_path() {
        let h = harness();
        let emby_released = h.emby_released.clone();
        let booklore_released = h.booklore_released.clone();

        async fn failing(manager: MediaManager) -> Result<()> {
            let _ = manager.health_all().await;
            anyhow::bail!("boom")
        }

        assert!(failing(h.manager).await.is_err());
        assert!(emby_released.load(Ordering::SeqCst));
        assert!(booklore_released.load(Ordering::SeqCst));
    }
}
