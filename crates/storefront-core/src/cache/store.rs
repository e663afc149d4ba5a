use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{describe_error, RequestContext};
use crate::models::Entity;
use crate::utils::format_age;

/// Where a remote collection comes from.
#[async_trait]
pub trait RemoteSource<T>: Send + Sync {
    /// Fetch the whole collection, in server order.
    async fn fetch(&self, ctx: &RequestContext) -> Result<Vec<T>>;
}

/// Fetch status shown alongside the items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum FetchStatus {
    #[default]
    Idle,
    Loading,
    Error(String),
}

/// What a `fetch_all` call ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Items were already present; nothing was requested or changed
    Cached,
    /// A fresh collection of this many items replaced the old one
    Fetched(usize),
    /// The request failed; the message is now in the store status
    Failed(String),
    /// A newer `fetch_all` or a `clear` started first; the response was dropped
    Superseded,
}

/// Point-in-time view of a collection. Cloning shares the item list.
#[derive(Debug, Clone)]
pub struct CollectionSnapshot<T> {
    pub items: Arc<Vec<T>>,
    pub status: FetchStatus,
    /// When the current items arrived; `None` while empty
    pub fetched_at: Option<DateTime<Utc>>,
}

impl<T> CollectionSnapshot<T> {
    fn empty() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            status: FetchStatus::Idle,
            fetched_at: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }

    pub fn error(&self) -> Option<&str> {
        match self.status {
            FetchStatus::Error(ref message) => Some(message),
            _ => None,
        }
    }

    /// "just now", "5m ago" etc. for the last successful fetch
    pub fn age_display(&self) -> Option<String> {
        self.fetched_at
            .map(|at| format_age((Utc::now() - at).num_minutes()))
    }
}

/// Fetch-once cache of a named remote collection.
///
/// The first `fetch_all` on an empty store populates it; later calls are
/// no-ops until `clear` empties it again. There is no automatic refresh or
/// retry. Each fetch and each clear bumps a generation counter so a
/// response that arrives after a newer fetch or a clear is dropped instead
/// of overwriting fresher state.
pub struct CollectionStore<T: Entity> {
    name: String,
    source: Arc<dyn RemoteSource<T>>,
    generation: Mutex<u64>,
    state_tx: watch::Sender<CollectionSnapshot<T>>,
}

impl<T: Entity> CollectionStore<T> {
    pub fn new(name: &str, source: Arc<dyn RemoteSource<T>>) -> Self {
        let (state_tx, _) = watch::channel(CollectionSnapshot::empty());
        Self {
            name: name.to_string(),
            source,
            generation: Mutex::new(0),
            state_tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn snapshot(&self) -> CollectionSnapshot<T> {
        self.state_tx.borrow().clone()
    }

    /// Receiver that wakes on every status or item change
    pub fn subscribe(&self) -> watch::Receiver<CollectionSnapshot<T>> {
        self.state_tx.subscribe()
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.generation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Populate the collection if it is empty.
    pub async fn fetch_all(&self, ctx: &RequestContext) -> FetchOutcome {
        let issued = {
            let mut generation = self.lock_generation();
            let populated = !self.state_tx.borrow().items.is_empty();
            if populated {
                debug!(collection = %self.name, "Collection already populated, skipping fetch");
                return FetchOutcome::Cached;
            }
            *generation += 1;
            self.state_tx.send_modify(|s| s.status = FetchStatus::Loading);
            *generation
        };

        debug!(collection = %self.name, generation = issued, "Fetching collection");
        let result = self.source.fetch(ctx).await;

        let generation = self.lock_generation();
        if *generation != issued {
            debug!(collection = %self.name, issued, current = *generation, "Dropping superseded fetch result");
            return FetchOutcome::Superseded;
        }

        match result {
            Ok(items) => {
                let items = Self::dedupe(&self.name, items);
                let count = items.len();
                self.state_tx.send_replace(CollectionSnapshot {
                    items: Arc::new(items),
                    status: FetchStatus::Idle,
                    fetched_at: Some(Utc::now()),
                });
                info!(collection = %self.name, count, "Collection fetched");
                FetchOutcome::Fetched(count)
            }
            Err(e) => {
                let message = describe_error(&e);
                warn!(collection = %self.name, error = %e, "Collection fetch failed");
                self.state_tx
                    .send_modify(|s| s.status = FetchStatus::Error(message.clone()));
                FetchOutcome::Failed(message)
            }
        }
    }

    /// Empty the collection and reset status, whatever is in flight.
    pub fn clear(&self) {
        let mut generation = self.lock_generation();
        *generation += 1;
        self.state_tx.send_replace(CollectionSnapshot::empty());
        info!(collection = %self.name, "Collection cleared");
    }

    /// Look up one entity in memory. Never touches the network.
    pub fn get_by_id(&self, id: i64) -> Option<T> {
        self.state_tx
            .borrow()
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    /// Keep the first occurrence of each id, preserving server order
    fn dedupe(name: &str, items: Vec<T>) -> Vec<T> {
        let mut seen = HashSet::with_capacity(items.len());
        let total = items.len();
        let unique: Vec<T> = items.into_iter().filter(|item| seen.insert(item.id())).collect();
        if unique.len() != total {
            warn!(collection = %name, dropped = total - unique.len(), "Response contained duplicate ids");
        }
        unique
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: i64,
        label: &'static str,
    }

    impl Entity for Item {
        fn id(&self) -> i64 {
            self.id
        }
    }

    fn item(id: i64, label: &'static str) -> Item {
        Item { id, label }
    }

    /// Serves a fixed response and counts calls
    struct FixedSource {
        response: Result<Vec<Item>, String>,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn ok(items: Vec<Item>) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(items),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Err(message.to_string()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RemoteSource<Item> for FixedSource {
        async fn fetch(&self, _ctx: &RequestContext) -> Result<Vec<Item>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone().map_err(|m| anyhow::anyhow!(m))
        }
    }

    /// Blocks until released, so tests can act while a fetch is in flight
    struct GatedSource {
        release: Notify,
        items: Vec<Item>,
    }

    #[async_trait]
    impl RemoteSource<Item> for GatedSource {
        async fn fetch(&self, _ctx: &RequestContext) -> Result<Vec<Item>> {
            self.release.notified().await;
            Ok(self.items.clone())
        }
    }

    #[tokio::test]
    async fn test_fetch_all_populates_in_order() {
        let source = FixedSource::ok(vec![item(3, "c"), item(1, "a"), item(2, "b")]);
        let store = CollectionStore::new("items", source.clone());

        let outcome = store.fetch_all(&RequestContext::anonymous()).await;

        assert_eq!(outcome, FetchOutcome::Fetched(3));
        let snapshot = store.snapshot();
        assert_eq!(snapshot.status, FetchStatus::Idle);
        let ids: Vec<i64> = snapshot.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert!(snapshot.fetched_at.is_some());
        assert_eq!(snapshot.age_display().as_deref(), Some("just now"));
    }

    #[tokio::test]
    async fn test_fetch_all_on_populated_store_is_noop() {
        let source = FixedSource::ok(vec![item(1, "a")]);
        let store = CollectionStore::new("items", source.clone());
        store.fetch_all(&RequestContext::anonymous()).await;
        let mut rx = store.subscribe();
        let before = store.snapshot();

        let outcome = store.fetch_all(&RequestContext::anonymous()).await;

        assert_eq!(outcome, FetchOutcome::Cached);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(!rx.has_changed().unwrap());
        assert!(Arc::ptr_eq(&before.items, &store.snapshot().items));
    }

    #[tokio::test]
    async fn test_fetch_failure_records_error_and_keeps_items() {
        let store = CollectionStore::new("items", FixedSource::failing("connection refused"));

        let outcome = store.fetch_all(&RequestContext::anonymous()).await;

        assert_eq!(outcome, FetchOutcome::Failed("connection refused".to_string()));
        let snapshot = store.snapshot();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.error(), Some("connection refused"));
        assert_eq!(snapshot.fetched_at, None);
    }

    #[tokio::test]
    async fn test_failed_fetch_can_be_retried() {
        let failing = CollectionStore::new("items", FixedSource::failing("offline"));
        failing.fetch_all(&RequestContext::anonymous()).await;
        // Still empty, so a retry really issues a request
        assert_eq!(
            failing.fetch_all(&RequestContext::anonymous()).await,
            FetchOutcome::Failed("offline".to_string())
        );
    }

    #[tokio::test]
    async fn test_clear_then_get_by_id_is_not_found() {
        let store = CollectionStore::new("items", FixedSource::ok(vec![item(1, "a"), item(2, "b")]));
        store.fetch_all(&RequestContext::anonymous()).await;
        assert_eq!(store.get_by_id(2), Some(item(2, "b")));

        store.clear();

        let snapshot = store.snapshot();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.status, FetchStatus::Idle);
        for id in [1, 2, 3, -1] {
            assert_eq!(store.get_by_id(id), None);
        }
    }

    #[tokio::test]
    async fn test_clear_allows_refetch() {
        let source = FixedSource::ok(vec![item(1, "a")]);
        let store = CollectionStore::new("items", source.clone());
        store.fetch_all(&RequestContext::anonymous()).await;
        store.clear();

        assert_eq!(store.fetch_all(&RequestContext::anonymous()).await, FetchOutcome::Fetched(1));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_get_by_id_before_population() {
        let store = CollectionStore::new("items", FixedSource::ok(vec![item(1, "a")]));
        assert_eq!(store.get_by_id(1), None);
    }

    #[tokio::test]
    async fn test_duplicate_ids_keep_first() {
        let store = CollectionStore::new(
            "items",
            FixedSource::ok(vec![item(1, "first"), item(2, "b"), item(1, "second")]),
        );
        assert_eq!(store.fetch_all(&RequestContext::anonymous()).await, FetchOutcome::Fetched(2));
        assert_eq!(store.get_by_id(1).map(|i| i.label), Some("first"));
    }

    #[tokio::test]
    async fn test_status_is_loading_while_in_flight() {
        let source = Arc::new(GatedSource {
            release: Notify::new(),
            items: vec![item(1, "a")],
        });
        let store = Arc::new(CollectionStore::new("items", source.clone()));
        let mut rx = store.subscribe();

        let task = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.fetch_all(&RequestContext::anonymous()).await }
        });

        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_loading());

        source.release.notify_one();
        assert_eq!(task.await.unwrap(), FetchOutcome::Fetched(1));
        assert_eq!(store.snapshot().status, FetchStatus::Idle);
    }

    #[tokio::test]
    async fn test_clear_during_fetch_discards_result() {
        let source = Arc::new(GatedSource {
            release: Notify::new(),
            items: vec![item(1, "a")],
        });
        let store = Arc::new(CollectionStore::new("items", source.clone()));
        let mut rx = store.subscribe();

        let task = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.fetch_all(&RequestContext::anonymous()).await }
        });
        rx.changed().await.unwrap();

        store.clear();
        source.release.notify_one();

        assert_eq!(task.await.unwrap(), FetchOutcome::Superseded);
        assert!(store.snapshot().is_empty());
        assert_eq!(store.get_by_id(1), None);
    }

    /// Anonymous calls wait for a release; bearer calls answer at once
    struct RacingSource {
        release: Notify,
    }

    #[async_trait]
    impl RemoteSource<Item> for RacingSource {
        async fn fetch(&self, ctx: &RequestContext) -> Result<Vec<Item>> {
            if ctx.is_authenticated() {
                Ok(vec![item(2, "fresh"), item(3, "fresh")])
            } else {
                self.release.notified().await;
                Ok(vec![item(1, "stale")])
            }
        }
    }

    #[tokio::test]
    async fn test_newer_fetch_wins_over_slow_older_one() {
        let source = Arc::new(RacingSource {
            release: Notify::new(),
        });
        let store = Arc::new(CollectionStore::new("items", source.clone()));
        let mut rx = store.subscribe();

        let slow = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.fetch_all(&RequestContext::anonymous()).await }
        });
        rx.changed().await.unwrap();
        assert!(store.snapshot().is_loading());

        let fast = store
            .fetch_all(&RequestContext::with_bearer("tok"))
            .await;
        assert_eq!(fast, FetchOutcome::Fetched(2));

        source.release.notify_one();
        assert_eq!(slow.await.unwrap(), FetchOutcome::Superseded);

        let snapshot = store.snapshot();
        let ids: Vec<i64> = snapshot.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(snapshot.status, FetchStatus::Idle);
        assert_eq!(store.get_by_id(1), None);
    }
}
