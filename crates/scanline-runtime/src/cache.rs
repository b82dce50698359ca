//! # Inventory Cache
//!
//! Client-resident barcode index for the active store, with single-flight
//! refresh.
//!
//! ## Refresh Decision
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     refresh(store_id, force)                            │
//! │                                                                         │
//! │  force == false AND loaded_for_store == store_id                        │
//! │                 AND index non-empty AND not older than max_age          │
//! │       │                                                                 │
//! │       ├── yes ─────────────────────────► current index (no fetch)       │
//! │       │                                                                 │
//! │       ▼ no                                                              │
//! │  in-flight slot for store_id?                                           │
//! │       │                                                                 │
//! │       ├── yes ─────────────────────────► attach, share its result       │
//! │       │                                                                 │
//! │       ▼ no                                                              │
//! │  start fetch, park it in the slot ─────► fetch ─► build ─► install      │
//! │                                                   (only if store_id     │
//! │                                                    is still active)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Semantics
//! A failed refresh leaves the previous index in place and records the error
//! in [`CacheStatus::error`]. Lookups keep answering from the old index. The
//! next successful refresh clears the error.
//!
//! ## Scope
//! Lookups are only trusted while the loaded index belongs to the active
//! store. After a store switch every lookup misses until the new store's
//! catalog has been loaded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use scanline_core::{BarcodeIndex, BuildReport, CatalogEntry, ProductLookup};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::catalog::CatalogFetcher;
use crate::error::{CacheError, CacheResult};

type RefreshFuture = Shared<BoxFuture<'static, CacheResult<Arc<BarcodeIndex>>>>;

// =============================================================================
// Cache Status
// =============================================================================

/// Read-only snapshot of the cache for hosts and logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    /// Store lookups are answered for.
    pub active_store: Option<String>,
    /// Store the current index was built from.
    pub loaded_for_store: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
    /// Indexed barcodes.
    pub entry_count: usize,
    pub product_count: usize,
    /// A refresh for the active store is in flight.
    pub is_loading: bool,
    /// Last refresh failure, verbatim. Cleared on success.
    pub error: Option<String>,
}

impl CacheStatus {
    /// Whether lookups currently resolve against the active store.
    pub fn is_trusted(&self) -> bool {
        self.active_store.is_some() && self.active_store == self.loaded_for_store
    }
}

#[derive(Debug, Default)]
struct CacheState {
    index: Option<Arc<BarcodeIndex>>,
    error: Option<String>,
    loaded_for_store: Option<String>,
    loaded_at: Option<DateTime<Utc>>,
    loaded_instant: Option<Instant>,
    active_store: Option<String>,
}

impl CacheState {
    fn trusted_index(&self) -> Option<Arc<BarcodeIndex>> {
        match (&self.active_store, &self.loaded_for_store) {
            (Some(active), Some(loaded)) if active == loaded => self.index.clone(),
            _ => None,
        }
    }
}

// =============================================================================
// Inventory Cache
// =============================================================================

struct CacheInner {
    fetcher: Arc<dyn CatalogFetcher>,
    max_age: Option<Duration>,
    state: RwLock<CacheState>,
    inflight: Mutex<HashMap<String, RefreshFuture>>,
}

/// Per-store barcode cache. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct InventoryCache {
    inner: Arc<CacheInner>,
}

impl InventoryCache {
    /// Creates an empty cache. `max_age` of `None` means a loaded index never
    /// ages on its own.
    pub fn new(fetcher: Arc<dyn CatalogFetcher>, max_age: Option<Duration>) -> Self {
        InventoryCache {
            inner: Arc::new(CacheInner {
                fetcher,
                max_age,
                state: RwLock::new(CacheState::default()),
                inflight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Loads (or reuses) the catalog index for `store_id`.
    ///
    /// Concurrent calls for the same store share one fetch and observe the
    /// identical result. The first refresh ever made also sets the active
    /// store.
    pub async fn refresh(&self, store_id: &str, force: bool) -> CacheResult<Arc<BarcodeIndex>> {
        {
            let mut state = self.inner.state.write().await;
            if state.active_store.is_none() {
                state.active_store = Some(store_id.to_string());
            }
            if !force {
                if let Some(index) = self.inner.fresh_index(&state, store_id) {
                    debug!(store_id = %store_id, "Catalog served from memory");
                    return Ok(index);
                }
            }
        }

        let flight = {
            let mut inflight = self.inner.inflight.lock().await;
            match inflight.get(store_id) {
                Some(pending) => {
                    debug!(store_id = %store_id, force, "Attaching to in-flight refresh");
                    pending.clone()
                }
                None => {
                    let pending = Arc::clone(&self.inner)
                        .run_refresh(store_id.to_string())
                        .boxed()
                        .shared();
                    inflight.insert(store_id.to_string(), pending.clone());
                    pending
                }
            }
        };

        flight.await
    }

    /// Exact barcode match (after trimming) against the trusted index.
    pub async fn find_by_barcode(&self, barcode: &str) -> Option<CatalogEntry> {
        let index = self.index().await?;
        index.find_by_barcode(barcode).cloned()
    }

    /// Records the store lookups are answered for.
    pub async fn set_active_store(&self, store_id: &str) {
        let mut state = self.inner.state.write().await;
        if state.active_store.as_deref() != Some(store_id) {
            info!(
                store_id = %store_id,
                previous = ?state.active_store,
                "Active store changed"
            );
            state.active_store = Some(store_id.to_string());
        }
    }

    pub async fn active_store(&self) -> Option<String> {
        self.inner.state.read().await.active_store.clone()
    }

    /// The index for the active store, if one is loaded.
    pub async fn index(&self) -> Option<Arc<BarcodeIndex>> {
        self.inner.state.read().await.trusted_index()
    }

    /// Current cache status.
    pub async fn status(&self) -> CacheStatus {
        let mut status = {
            let state = self.inner.state.read().await;
            CacheStatus {
                active_store: state.active_store.clone(),
                loaded_for_store: state.loaded_for_store.clone(),
                loaded_at: state.loaded_at,
                entry_count: state.index.as_ref().map_or(0, |i| i.len()),
                product_count: state.index.as_ref().map_or(0, |i| i.product_count()),
                is_loading: false,
                error: state.error.clone(),
            }
        };

        if let Some(active) = &status.active_store {
            status.is_loading = self.inner.inflight.lock().await.contains_key(active);
        }
        status
    }
}

impl CacheInner {
    fn fresh_index(&self, state: &CacheState, store_id: &str) -> Option<Arc<BarcodeIndex>> {
        if state.loaded_for_store.as_deref() != Some(store_id) {
            return None;
        }
        let index = state.index.as_ref()?;
        if index.is_empty() {
            return None;
        }
        if let (Some(max_age), Some(loaded)) = (self.max_age, state.loaded_instant) {
            if loaded.elapsed() >= max_age {
                debug!(store_id = %store_id, "Catalog index is stale");
                return None;
            }
        }
        Some(Arc::clone(index))
    }

    async fn run_refresh(self: Arc<Self>, store_id: String) -> CacheResult<Arc<BarcodeIndex>> {
        info!(store_id = %store_id, "Refreshing catalog");

        let outcome = match self.fetcher.fetch_catalog(&store_id).await {
            Ok(entries) => {
                let (index, report) = BarcodeIndex::build(store_id.clone(), entries, Utc::now());
                log_build_report(&store_id, &report);
                let index = Arc::new(index);
                self.install(&store_id, Arc::clone(&index)).await;
                Ok(index)
            }
            Err(source) => {
                let err = CacheError::Fetch {
                    store_id: store_id.clone(),
                    source,
                };
                warn!(store_id = %store_id, error = %err, "Catalog refresh failed, keeping previous index");
                self.record_error(&store_id, &err).await;
                Err(err)
            }
        };

        self.inflight.lock().await.remove(&store_id);
        outcome
    }

    async fn install(&self, store_id: &str, index: Arc<BarcodeIndex>) {
        let mut state = self.state.write().await;
        if state.active_store.as_deref() != Some(store_id) {
            debug!(
                store_id = %store_id,
                active = ?state.active_store,
                "Store is no longer active, index not installed"
            );
            return;
        }

        info!(
            store_id = %store_id,
            barcodes = index.len(),
            products = index.product_count(),
            "Catalog index installed"
        );
        state.loaded_at = Some(index.built_at());
        state.index = Some(index);
        state.loaded_for_store = Some(store_id.to_string());
        state.loaded_instant = Some(Instant::now());
        state.error = None;
    }

    async fn record_error(&self, store_id: &str, err: &CacheError) {
        let mut state = self.state.write().await;
        if state.active_store.as_deref() == Some(store_id) {
            state.error = Some(err.to_string());
        }
    }
}

fn log_build_report(store_id: &str, report: &BuildReport) {
    for collision in &report.collisions {
        warn!(
            store_id = %store_id,
            barcode = %collision.barcode,
            kept = %collision.kept_product_id,
            dropped = %collision.dropped_product_id,
            "Barcode claimed by more than one product"
        );
    }
    if report.blank_barcodes > 0 {
        debug!(store_id = %store_id, blank = report.blank_barcodes, "Skipped blank barcodes");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use scanline_core::Money;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeFetcher {
        catalogs: std::sync::Mutex<HashMap<String, Vec<CatalogEntry>>>,
        calls: AtomicUsize,
        fail: AtomicBool,
        delay: Duration,
    }

    impl FakeFetcher {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(FakeFetcher {
                catalogs: std::sync::Mutex::new(HashMap::new()),
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                delay,
            })
        }

        fn stock(&self, store: &str, entries: Vec<CatalogEntry>) {
            self.catalogs.lock().unwrap().insert(store.to_string(), entries);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CatalogFetcher for FakeFetcher {
        async fn fetch_catalog(&self, store_id: &str) -> Result<Vec<CatalogEntry>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(FetchError::Unavailable("connection refused".into()));
            }
            Ok(self
                .catalogs
                .lock()
                .unwrap()
                .get(store_id)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn entry(id: &str, barcode: &str, stock: i64) -> CatalogEntry {
        CatalogEntry {
            product_id: id.to_string(),
            name: format!("Product {}", id),
            sku: format!("SKU-{}", id),
            buying_price: Money::from_cents(50),
            selling_price: Money::from_cents(100),
            available_stock: stock,
            barcodes: vec![barcode.to_string()],
        }
    }

    fn cache_with(fetcher: &Arc<FakeFetcher>, max_age: Option<Duration>) -> InventoryCache {
        InventoryCache::new(Arc::clone(fetcher) as Arc<dyn CatalogFetcher>, max_age)
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refresh_shares_one_fetch() {
        let fetcher = FakeFetcher::new(Duration::from_millis(200));
        fetcher.stock("A", vec![entry("p1", "4006381333931", 3)]);
        let cache = cache_with(&fetcher, None);

        let (a, b) = tokio::join!(cache.refresh("A", false), cache.refresh("A", true));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(fetcher.calls(), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!cache.status().await.is_loading);
    }

    #[tokio::test]
    async fn test_non_forced_refresh_is_served_from_memory() {
        let fetcher = FakeFetcher::new(Duration::ZERO);
        fetcher.stock("A", vec![entry("p1", "12345678", 3)]);
        let cache = cache_with(&fetcher, None);

        cache.refresh("A", false).await.unwrap();
        cache.refresh("A", false).await.unwrap();
        assert_eq!(fetcher.calls(), 1);

        cache.refresh("A", true).await.unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_index_is_always_refetched() {
        let fetcher = FakeFetcher::new(Duration::ZERO);
        let cache = cache_with(&fetcher, None);

        cache.refresh("A", false).await.unwrap();
        cache.refresh("A", false).await.unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_index_older_than_max_age_is_refetched() {
        let fetcher = FakeFetcher::new(Duration::ZERO);
        fetcher.stock("A", vec![entry("p1", "12345678", 3)]);
        let cache = cache_with(&fetcher, Some(Duration::from_secs(60)));

        cache.refresh("A", false).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        cache.refresh("A", false).await.unwrap();
        assert_eq!(fetcher.calls(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        cache.refresh("A", false).await.unwrap();
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_index() {
        let fetcher = FakeFetcher::new(Duration::ZERO);
        fetcher.stock("A", vec![entry("p1", "12345678", 3)]);
        let cache = cache_with(&fetcher, None);
        cache.refresh("A", false).await.unwrap();

        fetcher.fail.store(true, Ordering::SeqCst);
        let err = cache.refresh("A", true).await.unwrap_err();
        assert!(err.is_retryable());

        let status = cache.status().await;
        assert_eq!(status.error.as_deref(), Some(err.to_string().as_str()));
        assert_eq!(status.entry_count, 1);
        assert!(cache.find_by_barcode("12345678").await.is_some());

        fetcher.fail.store(false, Ordering::SeqCst);
        cache.refresh("A", true).await.unwrap();
        assert!(cache.status().await.error.is_none());
    }

    #[tokio::test]
    async fn test_store_switch_invalidates_lookups_until_loaded() {
        let fetcher = FakeFetcher::new(Duration::ZERO);
        fetcher.stock("A", vec![entry("a1", "11111111", 3)]);
        fetcher.stock("B", vec![entry("b1", "22222222", 3)]);
        let cache = cache_with(&fetcher, None);

        cache.refresh("A", false).await.unwrap();
        assert!(cache.find_by_barcode(" 11111111 ").await.is_some());

        cache.set_active_store("B").await;
        assert!(cache.find_by_barcode("11111111").await.is_none());
        assert!(!cache.status().await.is_trusted());

        cache.refresh("B", false).await.unwrap();
        assert!(cache.find_by_barcode("11111111").await.is_none());
        assert_eq!(
            cache.find_by_barcode("22222222").await.unwrap().product_id,
            "b1"
        );
    }

    #[tokio::test]
    async fn test_refresh_for_inactive_store_is_not_installed() {
        let fetcher = FakeFetcher::new(Duration::ZERO);
        fetcher.stock("A", vec![entry("a1", "11111111", 3)]);
        fetcher.stock("B", vec![entry("b1", "22222222", 3)]);
        let cache = cache_with(&fetcher, None);
        let installed = cache.refresh("A", false).await.unwrap();

        let other = cache.refresh("B", false).await.unwrap();
        assert_eq!(other.store_id(), "B");

        let status = cache.status().await;
        assert_eq!(status.loaded_for_store.as_deref(), Some("A"));
        assert_eq!(status.loaded_at, Some(installed.built_at()));
        assert!(cache.find_by_barcode("11111111").await.is_some());
    }

    #[tokio::test]
    async fn test_status_before_first_refresh() {
        let fetcher = FakeFetcher::new(Duration::ZERO);
        let cache = cache_with(&fetcher, None);

        let status = cache.status().await;
        assert_eq!(status, CacheStatus::default());
        assert!(cache.index().await.is_none());
    }
}
