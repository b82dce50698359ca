//! # Catalog Sources
//!
//! Where the inventory cache gets a store's full catalog from.
//!
//! ```text
//! InventoryCache ──fetch_catalog(store_id)──► dyn CatalogFetcher
//!                                                 │
//!                                                 ├── SqliteCatalog (scanline-db)
//!                                                 └── anything else: remote API,
//!                                                     fixture table in tests
//! ```

use async_trait::async_trait;
use scanline_core::CatalogEntry;
use scanline_db::Database;
use tracing::debug;

use crate::error::FetchError;

/// Fetches the complete catalog of one store.
///
/// Implementations return every product with all of its barcodes. Partial
/// listings are not supported; the cache replaces its index wholesale.
#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    async fn fetch_catalog(&self, store_id: &str) -> Result<Vec<CatalogEntry>, FetchError>;
}

/// Catalog source backed by the local SQLite catalog.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    db: Database,
}

impl SqliteCatalog {
    pub fn new(db: Database) -> Self {
        SqliteCatalog { db }
    }
}

#[async_trait]
impl CatalogFetcher for SqliteCatalog {
    async fn fetch_catalog(&self, store_id: &str) -> Result<Vec<CatalogEntry>, FetchError> {
        debug!(store_id = %store_id, "Reading catalog from SQLite");
        let entries = self.db.catalog().fetch_store_catalog(store_id).await?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanline_core::Money;
    use scanline_db::{DbConfig, NewProduct};

    #[tokio::test]
    async fn test_sqlite_catalog_fetch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.catalog()
            .insert(&NewProduct {
                store_id: "s1".into(),
                sku: "WAT-001".into(),
                name: "Sparkling Water".into(),
                buying_price: Money::from_cents(40),
                selling_price: Money::from_cents(129),
                available_stock: 12,
                barcodes: vec!["4006381333931".into()],
            })
            .await
            .unwrap();

        let source = SqliteCatalog::new(db);
        let entries = source.fetch_catalog("s1").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].barcodes, vec!["4006381333931"]);
    }

    #[tokio::test]
    async fn test_closed_pool_reports_unavailable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;

        let err = SqliteCatalog::new(db).fetch_catalog("s1").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
