//! # Catalog Repository
//!
//! Reads a store's full catalog (products with every barcode) and writes
//! products for seeding and back-office imports.
//!
//! ## Full Catalog Read
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 fetch_store_catalog(store_id)                           │
//! │                                                                         │
//! │  Query 1: active products for the store (ordered by name, id)           │
//! │  Query 2: their barcodes (ordered by product, position)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  group barcodes by product_id                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Vec<CatalogEntry> in product order                                     │
//! │                                                                         │
//! │  Ordering is stable so barcode collisions resolve the same way on       │
//! │  every refresh.                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::Utc;
use scanline_core::{CatalogEntry, Money};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    sku: String,
    name: String,
    buying_price_cents: i64,
    selling_price_cents: i64,
    available_stock: i64,
}

#[derive(Debug, FromRow)]
struct BarcodeRow {
    product_id: String,
    barcode: String,
}

/// A product to insert, with its barcodes in claim order.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub store_id: String,
    pub sku: String,
    pub name: String,
    pub buying_price: Money,
    pub selling_price: Money,
    pub available_stock: i64,
    pub barcodes: Vec<String>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog reads and writes.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Loads every active product of a store with all of its barcodes.
    ///
    /// An unknown store yields an empty list, not an error.
    pub async fn fetch_store_catalog(&self, store_id: &str) -> DbResult<Vec<CatalogEntry>> {
        let products: Vec<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, sku, name, buying_price_cents, selling_price_cents, available_stock
            FROM products
            WHERE store_id = ?1 AND is_active = 1
            ORDER BY name, id
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        let barcodes: Vec<BarcodeRow> = sqlx::query_as(
            r#"
            SELECT b.product_id, b.barcode
            FROM product_barcodes b
            INNER JOIN products p ON p.id = b.product_id
            WHERE p.store_id = ?1 AND p.is_active = 1
            ORDER BY b.product_id, b.position, b.barcode
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_product: HashMap<String, Vec<String>> = HashMap::new();
        for row in barcodes {
            by_product.entry(row.product_id).or_default().push(row.barcode);
        }

        let entries: Vec<CatalogEntry> = products
            .into_iter()
            .map(|row| CatalogEntry {
                barcodes: by_product.remove(&row.id).unwrap_or_default(),
                product_id: row.id,
                name: row.name,
                sku: row.sku,
                buying_price: Money::from_cents(row.buying_price_cents),
                selling_price: Money::from_cents(row.selling_price_cents),
                available_stock: row.available_stock,
            })
            .collect();

        debug!(store_id = %store_id, products = entries.len(), "Fetched store catalog");
        Ok(entries)
    }

    /// Inserts a product and its barcodes in one transaction.
    ///
    /// Returns the generated product id.
    pub async fn insert(&self, product: &NewProduct) -> DbResult<String> {
        debug!(store_id = %product.store_id, sku = %product.sku, "Inserting product");

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, store_id, sku, name,
                buying_price_cents, selling_price_cents, available_stock,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)
            "#,
        )
        .bind(&id)
        .bind(&product.store_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.buying_price.cents())
        .bind(product.selling_price.cents())
        .bind(product.available_stock)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for (position, barcode) in product.barcodes.iter().enumerate() {
            sqlx::query(
                "INSERT INTO product_barcodes (product_id, barcode, position) VALUES (?1, ?2, ?3)",
            )
            .bind(&id)
            .bind(barcode)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Adds one more barcode to an existing product.
    pub async fn add_barcode(&self, product_id: &str, barcode: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO product_barcodes (product_id, barcode, position)
            SELECT ?1, ?2, COALESCE(MAX(position) + 1, 0)
            FROM product_barcodes WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .bind(barcode)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Sets the on-hand stock of a product.
    pub async fn set_stock(&self, product_id: &str, stock: i64) -> DbResult<()> {
        debug!(product_id = %product_id, stock, "Setting stock");

        let result = sqlx::query(
            "UPDATE products SET available_stock = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(product_id)
        .bind(stock)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }
        Ok(())
    }

    /// Hides a product from future catalog reads.
    pub async fn deactivate(&self, product_id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(product_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }
        Ok(())
    }

    /// Number of active products in a store.
    pub async fn count(&self, store_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE store_id = ?1 AND is_active = 1",
        )
        .bind(store_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn product(store: &str, sku: &str, stock: i64, barcodes: &[&str]) -> NewProduct {
        NewProduct {
            store_id: store.to_string(),
            sku: sku.to_string(),
            name: format!("Item {}", sku),
            buying_price: Money::from_cents(60),
            selling_price: Money::from_cents(129),
            available_stock: stock,
            barcodes: barcodes.iter().map(|b| b.to_string()).collect(),
        }
    }

    async fn repo() -> CatalogRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().catalog()
    }

    #[tokio::test]
    async fn test_fetch_groups_barcodes_per_product() {
        let repo = repo().await;
        repo.insert(&product("s1", "A", 5, &["4006381333931", "12345670"]))
            .await
            .unwrap();
        repo.insert(&product("s1", "B", 0, &[])).await.unwrap();

        let entries = repo.fetch_store_catalog("s1").await.unwrap();
        assert_eq!(entries.len(), 2);

        let a = entries.iter().find(|e| e.sku == "A").unwrap();
        assert_eq!(a.barcodes, vec!["4006381333931", "12345670"]);
        assert_eq!(a.selling_price.cents(), 129);
        assert_eq!(a.available_stock, 5);

        let b = entries.iter().find(|e| e.sku == "B").unwrap();
        assert!(b.barcodes.is_empty());
    }

    #[tokio::test]
    async fn test_catalog_is_scoped_by_store() {
        let repo = repo().await;
        repo.insert(&product("s1", "A", 5, &["11111111"])).await.unwrap();
        repo.insert(&product("s2", "A", 9, &["11111111"])).await.unwrap();

        let s1 = repo.fetch_store_catalog("s1").await.unwrap();
        assert_eq!(s1.len(), 1);
        assert_eq!(s1[0].available_stock, 5);

        assert!(repo.fetch_store_catalog("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_sku_in_store_is_rejected() {
        let repo = repo().await;
        repo.insert(&product("s1", "A", 5, &[])).await.unwrap();
        let err = repo.insert(&product("s1", "A", 5, &[])).await.unwrap_err();
        assert!(matches!(err, DbError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_stock_update_and_deactivate() {
        let repo = repo().await;
        let id = repo.insert(&product("s1", "A", 5, &["11111111"])).await.unwrap();

        repo.set_stock(&id, 2).await.unwrap();
        assert_eq!(repo.fetch_store_catalog("s1").await.unwrap()[0].available_stock, 2);

        repo.add_barcode(&id, "22222222").await.unwrap();
        assert_eq!(
            repo.fetch_store_catalog("s1").await.unwrap()[0].barcodes,
            vec!["11111111", "22222222"]
        );

        repo.deactivate(&id).await.unwrap();
        assert_eq!(repo.count("s1").await.unwrap(), 0);

        assert!(matches!(
            repo.set_stock("missing", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
