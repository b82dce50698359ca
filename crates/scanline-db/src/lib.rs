//! # scanline-db
//!
//! SQLite catalog storage. Each terminal keeps a local copy of its stores'
//! products; the inventory cache pulls one store at a time from here.
//!
//! ```text
//!  products ─┬─< product_barcodes          (0..n codes per product)
//!            │
//!  CatalogRepository::fetch_store_catalog(store_id)
//!            │
//!            ▼
//!  Vec<CatalogEntry> ──► scanline-runtime::SqliteCatalog ──► InventoryCache
//! ```
//!
//! - [`pool`]: opening the file (`Database`, `DbConfig`)
//! - [`migrations`]: embedded schema
//! - [`repository`]: catalog reads and the writes used by seeding and tests
//! - [`error`]: `DbError`
//!
//! ```rust,ignore
//! let db = Database::new(DbConfig::new("catalog.db")).await?;
//! let entries = db.catalog().fetch_store_catalog("store-1").await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::catalog::{CatalogRepository, NewProduct};
