//! # Repository Module
//!
//! Database repository implementations for Scanline POS.
//!
//! ```text
//! Inventory cache refresh
//!      │
//!      │  db.catalog().fetch_store_catalog("store-1")
//!      ▼
//! CatalogRepository
//! ├── fetch_store_catalog(&self, store_id)
//! ├── insert(&self, product)
//! ├── add_barcode(&self, product_id, barcode)
//! ├── set_stock(&self, product_id, stock)
//! └── deactivate(&self, product_id)
//!      │
//!      ▼
//! SQLite Database
//! ```

pub mod catalog;
