//! # Barcode Index
//!
//! The in-memory barcode → product map for one store.
//!
//! ## Build Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      BarcodeIndex::build                                │
//! │                                                                         │
//! │  Vec<CatalogEntry> (full store catalog)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  for each entry, for each barcode:                                      │
//! │       ├── trim; blank? ──────────────► skipped                          │
//! │       ├── already claimed? ──────────► collision (first entry keeps it) │
//! │       └── insert barcode → entry                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BarcodeIndex { store_id, built_at, entries }                           │
//! │                                                                         │
//! │  The index is immutable once built. A refresh builds a brand new one    │
//! │  and swaps it in whole; there is no incremental merge.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::types::CatalogEntry;

// =============================================================================
// Product Lookup
// =============================================================================

/// Anything that can resolve a barcode to a catalog entry.
///
/// The reconciler only depends on this, so it can be driven by a live
/// index, a fixed test table, or a cache snapshot alike.
pub trait ProductLookup {
    /// Exact match after trimming whitespace. A miss is `None`, never an error.
    fn find_by_barcode(&self, barcode: &str) -> Option<&CatalogEntry>;

    /// Looks a product up by id (used when re-applying refreshed stock).
    fn find_by_product_id(&self, product_id: &str) -> Option<&CatalogEntry>;
}

// =============================================================================
// Build Report
// =============================================================================

/// Two catalog entries claimed the same barcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeCollision {
    pub barcode: String,
    /// Product that kept the barcode.
    pub kept_product_id: String,
    /// Product whose claim was dropped.
    pub dropped_product_id: String,
}

/// What happened while building an index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub products: usize,
    pub barcodes: usize,
    pub blank_barcodes: usize,
    pub collisions: Vec<BarcodeCollision>,
}

// =============================================================================
// Barcode Index
// =============================================================================

/// Immutable barcode index scoped to one store.
#[derive(Debug, Clone)]
pub struct BarcodeIndex {
    store_id: String,
    built_at: DateTime<Utc>,
    products: HashMap<String, Arc<CatalogEntry>>,
    by_barcode: HashMap<String, Arc<CatalogEntry>>,
}

impl BarcodeIndex {
    /// Builds an index from a full catalog listing.
    pub fn build(
        store_id: impl Into<String>,
        entries: Vec<CatalogEntry>,
        built_at: DateTime<Utc>,
    ) -> (Self, BuildReport) {
        let mut report = BuildReport::default();
        let mut products = HashMap::with_capacity(entries.len());
        let mut by_barcode: HashMap<String, Arc<CatalogEntry>> =
            HashMap::with_capacity(entries.len());

        for entry in entries {
            let entry = Arc::new(entry);
            report.products += 1;

            for raw in &entry.barcodes {
                let barcode = raw.trim();
                if barcode.is_empty() {
                    report.blank_barcodes += 1;
                    continue;
                }

                match by_barcode.get(barcode) {
                    Some(existing) if existing.product_id != entry.product_id => {
                        report.collisions.push(BarcodeCollision {
                            barcode: barcode.to_string(),
                            kept_product_id: existing.product_id.clone(),
                            dropped_product_id: entry.product_id.clone(),
                        });
                    }
                    // Same product listing a barcode twice
                    Some(_) => {}
                    None => {
                        by_barcode.insert(barcode.to_string(), Arc::clone(&entry));
                        report.barcodes += 1;
                    }
                }
            }

            products.insert(entry.product_id.clone(), entry);
        }

        let index = BarcodeIndex {
            store_id: store_id.into(),
            built_at,
            products,
            by_barcode,
        };
        (index, report)
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Number of indexed barcodes.
    pub fn len(&self) -> usize {
        self.by_barcode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_barcode.is_empty()
    }

    /// Number of distinct products.
    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}

impl ProductLookup for BarcodeIndex {
    fn find_by_barcode(&self, barcode: &str) -> Option<&CatalogEntry> {
        self.by_barcode.get(barcode.trim()).map(|e| e.as_ref())
    }

    fn find_by_product_id(&self, product_id: &str) -> Option<&CatalogEntry> {
        self.products.get(product_id).map(|e| e.as_ref())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn entry(id: &str, barcodes: &[&str]) -> CatalogEntry {
        CatalogEntry {
            product_id: id.to_string(),
            name: format!("Product {}", id),
            sku: format!("SKU-{}", id),
            buying_price: Money::from_cents(50),
            selling_price: Money::from_cents(100),
            available_stock: 5,
            barcodes: barcodes.iter().map(|b| b.to_string()).collect(),
        }
    }

    #[test]
    fn test_multiple_barcodes_resolve_to_same_product() {
        let (index, report) = BarcodeIndex::build(
            "store-1",
            vec![entry("a", &["4006381333931", "12345678"])],
            Utc::now(),
        );

        assert_eq!(report.barcodes, 2);
        assert_eq!(index.len(), 2);
        assert_eq!(index.product_count(), 1);
        assert_eq!(index.find_by_barcode("12345678").unwrap().product_id, "a");
        assert_eq!(index.find_by_barcode("4006381333931").unwrap().product_id, "a");
    }

    #[test]
    fn test_lookup_trims_whitespace() {
        let (index, _) = BarcodeIndex::build("s", vec![entry("a", &[" 12345678 "])], Utc::now());
        assert!(index.find_by_barcode("  12345678\n").is_some());
        assert!(index.find_by_barcode("1234567").is_none());
    }

    #[test]
    fn test_collision_keeps_first_claim() {
        let (index, report) = BarcodeIndex::build(
            "s",
            vec![entry("a", &["11111111"]), entry("b", &["11111111", "22222222"])],
            Utc::now(),
        );

        assert_eq!(index.find_by_barcode("11111111").unwrap().product_id, "a");
        assert_eq!(index.find_by_barcode("22222222").unwrap().product_id, "b");
        assert_eq!(report.collisions.len(), 1);
        assert_eq!(report.collisions[0].dropped_product_id, "b");
    }

    #[test]
    fn test_blank_barcodes_are_skipped() {
        let (index, report) = BarcodeIndex::build("s", vec![entry("a", &["", "   "])], Utc::now());
        assert!(index.is_empty());
        assert_eq!(report.blank_barcodes, 2);
        // Product is still known by id
        assert!(index.find_by_product_id("a").is_some());
    }
}
