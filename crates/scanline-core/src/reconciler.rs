//! # Cart Reconciler
//!
//! Turns a resolved barcode into a bounded cart mutation.
//!
//! ## Reconcile Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      reconcile(barcode)                                 │
//! │                                                                         │
//! │  lookup.find_by_barcode(barcode)                                        │
//! │       │                                                                 │
//! │       ├── None ─────────────────────────────► NotFound     (no change)  │
//! │       │                                                                 │
//! │       ▼ Some(entry)                                                     │
//! │  cart.line(entry.product_id)                                            │
//! │       │                                                                 │
//! │       ├── None ──┬── snapshot <= 0 ─────────► OutOfStock   (no change)  │
//! │       │          └── add_to_cart(qty 1) ────► Acknowledgment            │
//! │       │                                                                 │
//! │       └── Some(line)                                                    │
//! │                  ├── qty + 1 > snapshot ────► StockLimit   (no change)  │
//! │                  └── update_cart_item ──────► Acknowledgment            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The reconciler takes only a barcode. Whether it came from the camera or
//! the keypad is invisible here, so both paths get identical outcomes.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::{CartHost, CartLine, CartLinePatch};
use crate::catalog::ProductLookup;
use crate::error::{CoreError, CoreResult, ScanRejection, ScanResult};
use crate::money::Money;
use crate::types::Percentage;
use crate::validation::{validate_discount, validate_quantity};

/// Confirmation for an accepted scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgment {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    /// Line quantity after the scan.
    pub quantity: i64,
}

impl Acknowledgment {
    fn for_line(line: &CartLine, quantity: i64) -> Self {
        Acknowledgment {
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity,
        }
    }
}

/// Stateless cart reconciler.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler;

impl Reconciler {
    pub fn new() -> Self {
        Reconciler
    }

    /// Resolves `barcode` and merges one unit of the product into the cart.
    pub fn reconcile<L, C>(&self, barcode: &str, lookup: &L, cart: &mut C) -> ScanResult<Acknowledgment>
    where
        L: ProductLookup + ?Sized,
        C: CartHost + ?Sized,
    {
        let barcode = barcode.trim();
        let entry = lookup
            .find_by_barcode(barcode)
            .ok_or_else(|| ScanRejection::NotFound {
                barcode: barcode.to_string(),
            })?;

        let Some(line) = cart.line(&entry.product_id).cloned() else {
            let line = CartLine::from_entry(entry);
            if line.available_stock_snapshot <= 0 {
                return Err(ScanRejection::OutOfStock {
                    product_id: line.product_id,
                    name: line.name,
                });
            }
            let ack = Acknowledgment::for_line(&line, line.quantity);
            cart.add_to_cart(line);
            return Ok(ack);
        };

        if !line.can_add_one() {
            return Err(ScanRejection::StockLimit {
                available: line.available_stock_snapshot.max(0),
                product_id: line.product_id,
                name: line.name,
            });
        }

        let candidate = line.quantity + 1;
        let ack = Acknowledgment::for_line(&line, candidate);
        let patch = line.quantity_patch(candidate);
        if !cart.update_cart_item(&ack.product_id, patch) {
            // The host lost the line between read and write; treat as a miss
            return Err(ScanRejection::NotFound {
                barcode: barcode.to_string(),
            });
        }
        Ok(ack)
    }

    /// Operator quantity edit. `0` removes the line.
    ///
    /// Quantities above the stock snapshot are rejected unless they lower an
    /// over-allocated line. Returns the updated line, or `None` if removed.
    pub fn set_quantity<C>(&self, product_id: &str, quantity: i64, cart: &mut C) -> CoreResult<Option<CartLine>>
    where
        C: CartHost + ?Sized,
    {
        validate_quantity(quantity)?;

        let line = cart
            .line(product_id)
            .cloned()
            .ok_or_else(|| CoreError::LineNotInCart(product_id.to_string()))?;

        if quantity == 0 {
            cart.remove_from_cart(product_id);
            return Ok(None);
        }

        let snapshot = line.available_stock_snapshot;
        if quantity > snapshot && quantity >= line.quantity {
            return Err(CoreError::InsufficientStock {
                sku: line.sku,
                available: snapshot.max(0),
                requested: quantity,
            });
        }

        let patch = line.quantity_patch(quantity).merge(CartLinePatch {
            over_allocated: Some(quantity > snapshot),
            ..Default::default()
        });
        cart.update_cart_item(product_id, patch);
        Ok(cart.line(product_id).cloned())
    }

    /// Operator discount edit (0% to 100%).
    pub fn set_discount<C>(&self, product_id: &str, discount: Percentage, cart: &mut C) -> CoreResult<CartLine>
    where
        C: CartHost + ?Sized,
    {
        validate_discount(discount)?;

        let patch = cart
            .line(product_id)
            .map(|line| line.discount_patch(discount))
            .ok_or_else(|| CoreError::LineNotInCart(product_id.to_string()))?;

        cart.update_cart_item(product_id, patch);
        cart.line(product_id)
            .cloned()
            .ok_or_else(|| CoreError::LineNotInCart(product_id.to_string()))
    }

    /// Re-applies stock from a freshly built index to every cart line.
    ///
    /// Snapshots move to the new stock. A line whose quantity now exceeds it
    /// is flagged `over_allocated` and keeps its quantity. A product missing
    /// from the new index counts as zero stock. Returns the flagged lines.
    pub fn apply_refreshed_stock<L, C>(&self, lookup: &L, cart: &mut C) -> Vec<CartLine>
    where
        L: ProductLookup + ?Sized,
        C: CartHost + ?Sized,
    {
        let updates: Vec<(String, CartLinePatch)> = cart
            .lines()
            .iter()
            .map(|line| {
                let stock = lookup
                    .find_by_product_id(&line.product_id)
                    .map(|entry| entry.available_stock)
                    .unwrap_or(0);
                let patch = CartLinePatch {
                    available_stock_snapshot: Some(stock),
                    over_allocated: Some(line.quantity > stock),
                    ..Default::default()
                };
                (line.product_id.clone(), patch)
            })
            .collect();

        for (product_id, patch) in updates {
            cart.update_cart_item(&product_id, patch);
        }

        cart.lines()
            .iter()
            .filter(|line| line.over_allocated)
            .cloned()
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
