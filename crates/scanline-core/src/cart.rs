//! # Cart
//!
//! The in-progress sale and the only surface through which it may change.
//!
//! ## Mutation Surface
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Mutation Surface                                │
//! │                                                                         │
//! │  Caller                  CartHost method              Effect            │
//! │  ──────                  ───────────────              ──────            │
//! │                                                                         │
//! │  Reconciler (new) ─────► add_to_cart(line) ─────────► lines.push(line)  │
//! │                                                                         │
//! │  Reconciler (repeat) ──► update_cart_item(id, patch) ► patch applied    │
//! │                                                       (qty 0 removes)   │
//! │                                                                         │
//! │  Operator ─────────────► remove_from_cart(id) ──────► line removed      │
//! │                                                                         │
//! │  NOTE: lines are unique by product_id.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;
use crate::types::{CatalogEntry, Percentage};

// =============================================================================
// Cart Line
// =============================================================================

/// One row of the in-progress sale.
///
/// ## Snapshot Pattern
/// `name`, `sku`, `unit_price` and `available_stock_snapshot` are frozen from
/// the catalog entry when the line is created. The snapshot is only moved by
/// an explicit stock re-application after a cache refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub sku: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub discount_percentage: Percentage,
    pub discount_amount: Money,
    pub subtotal: Money,
    pub total: Money,
    /// Stock known at the cache's last refresh for this product.
    pub available_stock_snapshot: i64,
    /// Set when a later refresh reported less stock than `quantity`.
    #[serde(default)]
    pub over_allocated: bool,
}

impl CartLine {
    /// A fresh single-unit line priced at the entry's selling price.
    pub fn from_entry(entry: &CatalogEntry) -> Self {
        let unit_price = entry.selling_price;
        CartLine {
            product_id: entry.product_id.clone(),
            name: entry.name.clone(),
            sku: entry.sku.clone(),
            unit_price,
            quantity: 1,
            discount_percentage: Percentage::zero(),
            discount_amount: Money::zero(),
            subtotal: unit_price,
            total: unit_price,
            available_stock_snapshot: entry.available_stock,
            over_allocated: false,
        }
    }

    /// Amounts for this line at `quantity` and `discount`:
    /// `(subtotal, discount_amount, total)`.
    pub fn amounts_for(&self, quantity: i64, discount: Percentage) -> (Money, Money, Money) {
        let subtotal = self.unit_price.multiply_quantity(quantity);
        let discount_amount = subtotal.percentage_of(discount);
        (subtotal, discount_amount, subtotal - discount_amount)
    }

    /// Patch that sets the quantity and recomputes every amount.
    pub fn quantity_patch(&self, quantity: i64) -> CartLinePatch {
        let (subtotal, discount_amount, total) =
            self.amounts_for(quantity, self.discount_percentage);
        CartLinePatch {
            quantity: Some(quantity),
            subtotal: Some(subtotal),
            discount_amount: Some(discount_amount),
            total: Some(total),
            ..Default::default()
        }
    }

    /// Patch that sets the discount and recomputes every amount.
    pub fn discount_patch(&self, discount: Percentage) -> CartLinePatch {
        let (subtotal, discount_amount, total) = self.amounts_for(self.quantity, discount);
        CartLinePatch {
            discount_percentage: Some(discount),
            subtotal: Some(subtotal),
            discount_amount: Some(discount_amount),
            total: Some(total),
            ..Default::default()
        }
    }

    /// Whether one more unit fits under the stock snapshot.
    pub fn can_add_one(&self) -> bool {
        self.quantity + 1 <= self.available_stock_snapshot
    }
}

// =============================================================================
// Cart Line Patch
// =============================================================================

/// Partial update for a cart line. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLinePatch {
    pub quantity: Option<i64>,
    pub discount_percentage: Option<Percentage>,
    pub discount_amount: Option<Money>,
    pub subtotal: Option<Money>,
    pub total: Option<Money>,
    pub available_stock_snapshot: Option<i64>,
    pub over_allocated: Option<bool>,
}

impl CartLinePatch {
    /// Applies every present field to `line`.
    pub fn apply(&self, line: &mut CartLine) {
        if let Some(quantity) = self.quantity {
            line.quantity = quantity;
        }
        if let Some(discount) = self.discount_percentage {
            line.discount_percentage = discount;
        }
        if let Some(amount) = self.discount_amount {
            line.discount_amount = amount;
        }
        if let Some(subtotal) = self.subtotal {
            line.subtotal = subtotal;
        }
        if let Some(total) = self.total {
            line.total = total;
        }
        if let Some(snapshot) = self.available_stock_snapshot {
            line.available_stock_snapshot = snapshot;
        }
        if let Some(flag) = self.over_allocated {
            line.over_allocated = flag;
        }
    }

    /// Chains another patch on top of this one.
    pub fn merge(mut self, other: CartLinePatch) -> Self {
        self.quantity = other.quantity.or(self.quantity);
        self.discount_percentage = other.discount_percentage.or(self.discount_percentage);
        self.discount_amount = other.discount_amount.or(self.discount_amount);
        self.subtotal = other.subtotal.or(self.subtotal);
        self.total = other.total.or(self.total);
        self.available_stock_snapshot = other
            .available_stock_snapshot
            .or(self.available_stock_snapshot);
        self.over_allocated = other.over_allocated.or(self.over_allocated);
        self
    }
}

// =============================================================================
// Cart Host
// =============================================================================

/// The cart-mutation surface the reconciler writes through.
///
/// Hosts that keep the cart elsewhere (a view model, a remote draft sale)
/// implement this; [`Cart`] is the in-memory implementation.
pub trait CartHost {
    /// All lines in display order.
    fn lines(&self) -> &[CartLine];

    /// The line for a product, if present.
    fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.lines().iter().find(|l| l.product_id == product_id)
    }

    /// Adds a new line.
    fn add_to_cart(&mut self, line: CartLine);

    /// Applies a partial update. Returns false when the product has no line.
    fn update_cart_item(&mut self, product_id: &str, patch: CartLinePatch) -> bool;

    /// Removes a line. Returns false when the product has no line.
    fn remove_from_cart(&mut self, product_id: &str) -> bool;
}

// =============================================================================
// Cart
// =============================================================================

/// The in-memory cart.
///
/// ## Invariants
/// - Lines are unique by `product_id`
/// - A line whose quantity drops to 0 is removed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Draft sale identifier.
    pub id: String,
    pub lines: Vec<CartLine>,
    /// When the cart was created/last cleared.
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            id: Uuid::new_v4().to_string(),
            lines: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Clears all lines and starts a new draft.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.id = Uuid::new_v4().to_string();
        self.created_at = Utc::now();
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(|l| l.subtotal).sum()
    }

    pub fn discount(&self) -> Money {
        self.lines.iter().map(|l| l.discount_amount).sum()
    }

    pub fn total(&self) -> Money {
        self.lines.iter().map(|l| l.total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines currently flagged as over-allocated.
    pub fn over_allocated(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter().filter(|l| l.over_allocated)
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl CartHost for Cart {
    fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    fn add_to_cart(&mut self, line: CartLine) {
        match self.lines.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) => *existing = line,
            None => self.lines.push(line),
        }
    }

    fn update_cart_item(&mut self, product_id: &str, patch: CartLinePatch) -> bool {
        let Some(pos) = self.lines.iter().position(|l| l.product_id == product_id) else {
            return false;
        };

        patch.apply(&mut self.lines[pos]);
        if self.lines[pos].quantity <= 0 {
            self.lines.remove(pos);
        }
        true
    }

    fn remove_from_cart(&mut self, product_id: &str) -> bool {
        let initial_len = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != initial_len
    }
}

/// Cart totals summary for host responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub line_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            line_count: cart.line_count(),
            total_quantity: cart.total_quantity(),
            subtotal: cart.subtotal(),
            discount: cart.discount(),
            total: cart.total(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
