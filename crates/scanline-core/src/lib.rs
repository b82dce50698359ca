//! # scanline-core: Pure Scan-to-Cart Logic for Scanline POS
//!
//! Everything that decides what a scan does to a sale, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Scanline POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Host (terminal / UI shell)                   │   │
//! │  │    mode toggle ──► keypad ──► cart view ──► feedback toasts     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 scanline-runtime (async plumbing)               │   │
//! │  │   controller, scan session, inventory cache, cart pipeline      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ scanline-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │ checksum │ │ catalog  │ │  manual  │ │ reconciler/cart  │  │   │
//! │  │   │  EAN-13  │ │  index   │ │   gate   │ │ bounded merge    │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO DEVICE • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                scanline-db (catalog source)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`checksum`] - EAN-13 check digit validation
//! - [`catalog`] - Immutable per-store barcode index
//! - [`manual`] - Manual entry gate (keypad fallback)
//! - [`reconciler`] - Scan → cart merge with stock bounding
//! - [`cart`] - Cart lines and the cart-mutation surface
//! - [`money`] - Integer-cent money
//! - [`types`] - Domain types (CatalogEntry, ScanEvent, ...)
//! - [`validation`] - Input shape rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use scanline_core::{BarcodeIndex, Cart, CatalogEntry, Money, Reconciler};
//!
//! let entry = CatalogEntry {
//!     product_id: "p-1".into(),
//!     name: "Sparkling Water".into(),
//!     sku: "WAT-001".into(),
//!     buying_price: Money::from_cents(40),
//!     selling_price: Money::from_cents(129),
//!     available_stock: 2,
//!     barcodes: vec!["4006381333931".into()],
//! };
//! let (index, _) = BarcodeIndex::build("store-1", vec![entry], Utc::now());
//! let mut cart = Cart::new();
//!
//! let ack = Reconciler::new().reconcile("4006381333931", &index, &mut cart).unwrap();
//! assert_eq!(ack.quantity, 1);
//! assert_eq!(cart.total().cents(), 129);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod catalog;
pub mod checksum;
pub mod error;
pub mod manual;
pub mod money;
pub mod reconciler;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartHost, CartLine, CartLinePatch, CartTotals};
pub use catalog::{BarcodeCollision, BarcodeIndex, BuildReport, ProductLookup};
pub use checksum::{is_valid_ean13, ChecksumWarning};
pub use error::{CoreError, CoreResult, ScanRejection, ScanResult, ValidationError};
pub use manual::{ManualEntryGate, ManualSubmission};
pub use money::Money;
pub use reconciler::{Acknowledgment, Reconciler};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Minimum length of a keyed-in barcode.
///
/// ## Business Reason
/// Short codes collide with internal item numbers and are almost always a
/// typo. EAN-8 is the shortest retail symbology we accept.
pub const DEFAULT_MIN_MANUAL_LENGTH: usize = 8;

/// Longest barcode accepted from the keypad.
pub const MAX_BARCODE_LEN: usize = 64;

/// Maximum quantity of a single item in cart
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Cooldown after an accepted camera decode, in milliseconds.
pub const DEFAULT_COOLDOWN_MS: u64 = 1000;
