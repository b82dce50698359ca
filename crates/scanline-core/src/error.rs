//! # Scan and Cart Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Where errors live                                  │
//! │                                                                         │
//! │  scanline-core errors (this file)                                       │
//! │  ├── ScanRejection    - Expected scan outcomes that leave the cart      │
//! │  │                      untouched (miss, out of stock, stock limit)     │
//! │  ├── CoreError        - Operator cart edits that break a rule           │
//! │  └── ValidationError  - Input shape failures (manual entry, config)     │
//! │                                                                         │
//! │  scanline-db errors                                                     │
//! │  └── DbError          - Catalog database failures                       │
//! │                                                                         │
//! │  scanline-runtime errors                                                │
//! │  └── ScanError        - Cache / session / config failures               │
//! │                                                                         │
//! │  Nothing here is fatal: every failure is "no mutation + message".       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Scan Rejection
// =============================================================================

/// A scan that was understood but could not change the cart.
///
/// These are frequent, expected outcomes of casual scanning. They are
/// reported to the operator and never treated as system failures.
///
/// ## User Workflow
/// ```text
/// Scan "5901234123457" (stock: 3, in cart: 3)
///      │
///      ▼
/// candidate quantity 4 > snapshot 3
///      │
///      ▼
/// StockLimit { available: 3 }
///      │
///      ▼
/// Operator sees: "only 3 units available"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanRejection {
    /// No catalog entry carries this barcode (or the cache is scoped to
    /// another store).
    #[error("product not found for barcode {barcode}")]
    NotFound { barcode: String },

    /// The product exists but the last refresh reported no stock.
    #[error("{name} is out of stock")]
    OutOfStock { product_id: String, name: String },

    /// One more unit would exceed the stock known at the last refresh.
    #[error("only {available} units available")]
    StockLimit {
        product_id: String,
        name: String,
        available: i64,
    },
}

impl ScanRejection {
    /// Short machine-readable code for hosts and logs.
    pub fn code(&self) -> &'static str {
        match self {
            ScanRejection::NotFound { .. } => "not_found",
            ScanRejection::OutOfStock { .. } => "out_of_stock",
            ScanRejection::StockLimit { .. } => "stock_limit",
        }
    }

    /// Returns true for a plain lookup miss.
    pub fn is_lookup_miss(&self) -> bool {
        matches!(self, ScanRejection::NotFound { .. })
    }

    /// Returns true when the rejection comes from stock bounding.
    pub fn is_stock_bound(&self) -> bool {
        matches!(
            self,
            ScanRejection::OutOfStock { .. } | ScanRejection::StockLimit { .. }
        )
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Operator-driven cart edits that violate a business rule.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("product {0} is not in the cart")]
    LineNotInCart(String),

    /// A quantity edit asked for more than the last refresh reported.
    #[error("cannot set {sku} to {requested}: {available} in stock")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Keypad and config input that is malformed.
///
/// A manual entry that fails here never becomes a `ScanEvent`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Empty after trimming.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Quantity, discount, or a numeric config key outside its bounds.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// An unknown enum spelling, e.g. a scanner mode in the config file.
    #[error("{field} must be one of: {}", allowed.join(", "))]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

/// Result of reconciling one scan.
pub type ScanResult<T> = Result<T, ScanRejection>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_messages() {
        let err = ScanRejection::NotFound {
            barcode: "12345678".to_string(),
        };
        assert_eq!(err.to_string(), "product not found for barcode 12345678");

        let err = ScanRejection::StockLimit {
            product_id: "p-1".to_string(),
            name: "Sparkling Water".to_string(),
            available: 3,
        };
        assert_eq!(err.to_string(), "only 3 units available");
    }

    #[test]
    fn test_rejection_categories() {
        let miss = ScanRejection::NotFound {
            barcode: "x".into(),
        };
        assert!(miss.is_lookup_miss());
        assert!(!miss.is_stock_bound());
        assert_eq!(miss.code(), "not_found");

        let empty = ScanRejection::OutOfStock {
            product_id: "p".into(),
            name: "Tea".into(),
        };
        assert!(empty.is_stock_bound());
        assert_eq!(empty.to_string(), "Tea is out of stock");
    }

    #[test]
    fn test_validation_error_messages() {
        let short = ValidationError::TooShort {
            field: "barcode".into(),
            min: 8,
        };
        assert_eq!(short.to_string(), "barcode must be at least 8 characters");

        let stock = CoreError::InsufficientStock {
            sku: "TEA-01".into(),
            available: 2,
            requested: 5,
        };
        assert_eq!(stock.to_string(), "cannot set TEA-01 to 5: 2 in stock");
    }

    #[test]
    fn test_validation_passes_through_core_error() {
        let core: CoreError = ValidationError::NotAllowed {
            field: "mode".into(),
            allowed: vec!["camera".into(), "manual".into()],
        }
        .into();
        assert!(matches!(core, CoreError::Validation(_)));
        assert_eq!(core.to_string(), "mode must be one of: camera, manual");
    }
}
