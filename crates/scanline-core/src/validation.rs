//! # Validation Module
//!
//! Input validation shared by the manual entry gate and operator cart edits.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Keypad view                                                   │
//! │  └── Immediate feedback while typing                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Barcode shape (non-empty, minimum length, maximum length)          │
//! │  ├── Quantity range                                                     │
//! │  └── Discount range                                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Reconciler                                                    │
//! │  └── Stock bounding against the cache snapshot                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::Percentage;
use crate::{MAX_BARCODE_LEN, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a keyed-in barcode and returns it trimmed.
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at least `min_len` characters (short codes collide with
///   internal codes too easily)
/// - Must be at most `MAX_BARCODE_LEN` characters
///
/// ```rust
/// use scanline_core::validation::validate_manual_barcode;
///
/// assert_eq!(validate_manual_barcode("  12345678 ", 8).unwrap(), "12345678");
/// assert!(validate_manual_barcode("12", 8).is_err());
/// assert!(validate_manual_barcode("   ", 8).is_err());
/// ```
pub fn validate_manual_barcode(input: &str, min_len: usize) -> ValidationResult<String> {
    let cleaned = input.trim();

    if cleaned.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    let len = cleaned.chars().count();
    if len < min_len {
        return Err(ValidationError::TooShort {
            field: "barcode".to_string(),
            min: min_len,
        });
    }

    if len > MAX_BARCODE_LEN {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: MAX_BARCODE_LEN,
        });
    }

    Ok(cleaned.to_string())
}

/// Validates an operator-entered quantity. Zero is allowed (it removes the
/// line); stock bounding happens later, against the snapshot.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if !(0..=MAX_ITEM_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a line discount: 0% to 100%.
pub fn validate_discount(discount: Percentage) -> ValidationResult<()> {
    if discount > Percentage::full() {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_manual_barcode() {
        assert_eq!(validate_manual_barcode("12345678", 8).unwrap(), "12345678");
        assert_eq!(
            validate_manual_barcode("\tSKU-00042\n", 8).unwrap(),
            "SKU-00042"
        );

        assert!(matches!(
            validate_manual_barcode("", 8),
            Err(ValidationError::Required { .. })
        ));
        assert!(matches!(
            validate_manual_barcode("1234567", 8),
            Err(ValidationError::TooShort { min: 8, .. })
        ));
        assert!(matches!(
            validate_manual_barcode(&"9".repeat(MAX_BARCODE_LEN + 1), 8),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_min_length_is_configurable() {
        assert!(validate_manual_barcode("12345", 4).is_ok());
        assert!(validate_manual_barcode("12345", 6).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(0).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_discount() {
        assert!(validate_discount(Percentage::zero()).is_ok());
        assert!(validate_discount(Percentage::full()).is_ok());
        assert!(validate_discount(Percentage::from_bps(10_001)).is_err());
    }
}
