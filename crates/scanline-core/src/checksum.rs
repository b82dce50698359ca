//! # Checksum Validator
//!
//! EAN-13 check digit validation.
//!
//! ## Weighting
//! ```text
//! position:  0  1  2  3  4  5  6  7  8  9  10 11 │ 12
//! weight:    1  3  1  3  1  3  1  3  1  3  1  3  │ check
//!
//! check = (10 − (Σ digit × weight) mod 10) mod 10
//! ```
//!
//! The result only ever produces a warning. Plenty of in-store codes
//! (internal SKUs, Code 128 labels, regional numbering) are not EAN-13 and
//! must still be accepted.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Length of an EAN-13 code.
pub const EAN13_LEN: usize = 13;

/// Computes the EAN-13 check digit for the first twelve digits.
///
/// Returns `None` unless `first_twelve` is exactly twelve ASCII digits.
///
/// ```rust
/// use scanline_core::checksum::ean13_check_digit;
///
/// assert_eq!(ean13_check_digit("400638133393"), Some(1));
/// assert_eq!(ean13_check_digit("40063813339"), None);
/// ```
pub fn ean13_check_digit(first_twelve: &str) -> Option<u8> {
    let bytes = first_twelve.as_bytes();
    if bytes.len() != EAN13_LEN - 1 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let sum: u32 = bytes
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let digit = (b - b'0') as u32;
            if i % 2 == 0 {
                digit
            } else {
                digit * 3
            }
        })
        .sum();

    Some(((10 - sum % 10) % 10) as u8)
}

/// Validates a 13-digit EAN code. Never panics; anything that is not
/// thirteen ASCII digits is simply invalid.
///
/// ```rust
/// use scanline_core::checksum::is_valid_ean13;
///
/// assert!(is_valid_ean13("4006381333931"));
/// assert!(!is_valid_ean13("4006381333932"));
/// assert!(!is_valid_ean13("ABC"));
/// ```
pub fn is_valid_ean13(code: &str) -> bool {
    // All-ASCII is checked first so the split below lands on a char boundary
    if !looks_like_ean13(code) {
        return false;
    }
    let (body, check) = code.split_at(EAN13_LEN - 1);
    match (ean13_check_digit(body), check.as_bytes().first()) {
        (Some(expected), Some(&actual)) => expected == actual - b'0',
        _ => false,
    }
}

/// Returns true when `code` is exactly thirteen ASCII digits, i.e. when the
/// EAN-13 checksum applies at all.
pub fn looks_like_ean13(code: &str) -> bool {
    code.len() == EAN13_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

/// Non-blocking warning attached to a manual entry whose 13 digits fail the
/// EAN-13 check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ChecksumWarning {
    pub barcode: String,
    /// The check digit the first twelve digits call for.
    pub expected_check_digit: u8,
}

impl ChecksumWarning {
    /// Checks `code` and returns a warning when it is numeric-13 with a bad
    /// check digit. Any other shape yields `None`.
    pub fn inspect(code: &str) -> Option<Self> {
        if !looks_like_ean13(code) || is_valid_ean13(code) {
            return None;
        }
        let expected_check_digit = ean13_check_digit(&code[..EAN13_LEN - 1])?;
        Some(ChecksumWarning {
            barcode: code.to_string(),
            expected_check_digit,
        })
    }
}

impl std::fmt::Display for ChecksumWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} does not pass the EAN-13 check (expected check digit {})",
            self.barcode, self.expected_check_digit
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_valid_codes() {
        assert!(is_valid_ean13("4006381333931"));
        assert!(is_valid_ean13("5901234123457"));
        assert!(is_valid_ean13("9780306406157"));
    }

    #[test]
    fn test_wrong_check_digit() {
        assert!(!is_valid_ean13("4006381333932"));
        assert!(!is_valid_ean13("5901234123458"));
    }

    #[test]
    fn test_non_thirteen_digit_inputs_are_invalid() {
        assert!(!is_valid_ean13(""));
        assert!(!is_valid_ean13("12"));
        assert!(!is_valid_ean13("400638133393"));
        assert!(!is_valid_ean13("40063813339310"));
        assert!(!is_valid_ean13("400638133393X"));
        assert!(!is_valid_ean13("A006381333931"));
        // Multi-byte characters must not panic on slicing
        assert!(!is_valid_ean13("40063813339é"));
    }

    #[test]
    fn test_check_digit_zero_case() {
        // Sum divisible by ten gives check digit 0, not 10
        assert_eq!(ean13_check_digit("000000000000"), Some(0));
        assert!(is_valid_ean13("0000000000000"));
    }

    #[test]
    fn test_warning_only_for_numeric_thirteen() {
        let warning = ChecksumWarning::inspect("4006381333932").unwrap();
        assert_eq!(warning.expected_check_digit, 1);

        assert!(ChecksumWarning::inspect("4006381333931").is_none());
        assert!(ChecksumWarning::inspect("SKU-00012345").is_none());
        assert!(ChecksumWarning::inspect("12345678").is_none());
    }
}
