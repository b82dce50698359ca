//! # Manual Entry Gate
//!
//! Keypad fallback for codes the camera cannot read (damaged labels,
//! glare, a product with no printed barcode at all).
//!
//! ```text
//! keypad input ──► validate shape ──┬── reject ──► ValidationError (no event)
//!                                   │
//!                                   └── accept ──► ScanEvent { source: Manual }
//!                                                   + ChecksumWarning if the
//!                                                     13 digits fail EAN-13
//! ```
//!
//! The produced event is indistinguishable, for the reconciler, from a camera
//! scan.

use chrono::{DateTime, Utc};

use crate::checksum::ChecksumWarning;
use crate::types::{ScanEvent, ScanSource};
use crate::validation::{validate_manual_barcode, ValidationResult};
use crate::DEFAULT_MIN_MANUAL_LENGTH;

/// An accepted manual entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualSubmission {
    pub event: ScanEvent,
    /// Set when the input is 13 digits but not a valid EAN-13. The event is
    /// still forwarded.
    pub warning: Option<ChecksumWarning>,
}

/// Validates keyed-in codes before they become scan events.
#[derive(Debug, Clone, Copy)]
pub struct ManualEntryGate {
    min_length: usize,
}

impl ManualEntryGate {
    pub fn new(min_length: usize) -> Self {
        ManualEntryGate { min_length }
    }

    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Validates `input` and produces a manual `ScanEvent` observed now.
    pub fn submit(&self, input: &str) -> ValidationResult<ManualSubmission> {
        self.submit_at(input, Utc::now())
    }

    /// Same as [`submit`](Self::submit) with an explicit observation time.
    pub fn submit_at(&self, input: &str, at: DateTime<Utc>) -> ValidationResult<ManualSubmission> {
        let barcode = validate_manual_barcode(input, self.min_length)?;
        let warning = ChecksumWarning::inspect(&barcode);

        Ok(ManualSubmission {
            event: ScanEvent::observed(barcode, ScanSource::Manual, at),
            warning,
        })
    }
}

impl Default for ManualEntryGate {
    fn default() -> Self {
        ManualEntryGate::new(DEFAULT_MIN_MANUAL_LENGTH)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_short_input_is_rejected() {
        let gate = ManualEntryGate::default();
        assert!(matches!(
            gate.submit("12"),
            Err(ValidationError::TooShort { min: 8, .. })
        ));
    }

    #[test]
    fn test_blank_input_is_rejected() {
        let gate = ManualEntryGate::default();
        assert!(matches!(
            gate.submit("   \t"),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_valid_ean13_has_no_warning() {
        let submission = ManualEntryGate::default().submit(" 4006381333931 ").unwrap();
        assert_eq!(submission.event.barcode, "4006381333931");
        assert_eq!(submission.event.source, ScanSource::Manual);
        assert!(submission.warning.is_none());
    }

    #[test]
    fn test_bad_checksum_is_forwarded_with_warning() {
        let submission = ManualEntryGate::default().submit("4006381333932").unwrap();
        assert_eq!(submission.event.barcode, "4006381333932");
        let warning = submission.warning.expect("checksum warning");
        assert_eq!(warning.expected_check_digit, 1);
    }

    #[test]
    fn test_non_numeric_internal_code_is_accepted() {
        let submission = ManualEntryGate::default().submit("INT-000381").unwrap();
        assert_eq!(submission.event.barcode, "INT-000381");
        assert!(submission.warning.is_none());
    }
}
