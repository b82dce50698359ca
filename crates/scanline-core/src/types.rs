//! # Domain Types
//!
//! Core domain types shared by every scan path.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CatalogEntry   │   │   ScanEvent     │   │   Percentage    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  product_id     │   │  barcode        │   │  bps (u32)      │       │
//! │  │  sku, name      │   │  source         │   │  1000 = 10%     │       │
//! │  │  selling_price  │   │  observed_at    │   └─────────────────┘       │
//! │  │  available_stock│   └─────────────────┘                             │
//! │  │  barcodes[]     │                         ┌─────────────────┐       │
//! │  └─────────────────┘   ┌─────────────────┐   │    ScanMode     │       │
//! │                        │   ScanSource    │   │  ─────────────  │       │
//! │                        │  Camera         │   │  Camera         │       │
//! │                        │  Manual         │   │  Manual         │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Percentage
// =============================================================================

/// A percentage in basis points (1 bps = 0.01%).
///
/// 1000 bps = 10%, 10000 bps = 100%. Discounts are stored this way so the
/// cart never touches floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Creates a percentage from a display value (for host convenience).
    pub fn from_percent(pct: f64) -> Self {
        Percentage((pct * 100.0).round().max(0.0) as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Display value (12.5 for 1250 bps).
    #[inline]
    pub fn percent(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    /// 100%.
    #[inline]
    pub const fn full() -> Self {
        Percentage(10_000)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Percentage::zero()
    }
}

// =============================================================================
// Catalog Entry
// =============================================================================

/// A product as known to the store catalog at fetch time.
///
/// One product may carry several barcodes (case pack, single unit, a
/// re-labelled import); each of them resolves to this entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub product_id: String,
    pub name: String,
    pub sku: String,
    pub buying_price: Money,
    pub selling_price: Money,
    /// Stock on hand as of the fetch. Bounds every cart quantity.
    pub available_stock: i64,
    pub barcodes: Vec<String>,
}

impl CatalogEntry {
    /// Whether at least one unit can be sold.
    #[inline]
    pub fn in_stock(&self) -> bool {
        self.available_stock > 0
    }
}

// =============================================================================
// Scan Source / Scan Event
// =============================================================================

/// Where a barcode came from. Carried for logging only; the reconciler
/// never sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ScanSource {
    Camera,
    Manual,
}

impl std::fmt::Display for ScanSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanSource::Camera => write!(f, "camera"),
            ScanSource::Manual => write!(f, "manual"),
        }
    }
}

/// One accepted physical scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ScanEvent {
    pub barcode: String,
    pub source: ScanSource,
    #[ts(as = "String")]
    pub observed_at: DateTime<Utc>,
}

impl ScanEvent {
    /// Creates an event observed now.
    pub fn new(barcode: impl Into<String>, source: ScanSource) -> Self {
        Self::observed(barcode, source, Utc::now())
    }

    /// Creates an event with an explicit observation time.
    pub fn observed(barcode: impl Into<String>, source: ScanSource, at: DateTime<Utc>) -> Self {
        ScanEvent {
            barcode: barcode.into(),
            source,
            observed_at: at,
        }
    }
}

// =============================================================================
// Scan Mode
// =============================================================================

/// The active input mode of the scanner view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    #[default]
    Camera,
    Manual,
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanMode::Camera => write!(f, "camera"),
            ScanMode::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for ScanMode {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "camera" | "scanner" => Ok(ScanMode::Camera),
            "manual" | "keypad" => Ok(ScanMode::Manual),
            _ => Err(crate::error::ValidationError::NotAllowed {
                field: "scan mode".to_string(),
                allowed: vec!["camera".to_string(), "manual".to_string()],
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_from_percent() {
        let pct = Percentage::from_percent(12.5);
        assert_eq!(pct.bps(), 1250);
        assert!((pct.percent() - 12.5).abs() < 0.001);
    }

    #[test]
    fn test_percentage_default_is_zero() {
        assert!(Percentage::default().is_zero());
    }

    #[test]
    fn test_scan_mode_parsing() {
        assert_eq!("camera".parse::<ScanMode>().unwrap(), ScanMode::Camera);
        assert_eq!("Keypad".parse::<ScanMode>().unwrap(), ScanMode::Manual);
        assert!("laser".parse::<ScanMode>().is_err());
    }

    #[test]
    fn test_scan_event_serializes_camel_case() {
        let event = ScanEvent::new("4006381333931", ScanSource::Manual);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["barcode"], "4006381333931");
        assert_eq!(json["source"], "manual");
        assert!(json.get("observedAt").is_some());
    }
}
