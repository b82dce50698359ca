//! # Money
//!
//! Integer cents for every price and total the scanner touches.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Three scans of a $0.10 item:                                           │
//! │    f64:   0.1 + 0.1 + 0.1 = 0.30000000000000004                         │
//! │    cents: 10 × 3          = 30                                          │
//! │                                                                         │
//! │  subtotal, discount_amount and total of a cart line stay in i64 cents;  │
//! │  only the discount step widens to i128 to multiply by basis points.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```rust
//! use scanline_core::money::Money;
//! use scanline_core::types::Percentage;
//!
//! let subtotal = Money::from_cents(1099).multiply_quantity(3);
//! assert_eq!(subtotal.cents(), 3297);
//! assert_eq!(subtotal.percentage_of(Percentage::from_bps(1000)).cents(), 330);
//! ```

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::Percentage;

/// An amount in cents. Serialized as a bare integer.
///
/// ```text
/// CatalogEntry.selling_price ──► CartLine.unit_price ──► CartLine.subtotal
///                                                             │
///                                  discount_amount ◄──────────┤
///                                                             ▼
///                                                      CartLine.total
/// ```
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn zero() -> Self {
        Money(0)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Line subtotal for `qty` units at this unit price.
    pub const fn multiply_quantity(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// `self × percentage / 100`, rounded half up to the cent.
    ///
    /// Computed as `(cents × bps + 5000) / 10000` in i128.
    ///
    /// ```rust
    /// use scanline_core::money::Money;
    /// use scanline_core::types::Percentage;
    ///
    /// // 8.25% of $10.00 is 82.5 cents
    /// let cut = Money::from_cents(1000).percentage_of(Percentage::from_bps(825));
    /// assert_eq!(cut.cents(), 83);
    /// ```
    pub fn percentage_of(self, percentage: Percentage) -> Money {
        let scaled = i128::from(self.0) * i128::from(percentage.bps()) + 5000;
        Money((scaled / 10_000) as i64)
    }
}

/// `$12.34` / `-$0.05`. Hosts localize on their own.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let abs = self.0.unsigned_abs();
        if self.0 < 0 {
            f.write_str("-")?;
        }
        write!(f, "${}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), Add::add)
    }
}
