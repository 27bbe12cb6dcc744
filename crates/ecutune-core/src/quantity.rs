//! # Quantity Module
//!
//! Fixed-point decimal values.
//!
//! A [`Quantity`] is an unsigned integer `raw` plus a count of implied
//! decimal places, so `Quantity::new(138, 2)` is `1.38`. Scaling by a
//! percentage and rescaling to a different precision is done in integer
//! arithmetic with round-half-up. Conversion to `f64` happens only at the
//! serialization boundary, by parsing the decimal text.

use serde::{Serialize, Serializer};
use std::fmt;

/// Largest precision a quantity may carry.
pub const MAX_DECIMALS: u8 = 6;

/// A non-negative fixed-point decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quantity {
    raw: u64,
    decimals: u8,
}

impl Quantity {
    /// Create a quantity from its raw integer and implied decimal places.
    ///
    /// Callers pass precisions from static tables or already clamped to
    /// [`MAX_DECIMALS`]; outside the crate, values come from [`Quantity::whole`]
    /// and [`Quantity::scale_percent`].
    #[must_use]
    pub(crate) const fn new(raw: u64, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    /// A whole number with no decimal places.
    #[must_use]
    pub const fn whole(value: u64) -> Self {
        Self::new(value, 0)
    }

    /// Zero.
    #[must_use]
    pub const fn zero() -> Self {
        Self::whole(0)
    }

    /// The raw integer.
    #[must_use]
    pub const fn raw(&self) -> u64 {
        self.raw
    }

    /// Number of implied decimal places.
    #[must_use]
    pub const fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Multiply by `percent / 100` and round half-up to `decimals` places.
    ///
    /// `Quantity::new(1200, 3).scale_percent(115, 2)` is `1.38`.
    #[must_use]
    pub fn scale_percent(&self, percent: u32, decimals: u8) -> Self {
        let decimals = decimals.min(MAX_DECIMALS);
        let numerator = u128::from(self.raw)
            .saturating_mul(u128::from(percent))
            .saturating_mul(pow10(decimals));
        let denominator = 100u128.saturating_mul(pow10(self.decimals));
        let rounded = numerator.saturating_add(denominator / 2) / denominator;
        Self::new(u64::try_from(rounded).unwrap_or(u64::MAX), decimals)
    }

    /// Convert to `f64` for display and JSON.
    ///
    /// Goes through the decimal text so that `1.38` becomes the nearest
    /// `f64` to 1.38 rather than the result of a float division.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or_default()
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.decimals == 0 {
            return write!(f, "{}", self.raw);
        }
        let divisor = 10u64.pow(u32::from(self.decimals));
        write!(
            f,
            "{}.{:0width$}",
            self.raw / divisor,
            self.raw % divisor,
            width = self.decimals as usize
        )
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if self.decimals == 0 {
            serializer.serialize_u64(self.raw)
        } else {
            serializer.serialize_f64(self.to_f64())
        }
    }
}

fn pow10(exp: u8) -> u128 {
    10u128.pow(u32::from(exp))
}

// =============================================================================
// TESTS
// =============================================================================
