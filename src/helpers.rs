//! Shared helpers for Decimal ↔ f64 conversions.
//!
//! Risk arithmetic runs on f64 (physical units), while currency amounts are
//! carried as `Decimal`. Conversions round-trip through a fixed-precision
//! format string so payout amounts always land on whole cents.
//!
//! All f64→Decimal conversions return `Decimal::ZERO` for non-finite inputs
//! (NaN, ±Inf).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Convert an f64 currency amount to Decimal, rounded to 2 decimal places.
pub(crate) fn f64_to_decimal_2dp(v: f64) -> Decimal {
    if !v.is_finite() {
        tracing::warn!(
            "f64_to_decimal_2dp received non-finite value {}, defaulting to 0",
            v
        );
        return Decimal::ZERO;
    }
    Decimal::from_str_exact(&format!("{:.2}", v)).unwrap_or_default()
}

/// Convert a Decimal to f64, defaulting to 0.0 for values that can't be represented.
///
/// Replaces the repeated pattern `some_decimal.to_f64().unwrap_or(0.0)`.
pub(crate) fn dec_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_f64_to_decimal_2dp_normal() {
        let d = f64_to_decimal_2dp(1234.567);
        assert_eq!(d, Decimal::from_str("1234.57").unwrap());
    }

    #[test]
    fn test_f64_to_decimal_2dp_whole() {
        let d = f64_to_decimal_2dp(9000.0);
        assert_eq!(d, Decimal::from_str("9000.00").unwrap());
    }

    #[test]
    fn test_f64_to_decimal_2dp_nan() {
        assert_eq!(f64_to_decimal_2dp(f64::NAN), Decimal::ZERO);
    }

    #[test]
    fn test_f64_to_decimal_2dp_infinity() {
        assert_eq!(f64_to_decimal_2dp(f64::INFINITY), Decimal::ZERO);
    }

    #[test]
    fn test_dec_to_f64_normal() {
        let d = Decimal::from_str("3.14").unwrap();
        assert!((dec_to_f64(d) - 3.14).abs() < 1e-10);
    }

    #[test]
    fn test_dec_to_f64_zero() {
        assert_eq!(dec_to_f64(Decimal::ZERO), 0.0);
    }
}
