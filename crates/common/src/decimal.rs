//! Exact fixed-point decimal arithmetic for price and quantity.
//!
//! Every monetary or quantity field in the exchange core is a [`Decimal`].
//! `f64`/`f32` never appear on the price/quantity path: binary floats cannot
//! represent values like `0.1` exactly, which is fatal for tick/lot
//! validation and for balance accounting that must net to zero.

pub use rust_decimal::Decimal;

/// Operations the matching engine and order service need beyond what
/// `rust_decimal::Decimal` already provides (it natively supports add, sub,
/// mul, div, rem, and a total `Ord`).
pub trait DecimalExt {
    /// True if `self` is an exact integer multiple of `step` (used for tick
    /// size / lot size validation). `step` of zero is treated as "no
    /// constraint" and always returns true.
    fn is_multiple_of(&self, step: Decimal) -> bool;

    /// Canonical string form: fixed-point, no scientific notation, and
    /// significant trailing zeros preserved (`rust_decimal` already tracks
    /// scale internally, so `Display` gives us this for free).
    fn canonical_string(&self) -> String;
}

impl DecimalExt for Decimal {
    fn is_multiple_of(&self, step: Decimal) -> bool {
        if step.is_zero() {
            return true;
        }
        (*self % step).is_zero()
    }

    fn canonical_string(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn multiple_of_tick_size() {
        let price = Decimal::from_str("50000.50").unwrap();
        let tick = Decimal::from_str("0.10").unwrap();
        assert!(price.is_multiple_of(tick));

        let bad_price = Decimal::from_str("50000.55").unwrap();
        assert!(!bad_price.is_multiple_of(tick));
    }

    #[test]
    fn zero_step_is_unconstrained() {
        let price = Decimal::from_str("1.2345").unwrap();
        assert!(price.is_multiple_of(Decimal::ZERO));
    }

    #[test]
    fn canonical_string_preserves_scale() {
        let value = Decimal::from_str("50000.00").unwrap();
        assert_eq!(value.canonical_string(), "50000.00");
    }

    #[test]
    fn total_ordering() {
        let a = Decimal::from_str("1.0").unwrap();
        let b = Decimal::from_str("1.00").unwrap();
        assert_eq!(a, b);
        assert!(a <= b && b <= a);
    }
}
