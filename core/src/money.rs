//! Fixed-point money helpers.
//!
//! Every computed amount is rounded to 2 decimal places, half-up
//! (midpoint away from zero), before it is persisted or compared.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

pub const SCALE: u32 = 2;

/// Round to cents, half-up, and normalise the scale to exactly 2.
pub fn round(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(SCALE);
    rounded
}

/// Convert a sampled ratio into a decimal factor. Non-finite input maps to zero.
pub fn ratio(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

/// `amount * rate`, rounded.
pub fn apply_rate(amount: Decimal, rate: Decimal) -> Decimal {
    round(amount * rate)
}

/// Reject zero or negative amounts before any mutation.
pub fn require_positive(amount: Decimal, what: &str) -> crate::error::SimResult<()> {
    if amount <= Decimal::ZERO {
        return Err(crate::error::SimError::validation(format!(
            "{what} must be greater than zero"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(round(d("3041.666")), d("3041.67"));
        assert_eq!(round(d("0.005")), d("0.01"));
        assert_eq!(round(d("0.004")), d("0.00"));
    }

    #[test]
    fn normalises_scale() {
        assert_eq!(round(d("2500")).to_string(), "2500.00");
    }

    #[test]
    fn monthly_growth_on_starting_cash() {
        assert_eq!(apply_rate(d("100000.00"), d("0.025")), d("2500.00"));
    }

    #[test]
    fn non_finite_ratio_is_zero() {
        assert_eq!(ratio(f64::NAN), Decimal::ZERO);
    }
}
