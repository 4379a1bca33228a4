//! Kelly Criterion math for decimal-odds wagers.
//!
//! For a bet at decimal odds `d` (total return per unit staked, including the
//! stake) with win probability `p`:
//!
//! ```text
//! EV = p * d - 1
//! f* = (p * d - 1) / (d - 1)
//! ```
//!
//! `d - 1` is the net odds `b`, so `f*` is the classic `(b*p - q) / b`.

use rust_decimal::Decimal;

/// Expected profit per unit staked.
///
/// # Examples
/// ```
/// use edge_stake_core::kelly::expected_value;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(expected_value(dec!(0.55), dec!(2.0)), dec!(0.10));
/// ```
#[must_use]
pub fn expected_value(probability: Decimal, price: Decimal) -> Decimal {
    probability * price - Decimal::ONE
}

/// Full Kelly fraction of bankroll.
///
/// Negative when the bet has negative expectation and above 1.0 for extreme
/// edges. Returns zero for `price <= 1.0`, where the formula is undefined.
///
/// # Examples
/// ```
/// use edge_stake_core::kelly::kelly_fraction;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(kelly_fraction(dec!(0.6), dec!(2.0)), dec!(0.2));
/// ```
#[must_use]
pub fn kelly_fraction(probability: Decimal, price: Decimal) -> Decimal {
    let net_odds = price - Decimal::ONE;
    if net_odds <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    expected_value(probability, price) / net_odds
}
