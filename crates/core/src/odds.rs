//! Conversions into decimal odds.
//!
//! The engine only accepts decimal odds. Feeds that quote moneylines or
//! fractional odds convert with these helpers before building a
//! [`crate::BetCandidate`].

use rust_decimal::Decimal;

use crate::error::InvalidInputError;

/// Converts an American moneyline to decimal odds.
///
/// `+150` pays 1.5 profit per unit (2.5 decimal), `-200` pays 0.5 (1.5 decimal).
///
/// # Errors
/// Moneylines strictly between -100 and +100 do not exist.
pub fn american_to_decimal(moneyline: i64) -> Result<Decimal, InvalidInputError> {
    let hundred = Decimal::ONE_HUNDRED;
    match moneyline {
        m if m >= 100 => Ok(Decimal::ONE + Decimal::from(m) / hundred),
        m if m <= -100 => Ok(Decimal::ONE + hundred / Decimal::from(m).abs()),
        m => Err(InvalidInputError::Odds(format!(
            "moneyline must be <= -100 or >= +100, got {m}"
        ))),
    }
}

/// Converts fractional odds (`numerator/denominator`, e.g. 5/2) to decimal odds.
///
/// # Errors
/// Both parts must be positive.
pub fn fractional_to_decimal(numerator: u32, denominator: u32) -> Result<Decimal, InvalidInputError> {
    if numerator == 0 || denominator == 0 {
        return Err(InvalidInputError::Odds(format!(
            "fractional odds must be positive, got {numerator}/{denominator}"
        )));
    }
    Ok(Decimal::ONE + Decimal::from(numerator) / Decimal::from(denominator))
}

/// Market-implied win probability of decimal odds, ignoring the overround.
///
/// # Errors
/// Decimal odds must be greater than 1.0.
pub fn implied_probability(price: Decimal) -> Result<Decimal, InvalidInputError> {
    if price <= Decimal::ONE {
        return Err(InvalidInputError::Odds(format!(
            "decimal odds must be > 1.0, got {price}"
        )));
    }
    Ok(Decimal::ONE / price)
}
