//! Correlation penalty curves.
//!
//! A curve maps the share of bankroll already committed to a correlation group
//! onto a damping multiplier in `[0, 1]` applied to the Kelly stake.

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// One knot of a piecewise-linear curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Group exposure as a fraction of bankroll.
    pub exposure: Decimal,
    /// Multiplier at that exposure.
    pub multiplier: Decimal,
}

/// Damping applied to stakes in groups that already carry exposure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CorrelationPenaltyCurve {
    /// No damping regardless of exposure.
    Flat,
    /// 1.0 at zero exposure, falling linearly to `floor` at `saturation`
    /// and held there beyond it.
    Linear {
        /// Multiplier once exposure reaches `saturation`.
        floor: Decimal,
        /// Exposure fraction at which the floor is reached.
        saturation: Decimal,
    },
    /// Linear interpolation between points sorted by ascending exposure.
    /// Held flat before the first and after the last point.
    Piecewise {
        /// Knots, ascending by `exposure`.
        points: Vec<CurvePoint>,
    },
}

impl Default for CorrelationPenaltyCurve {
    fn default() -> Self {
        Self::Linear {
            floor: dec!(0.3),
            saturation: dec!(0.25),
        }
    }
}

impl CorrelationPenaltyCurve {
    /// Returns the multiplier for the given exposure fraction, clamped to `[0, 1]`.
    ///
    /// # Examples
    /// ```
    /// use edge_stake_core::CorrelationPenaltyCurve;
    /// use rust_decimal_macros::dec;
    ///
    /// let curve = CorrelationPenaltyCurve::default();
    /// assert_eq!(curve.multiplier(dec!(0)), dec!(1));
    /// assert_eq!(curve.multiplier(dec!(0.5)), dec!(0.3));
    /// ```
    #[must_use]
    pub fn multiplier(&self, exposure_fraction: Decimal) -> Decimal {
        let x = exposure_fraction.max(Decimal::ZERO);
        let raw = match self {
            Self::Flat => Decimal::ONE,
            Self::Linear { floor, saturation } => {
                if *saturation <= Decimal::ZERO {
                    if x > Decimal::ZERO {
                        *floor
                    } else {
                        Decimal::ONE
                    }
                } else {
                    let progress = x
                        .checked_div(*saturation)
                        .map_or(Decimal::ONE, |p| p.min(Decimal::ONE));
                    Decimal::ONE - (Decimal::ONE - *floor) * progress
                }
            }
            Self::Piecewise { points } => interpolate(points, x),
        };
        raw.clamp(Decimal::ZERO, Decimal::ONE)
    }

    /// Checks the curve parameters.
    ///
    /// # Errors
    /// Returns an error if a multiplier lies outside `[0, 1]`, the linear
    /// saturation is negative, or piecewise points are not ascending.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Flat => {}
            Self::Linear { floor, saturation } => {
                if !is_unit(*floor) {
                    anyhow::bail!("linear curve floor must be in [0, 1], got {floor}");
                }
                if *saturation < Decimal::ZERO {
                    anyhow::bail!("linear curve saturation must be >= 0, got {saturation}");
                }
            }
            Self::Piecewise { points } => {
                for point in points {
                    if !is_unit(point.multiplier) {
                        anyhow::bail!(
                            "curve multiplier must be in [0, 1], got {}",
                            point.multiplier
                        );
                    }
                    if point.exposure < Decimal::ZERO {
                        anyhow::bail!("curve exposure must be >= 0, got {}", point.exposure);
                    }
                }
                if points.windows(2).any(|w| w[1].exposure <= w[0].exposure) {
                    anyhow::bail!("curve points must be strictly ascending by exposure");
                }
            }
        }
        Ok(())
    }
}

fn is_unit(value: Decimal) -> bool {
    (Decimal::ZERO..=Decimal::ONE).contains(&value)
}

fn interpolate(points: &[CurvePoint], x: Decimal) -> Decimal {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Decimal::ONE;
    };
    if x <= first.exposure {
        return first.multiplier;
    }
    if x >= last.exposure {
        return last.multiplier;
    }
    for pair in points.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if x <= hi.exposure {
            let span = hi.exposure - lo.exposure;
            if span <= Decimal::ZERO {
                return hi.multiplier;
            }
            let t = (x - lo.exposure) / span;
            return lo.multiplier + (hi.multiplier - lo.multiplier) * t;
        }
    }
    last.multiplier
}
