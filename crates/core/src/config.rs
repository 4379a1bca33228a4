//! Staking and risk configuration.

use std::time::Duration;

use anyhow::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationPenaltyCurve;

// =============================================================================
// Configuration
// =============================================================================

/// Parameters for the staking engine and the portfolio risk monitor.
///
/// A plain value object: the engine never reads the environment. Hosts build
/// one with [`Default`] and the `with_*` builders, or through
/// [`crate::ConfigLoader`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingConfig {
    /// Largest fraction of bankroll risked on a single bet.
    /// Default: 0.05
    pub max_stake_fraction: Decimal,

    /// Fractional Kelly multiplier.
    /// Default: 0.25 (quarter Kelly)
    pub kelly_multiplier: Decimal,

    /// Minimum expected value per unit staked worth betting.
    /// Default: 0.02
    pub min_edge_threshold: Decimal,

    /// Damping applied to stakes in groups with open exposure.
    /// Default: linear from 1.0 at 0% to 0.3 at 25%+
    pub correlation_penalty_curve: CorrelationPenaltyCurve,

    /// Fraction of the initial bankroll lost that stops all betting.
    /// Default: 0.20
    pub drawdown_stop_fraction: Decimal,

    /// Pause applied once the drawdown stop fires.
    /// Default: 3 days
    #[serde(with = "humantime_serde")]
    pub cooldown_duration: Duration,

    /// Losing streak length that blocks new bets.
    /// Default: 5
    pub consecutive_loss_limit: u32,

    /// Cap on the sum of all open and proposed exposure, as a fraction of bankroll.
    /// Default: 0.30
    pub max_total_exposure_fraction: Decimal,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            max_stake_fraction: dec!(0.05),
            kelly_multiplier: dec!(0.25),
            min_edge_threshold: dec!(0.02),
            correlation_penalty_curve: CorrelationPenaltyCurve::default(),
            drawdown_stop_fraction: dec!(0.20),
            cooldown_duration: Duration::from_secs(3 * 24 * 60 * 60), // 3 days
            consecutive_loss_limit: 5,
            max_total_exposure_fraction: dec!(0.30),
        }
    }
}

impl StakingConfig {
    /// Builder method to set the per-bet stake cap.
    #[must_use]
    pub fn with_max_stake_fraction(mut self, fraction: Decimal) -> Self {
        self.max_stake_fraction = fraction;
        self
    }

    /// Builder method to set the fractional Kelly multiplier.
    #[must_use]
    pub fn with_kelly_multiplier(mut self, multiplier: Decimal) -> Self {
        self.kelly_multiplier = multiplier;
        self
    }

    /// Builder method to set the minimum edge.
    #[must_use]
    pub fn with_min_edge_threshold(mut self, threshold: Decimal) -> Self {
        self.min_edge_threshold = threshold;
        self
    }

    /// Builder method to set the correlation penalty curve.
    #[must_use]
    pub fn with_correlation_penalty_curve(mut self, curve: CorrelationPenaltyCurve) -> Self {
        self.correlation_penalty_curve = curve;
        self
    }

    /// Builder method to set the drawdown stop.
    #[must_use]
    pub fn with_drawdown_stop_fraction(mut self, fraction: Decimal) -> Self {
        self.drawdown_stop_fraction = fraction;
        self
    }

    /// Builder method to set the cooldown duration.
    #[must_use]
    pub fn with_cooldown_duration(mut self, duration: Duration) -> Self {
        self.cooldown_duration = duration;
        self
    }

    /// Builder method to set the losing streak limit.
    #[must_use]
    pub fn with_consecutive_loss_limit(mut self, limit: u32) -> Self {
        self.consecutive_loss_limit = limit;
        self
    }

    /// Builder method to set the portfolio exposure cap.
    #[must_use]
    pub fn with_max_total_exposure_fraction(mut self, fraction: Decimal) -> Self {
        self.max_total_exposure_fraction = fraction;
        self
    }

    /// Cooldown as a signed chrono duration, saturating at the chrono maximum.
    #[must_use]
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.cooldown_duration).unwrap_or(chrono::Duration::MAX)
    }

    /// Checks that every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first out-of-range parameter.
    pub fn validate(&self) -> Result<()> {
        check_fraction("max_stake_fraction", self.max_stake_fraction)?;
        check_fraction("min_edge_threshold", self.min_edge_threshold)?;
        check_fraction("drawdown_stop_fraction", self.drawdown_stop_fraction)?;
        check_fraction(
            "max_total_exposure_fraction",
            self.max_total_exposure_fraction,
        )?;
        if self.kelly_multiplier <= Decimal::ZERO {
            anyhow::bail!(
                "kelly_multiplier must be > 0, got {}",
                self.kelly_multiplier
            );
        }
        if self.consecutive_loss_limit == 0 {
            anyhow::bail!("consecutive_loss_limit must be at least 1");
        }
        self.correlation_penalty_curve.validate()
    }
}

fn check_fraction(name: &str, value: Decimal) -> Result<()> {
    if !(Decimal::ZERO..=Decimal::ONE).contains(&value) {
        anyhow::bail!("{name} must be in [0, 1], got {value}");
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
