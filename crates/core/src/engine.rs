//! Edge detection and stake sizing for a single candidate.
//!
//! [`evaluate`] is a pure function of its inputs: the same candidate, portfolio,
//! config and `now` always produce the same [`StakingDecision`]. It proposes a
//! stake and never mutates the portfolio.
//!
//! Pipeline:
//! 1. Blocking checks (cooldown, drawdown stop, losing streak) short-circuit to
//!    [`Decision::Blocked`].
//! 2. `ev = p * price - 1`; zero or below `min_edge_threshold` is [`Decision::Skip`].
//! 3. Full Kelly `(p * price - 1) / (price - 1)`.
//! 4. Fractional Kelly damping by `kelly_multiplier`.
//! 5. Correlation penalty from the group's open exposure.
//! 6. Stake is the damped Kelly clamped to `[0, max_stake_fraction]`, then
//!    scaled by the correlation multiplier, so a correlated stake is smaller
//!    than an uncorrelated one even at the cap.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::candidate::BetCandidate;
use crate::config::StakingConfig;
use crate::error::InvalidInputError;
use crate::kelly;
use crate::portfolio::PortfolioState;

/// Outcome of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Place the proposed stake.
    Bet,
    /// No usable edge. Informational only.
    Skip,
    /// A risk control refused the bet. Not overridable by the end user.
    Blocked,
}

/// Risk control that produced a [`Decision::Blocked`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// `cooldown_until` is in the future.
    Cooldown,
    /// Drawdown reached `drawdown_stop_fraction`. The monitor starts a cooldown.
    DrawdownStop,
    /// `consecutive_losses` reached `consecutive_loss_limit`.
    LossStreak,
}

/// Full audit record of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingDecision {
    /// Echo of the candidate id.
    pub candidate_id: String,
    /// Expected profit per unit staked, may be negative.
    pub expected_value: Decimal,
    /// Uncapped full Kelly fraction.
    pub kelly_raw: Decimal,
    /// Kelly after fractional and correlation damping, before the cap.
    pub kelly_adjusted: Decimal,
    /// Final fraction of bankroll to risk.
    pub stake_fraction: Decimal,
    /// `stake_fraction * bankroll`.
    pub stake_amount: Decimal,
    /// Bet, skip or blocked.
    pub decision: Decision,
    /// Which control blocked the bet, if any.
    pub blocked_by: Option<BlockReason>,
    /// Every adjustment or block applied, in order.
    pub reasons: Vec<String>,
}

impl StakingDecision {
    fn refusal(
        candidate: &BetCandidate,
        decision: Decision,
        blocked_by: Option<BlockReason>,
        reason: String,
    ) -> Self {
        Self {
            candidate_id: candidate.id.clone(),
            expected_value: candidate.expected_value(),
            kelly_raw: kelly::kelly_fraction(candidate.probability, candidate.price),
            kelly_adjusted: Decimal::ZERO,
            stake_fraction: Decimal::ZERO,
            stake_amount: Decimal::ZERO,
            decision,
            blocked_by,
            reasons: vec![reason],
        }
    }

    /// Returns true for [`Decision::Bet`].
    #[must_use]
    pub fn is_bet(&self) -> bool {
        self.decision == Decision::Bet
    }
}

/// Evaluates one candidate against a portfolio snapshot.
///
/// # Errors
///
/// Returns [`InvalidInputError`] when the candidate's probability or price is
/// out of domain, or the portfolio has a non-positive bankroll. Skips and
/// blocks are ordinary `Ok` results.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use edge_stake_core::{evaluate, BetCandidate, Decision, PortfolioState, StakingConfig};
/// use rust_decimal_macros::dec;
///
/// let portfolio = PortfolioState::new(dec!(1000));
/// let candidate = BetCandidate::new("bos-ml", dec!(0.55), dec!(2.0));
/// let decision = evaluate(&candidate, &portfolio, &StakingConfig::default(), Utc::now()).unwrap();
///
/// assert_eq!(decision.decision, Decision::Bet);
/// assert_eq!(decision.stake_fraction, dec!(0.025));
/// assert_eq!(decision.stake_amount, dec!(25));
/// ```
pub fn evaluate(
    candidate: &BetCandidate,
    portfolio: &PortfolioState,
    config: &StakingConfig,
    now: DateTime<Utc>,
) -> Result<StakingDecision, InvalidInputError> {
    candidate.validate()?;
    portfolio.validate()?;

    if let Some(decision) = check_blocks(candidate, portfolio, config, now) {
        warn!(
            candidate = %candidate.id,
            blocked_by = ?decision.blocked_by,
            "Stake blocked"
        );
        return Ok(decision);
    }

    let ev = candidate.expected_value();
    if ev <= Decimal::ZERO || ev < config.min_edge_threshold {
        debug!(candidate = %candidate.id, %ev, "Edge below threshold");
        return Ok(StakingDecision::refusal(
            candidate,
            Decision::Skip,
            None,
            format!("edge below threshold: ev={}", ev.normalize()),
        ));
    }

    let kelly_raw = kelly::kelly_fraction(candidate.probability, candidate.price);
    let kelly_damped = kelly_raw * config.kelly_multiplier;

    let mut reasons = Vec::new();

    let group = candidate.group();
    // Overflow only happens for exposure far beyond any curve's saturation
    let exposure = portfolio
        .exposure_for(group)
        .checked_div(portfolio.bankroll)
        .unwrap_or(Decimal::MAX);
    let multiplier = config.correlation_penalty_curve.multiplier(exposure);
    let kelly_adjusted = kelly_damped * multiplier;
    reasons.push(format!(
        "correlation penalty: group={}, exposure={}, multiplier={}",
        group.unwrap_or("none"),
        exposure.normalize(),
        multiplier.normalize()
    ));

    let mut bounded = kelly_damped.max(Decimal::ZERO);
    if bounded > config.max_stake_fraction {
        bounded = config.max_stake_fraction;
        reasons.push(format!(
            "capped at max_stake_fraction ({})",
            config.max_stake_fraction.normalize()
        ));
    }
    let stake_fraction = bounded * multiplier;

    let decision = if stake_fraction > Decimal::ZERO {
        Decision::Bet
    } else {
        reasons.push("no stake after adjustments".to_string());
        Decision::Skip
    };

    let stake_amount = stake_fraction * portfolio.bankroll;

    debug!(
        candidate = %candidate.id,
        %ev,
        %kelly_raw,
        %kelly_adjusted,
        %stake_fraction,
        %stake_amount,
        ?decision,
        "Evaluated candidate"
    );

    Ok(StakingDecision {
        candidate_id: candidate.id.clone(),
        expected_value: ev,
        kelly_raw,
        kelly_adjusted,
        stake_fraction,
        stake_amount,
        decision,
        blocked_by: None,
        reasons,
    })
}

fn check_blocks(
    candidate: &BetCandidate,
    portfolio: &PortfolioState,
    config: &StakingConfig,
    now: DateTime<Utc>,
) -> Option<StakingDecision> {
    if let Some(until) = portfolio.cooldown_until.filter(|until| *until > now) {
        return Some(StakingDecision::refusal(
            candidate,
            Decision::Blocked,
            Some(BlockReason::Cooldown),
            format!("cooldown active until {}", until.to_rfc3339()),
        ));
    }

    let drawdown = portfolio.drawdown();
    if drawdown >= config.drawdown_stop_fraction || portfolio.bankroll <= Decimal::ZERO {
        return Some(StakingDecision::refusal(
            candidate,
            Decision::Blocked,
            Some(BlockReason::DrawdownStop),
            format!(
                "drawdown stop-loss triggered: drawdown={}, limit={}",
                drawdown.normalize(),
                config.drawdown_stop_fraction.normalize()
            ),
        ));
    }

    if portfolio.consecutive_losses >= config.consecutive_loss_limit {
        return Some(StakingDecision::refusal(
            candidate,
            Decision::Blocked,
            Some(BlockReason::LossStreak),
            format!(
                "consecutive loss limit reached: {} >= {}",
                portfolio.consecutive_losses, config.consecutive_loss_limit
            ),
        ));
    }

    None
}
