//! Portfolio risk monitor.
//!
//! Sequences a batch of candidates against one portfolio and owns the state
//! transitions the engine only detects:
//! - Cooldown activation when the drawdown stop fires
//! - Bankroll and losing streak updates on settlement
//!
//! # Batch Ordering
//!
//! Candidates are evaluated by expected value descending (ties by id ascending)
//! so the strongest edges claim correlated capacity first. Each BET adds its
//! stake to a working copy of the group exposure before the next candidate is
//! sized. Decisions come back in input order.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::candidate::BetCandidate;
use crate::config::StakingConfig;
use crate::engine::{self, BlockReason, Decision, StakingDecision};
use crate::error::InvalidInputError;
use crate::portfolio::PortfolioState;

/// Resolved outcome of a placed bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BetResult {
    /// The bet paid out.
    Win,
    /// The stake was lost.
    Loss,
}

/// Evaluates a batch of simultaneous candidates.
///
/// The portfolio's exposure map is left untouched; proposed stakes only
/// affect the working copy used within this batch. The one persistent change
/// is `cooldown_until`, set when the drawdown stop fires.
///
/// # Errors
///
/// Returns [`InvalidInputError`] before evaluating anything if any candidate is
/// malformed, two candidates share an id, or the portfolio is invalid.
pub fn evaluate_batch(
    candidates: &[BetCandidate],
    portfolio: &mut PortfolioState,
    config: &StakingConfig,
    now: DateTime<Utc>,
) -> Result<Vec<StakingDecision>, InvalidInputError> {
    portfolio.validate()?;
    let mut seen = HashSet::with_capacity(candidates.len());
    for candidate in candidates {
        candidate.validate()?;
        if !seen.insert(candidate.id.as_str()) {
            return Err(InvalidInputError::DuplicateCandidate(candidate.id.clone()));
        }
    }

    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| evaluation_order(&candidates[a], &candidates[b]));

    let mut working = portfolio.clone();
    let exposure_cap = config
        .max_total_exposure_fraction
        .saturating_mul(working.bankroll);
    let mut slots: Vec<Option<StakingDecision>> = vec![None; candidates.len()];

    for index in order {
        let candidate = &candidates[index];
        let mut decision = engine::evaluate(candidate, &working, config, now)?;

        if decision.blocked_by == Some(BlockReason::DrawdownStop) {
            let until = now
                .checked_add_signed(config.cooldown())
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            portfolio.cooldown_until = Some(until);
            working.cooldown_until = Some(until);
            decision
                .reasons
                .push(format!("cooldown started until {}", until.to_rfc3339()));
            warn!(
                candidate = %candidate.id,
                drawdown = %working.drawdown(),
                %until,
                "Drawdown stop-loss fired, cooldown started"
            );
        }

        if decision.is_bet() {
            apply_exposure_cap(&mut decision, &working, exposure_cap);
        }

        if decision.is_bet() {
            working.commit_exposure(candidate.group(), decision.stake_amount);
        }

        slots[index] = Some(decision);
    }

    let decisions: Vec<StakingDecision> = slots.into_iter().flatten().collect();
    info!(
        candidates = candidates.len(),
        bets = decisions.iter().filter(|d| d.is_bet()).count(),
        proposed_exposure = %(working.total_exposure() - portfolio.total_exposure()),
        "Batch evaluated"
    );
    Ok(decisions)
}

fn evaluation_order(a: &BetCandidate, b: &BetCandidate) -> Ordering {
    b.expected_value()
        .cmp(&a.expected_value())
        .then_with(|| a.id.cmp(&b.id))
}

fn apply_exposure_cap(decision: &mut StakingDecision, working: &PortfolioState, cap: Decimal) {
    let remaining = cap - working.total_exposure();
    if remaining <= Decimal::ZERO {
        decision.stake_fraction = Decimal::ZERO;
        decision.stake_amount = Decimal::ZERO;
        decision.decision = Decision::Skip;
        decision
            .reasons
            .push("portfolio exposure cap reached".to_string());
    } else if decision.stake_amount > remaining {
        decision.stake_amount = remaining;
        decision.stake_fraction = remaining / working.bankroll;
        decision.reasons.push(format!(
            "trimmed to portfolio exposure cap: stake={}",
            remaining.normalize()
        ));
    }
}

/// Applies a settled result to the portfolio.
///
/// - `Win`: `bankroll += payout - stake_amount`, losing streak reset
/// - `Loss`: `bankroll -= stake_amount`, losing streak incremented
///
/// `payout` is the gross return including the stake and is ignored on a loss.
/// Open exposure is not touched; release it with
/// [`PortfolioState::release_exposure`] in the same transaction.
///
/// A loss may take the bankroll to exactly zero; the engine then blocks every
/// candidate on the drawdown stop.
///
/// # Errors
///
/// Returns [`InvalidInputError::Settlement`] for a negative stake or payout,
/// and [`InvalidInputError::StakeExceedsBankroll`] if the result would leave a
/// negative bankroll.
pub fn record_settlement(
    mut portfolio: PortfolioState,
    result: BetResult,
    stake_amount: Decimal,
    payout: Decimal,
) -> Result<PortfolioState, InvalidInputError> {
    if stake_amount < Decimal::ZERO || payout < Decimal::ZERO {
        return Err(InvalidInputError::Settlement {
            stake: stake_amount,
            payout,
        });
    }

    let bankroll = match result {
        BetResult::Win => portfolio
            .bankroll
            .saturating_add(payout)
            .saturating_sub(stake_amount),
        BetResult::Loss => portfolio.bankroll.saturating_sub(stake_amount),
    };
    if bankroll < Decimal::ZERO {
        return Err(InvalidInputError::StakeExceedsBankroll {
            stake: stake_amount,
            bankroll: portfolio.bankroll,
        });
    }

    portfolio.bankroll = bankroll;
    match result {
        BetResult::Win => portfolio.consecutive_losses = 0,
        BetResult::Loss => {
            portfolio.consecutive_losses = portfolio.consecutive_losses.saturating_add(1);
        }
    }

    info!(
        ?result,
        %stake_amount,
        %payout,
        bankroll = %portfolio.bankroll,
        consecutive_losses = portfolio.consecutive_losses,
        "Settlement recorded"
    );
    Ok(portfolio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 19, 0, 0).unwrap()
    }

    // ==================== Batch Ordering ====================

    #[test]
    fn test_results_in_input_order() {
        let candidates = vec![
            BetCandidate::new("low", dec!(0.53), dec!(2.0)),
            BetCandidate::new("high", dec!(0.60), dec!(2.0)),
            BetCandidate::new("none", dec!(0.40), dec!(2.0)),
        ];
        let mut portfolio = PortfolioState::new(dec!(1000));
        let decisions =
            evaluate_batch(&candidates, &mut portfolio, &StakingConfig::default(), now()).unwrap();

        let ids: Vec<&str> = decisions.iter().map(|d| d.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["low", "high", "none"]);
        assert_eq!(decisions[2].decision, Decision::Skip);
    }

    #[test]
    fn test_higher_edge_claims_group_capacity_first() {
        // Listed weaker first; the stronger edge must be sized at zero exposure.
        let candidates = vec![
            BetCandidate::new("weak", dec!(0.55), dec!(2.0)).with_group("night"),
            BetCandidate::new("strong", dec!(0.60), dec!(2.0)).with_group("night"),
        ];
        let mut portfolio = PortfolioState::new(dec!(1000));
        let decisions =
            evaluate_batch(&candidates, &mut portfolio, &StakingConfig::default(), now()).unwrap();

        assert_eq!(decisions[1].stake_fraction, dec!(0.05));
        // strong staked 50 -> exposure 0.05 -> multiplier 0.86; 0.025 * 0.86
        assert_eq!(decisions[0].stake_fraction, dec!(0.0215));
    }

    #[test]
    fn test_ties_broken_by_id() {
        let candidates = vec![
            BetCandidate::new("b", dec!(0.55), dec!(2.0)).with_group("g"),
            BetCandidate::new("a", dec!(0.55), dec!(2.0)).with_group("g"),
        ];
        let mut portfolio = PortfolioState::new(dec!(1000));
        let decisions =
            evaluate_batch(&candidates, &mut portfolio, &StakingConfig::default(), now()).unwrap();

        // "a" goes first and gets the undamped stake
        assert_eq!(decisions[1].stake_fraction, dec!(0.025));
        assert!(decisions[0].stake_fraction < dec!(0.025));
    }

    // ==================== Correlation Bookkeeping ====================

    #[test]
    fn test_same_group_second_stake_strictly_smaller() {
        let candidates = vec![
            BetCandidate::new("g1", dec!(0.55), dec!(2.0)).with_group("2024-01-15"),
            BetCandidate::new("g2", dec!(0.55), dec!(2.0)).with_group("2024-01-15"),
        ];
        let mut portfolio = PortfolioState::new(dec!(1000));
        let decisions =
            evaluate_batch(&candidates, &mut portfolio, &StakingConfig::default(), now()).unwrap();

        assert_eq!(decisions[0].decision, Decision::Bet);
        assert_eq!(decisions[1].decision, Decision::Bet);
        assert!(decisions[1].stake_fraction < decisions[0].stake_fraction);
        // 25 staked -> exposure 0.025 -> multiplier 0.93
        assert_eq!(decisions[1].stake_fraction, dec!(0.02325));
    }

    #[test]
    fn test_same_group_smaller_even_when_capped() {
        let candidates = vec![
            BetCandidate::new("a", dec!(0.9), dec!(10.0)).with_group("g"),
            BetCandidate::new("b", dec!(0.9), dec!(10.0)).with_group("g"),
        ];
        let mut portfolio = PortfolioState::new(dec!(1000));
        let decisions =
            evaluate_batch(&candidates, &mut portfolio, &StakingConfig::default(), now()).unwrap();

        assert_eq!(decisions[0].stake_fraction, dec!(0.05));
        assert_eq!(decisions[1].decision, Decision::Bet);
        // 50 staked -> exposure 0.05 -> multiplier 0.86
        assert_eq!(decisions[1].stake_fraction, dec!(0.043));
        assert!(decisions[1].stake_fraction < decisions[0].stake_fraction);
    }

    #[test]
    fn test_uncorrelated_candidates_not_damped() {
        let candidates = vec![
            BetCandidate::new("u1", dec!(0.55), dec!(2.0)),
            BetCandidate::new("u2", dec!(0.55), dec!(2.0)),
        ];
        let mut portfolio = PortfolioState::new(dec!(1000));
        let decisions =
            evaluate_batch(&candidates, &mut portfolio, &StakingConfig::default(), now()).unwrap();

        assert_eq!(decisions[0].stake_fraction, dec!(0.025));
        assert_eq!(decisions[1].stake_fraction, dec!(0.025));
    }

    #[test]
    fn test_skipped_candidate_does_not_consume_capacity() {
        let candidates = vec![
            BetCandidate::new("a-skip", dec!(0.45), dec!(2.0)).with_group("g"),
            BetCandidate::new("b-bet", dec!(0.55), dec!(2.0)).with_group("g"),
        ];
        let mut portfolio = PortfolioState::new(dec!(1000));
        let decisions =
            evaluate_batch(&candidates, &mut portfolio, &StakingConfig::default(), now()).unwrap();

        assert_eq!(decisions[0].decision, Decision::Skip);
        assert_eq!(decisions[1].stake_fraction, dec!(0.025));
    }

    #[test]
    fn test_batch_leaves_portfolio_exposure_untouched() {
        let candidates = vec![BetCandidate::new("a", dec!(0.55), dec!(2.0)).with_group("g")];
        let mut portfolio = PortfolioState::new(dec!(1000));
        let before = portfolio.clone();
        evaluate_batch(&candidates, &mut portfolio, &StakingConfig::default(), now()).unwrap();

        assert_eq!(portfolio, before);
    }

    // ==================== Exposure Cap ====================

    #[test]
    fn test_exposure_cap_trims_then_skips() {
        let config = StakingConfig::default().with_max_total_exposure_fraction(dec!(0.06));
        let candidates = vec![
            BetCandidate::new("a", dec!(0.60), dec!(2.0)),
            BetCandidate::new("b", dec!(0.59), dec!(2.0)),
            BetCandidate::new("c", dec!(0.58), dec!(2.0)),
        ];
        let mut portfolio = PortfolioState::new(dec!(1000));
        let decisions = evaluate_batch(&candidates, &mut portfolio, &config, now()).unwrap();

        // a: 50, b: 45 trimmed to 10, c: nothing left
        assert_eq!(decisions[0].stake_amount, dec!(50));
        assert_eq!(decisions[1].stake_amount, dec!(10));
        assert_eq!(decisions[1].stake_fraction, dec!(0.01));
        assert_eq!(decisions[1].decision, Decision::Bet);
        assert!(decisions[1]
            .reasons
            .iter()
            .any(|r| r.starts_with("trimmed to portfolio exposure cap")));
        assert_eq!(decisions[2].decision, Decision::Skip);
        assert_eq!(decisions[2].stake_amount, dec!(0));
        assert_eq!(
            decisions[2].reasons.last().map(String::as_str),
            Some("portfolio exposure cap reached")
        );
    }

    #[test]
    fn test_existing_exposure_counts_toward_cap() {
        let mut portfolio = PortfolioState::new(dec!(1000));
        portfolio.commit_exposure(Some("yesterday"), dec!(300));
        let candidates = vec![BetCandidate::new("a", dec!(0.60), dec!(2.0))];
        let decisions =
            evaluate_batch(&candidates, &mut portfolio, &StakingConfig::default(), now()).unwrap();

        assert_eq!(decisions[0].decision, Decision::Skip);
    }

    // ==================== Drawdown & Cooldown ====================

    #[test]
    fn test_drawdown_stop_starts_cooldown_for_rest_of_batch() {
        let mut portfolio = PortfolioState::new(dec!(1000));
        portfolio.bankroll = dec!(790);
        let candidates = vec![
            BetCandidate::new("a", dec!(0.55), dec!(2.0)),
            BetCandidate::new("b", dec!(0.60), dec!(2.0)),
            BetCandidate::new("c", dec!(0.58), dec!(2.0)),
        ];
        let decisions =
            evaluate_batch(&candidates, &mut portfolio, &StakingConfig::default(), now()).unwrap();

        // "b" has the best edge and is evaluated first
        assert_eq!(decisions[1].blocked_by, Some(BlockReason::DrawdownStop));
        assert!(decisions[1].reasons[0].starts_with("drawdown stop-loss triggered"));
        assert!(decisions[1].reasons[1].starts_with("cooldown started until"));
        assert_eq!(decisions[0].blocked_by, Some(BlockReason::Cooldown));
        assert_eq!(decisions[2].blocked_by, Some(BlockReason::Cooldown));
        assert!(decisions.iter().all(|d| d.decision == Decision::Blocked));

        assert_eq!(portfolio.cooldown_until, Some(now() + Duration::days(3)));
    }

    #[test]
    fn test_cooldown_persists_across_batches() {
        let mut portfolio = PortfolioState::new(dec!(1000));
        portfolio.bankroll = dec!(750);
        let config = StakingConfig::default();
        let candidates = vec![BetCandidate::new("a", dec!(0.6), dec!(2.0))];
        evaluate_batch(&candidates, &mut portfolio, &config, now()).unwrap();

        // Bankroll recovers but the cooldown still holds
        portfolio.bankroll = dec!(1000);
        let later = now() + Duration::days(1);
        let decisions = evaluate_batch(&candidates, &mut portfolio, &config, later).unwrap();
        assert_eq!(decisions[0].blocked_by, Some(BlockReason::Cooldown));

        let after = now() + Duration::days(3);
        let decisions = evaluate_batch(&candidates, &mut portfolio, &config, after).unwrap();
        assert_eq!(decisions[0].decision, Decision::Bet);
    }

    // ==================== Validation ====================

    #[test]
    fn test_duplicate_ids_rejected() {
        let candidates = vec![
            BetCandidate::new("dup", dec!(0.55), dec!(2.0)),
            BetCandidate::new("dup", dec!(0.60), dec!(2.0)),
        ];
        let mut portfolio = PortfolioState::new(dec!(1000));
        let result = evaluate_batch(&candidates, &mut portfolio, &StakingConfig::default(), now());
        assert_eq!(
            result,
            Err(InvalidInputError::DuplicateCandidate("dup".to_string()))
        );
    }

    #[test]
    fn test_invalid_candidate_rejects_whole_batch() {
        let mut portfolio = PortfolioState::new(dec!(1000));
        portfolio.bankroll = dec!(700);
        let candidates = vec![
            BetCandidate::new("ok", dec!(0.55), dec!(2.0)),
            BetCandidate::new("bad", dec!(0.55), dec!(0.9)),
        ];
        let result = evaluate_batch(&candidates, &mut portfolio, &StakingConfig::default(), now());

        assert!(matches!(result, Err(InvalidInputError::Price { .. })));
        // Nothing evaluated, so no cooldown was started
        assert!(portfolio.cooldown_until.is_none());
    }

    #[test]
    fn test_empty_batch() {
        let mut portfolio = PortfolioState::new(dec!(1000));
        let decisions =
            evaluate_batch(&[], &mut portfolio, &StakingConfig::default(), now()).unwrap();
        assert!(decisions.is_empty());
    }

    // ==================== Settlement ====================

    #[test]
    fn test_win_adds_net_profit_and_resets_streak() {
        let mut portfolio = PortfolioState::new(dec!(1000));
        portfolio.consecutive_losses = 3;
        let portfolio = record_settlement(portfolio, BetResult::Win, dec!(10), dec!(25)).unwrap();

        assert_eq!(portfolio.bankroll, dec!(1015));
        assert_eq!(portfolio.consecutive_losses, 0);
        assert_eq!(portfolio.initial_bankroll, dec!(1000));
    }

    #[test]
    fn test_loss_subtracts_stake_and_extends_streak() {
        let portfolio = PortfolioState::new(dec!(1000));
        let portfolio = record_settlement(portfolio, BetResult::Loss, dec!(10), dec!(0)).unwrap();

        assert_eq!(portfolio.bankroll, dec!(990));
        assert_eq!(portfolio.consecutive_losses, 1);
    }

    #[test]
    fn test_loss_ignores_payout() {
        let portfolio = PortfolioState::new(dec!(1000));
        let portfolio = record_settlement(portfolio, BetResult::Loss, dec!(10), dec!(99)).unwrap();
        assert_eq!(portfolio.bankroll, dec!(990));
    }

    #[test]
    fn test_settlement_sequence_conserves_bankroll() {
        let mut portfolio = PortfolioState::new(dec!(1000));
        let sequence = [
            (BetResult::Win, dec!(10), dec!(25)),
            (BetResult::Loss, dec!(10), dec!(0)),
            (BetResult::Loss, dec!(20), dec!(0)),
            (BetResult::Win, dec!(40), dec!(76)),
        ];
        for (result, stake, payout) in sequence {
            let before = portfolio.bankroll;
            portfolio = record_settlement(portfolio, result, stake, payout).unwrap();
            let expected = match result {
                BetResult::Win => before + payout - stake,
                BetResult::Loss => before - stake,
            };
            assert_eq!(portfolio.bankroll, expected);
        }
        assert_eq!(portfolio.bankroll, dec!(1021));
        assert_eq!(portfolio.consecutive_losses, 0);
    }

    #[test]
    fn test_negative_settlement_amounts_rejected() {
        let portfolio = PortfolioState::new(dec!(1000));
        let result = record_settlement(portfolio, BetResult::Win, dec!(-1), dec!(0));
        assert!(matches!(result, Err(InvalidInputError::Settlement { .. })));
    }

    #[test]
    fn test_loss_of_whole_bankroll_blocks_instead_of_failing() {
        let portfolio = PortfolioState::new(dec!(100));
        let mut portfolio =
            record_settlement(portfolio, BetResult::Loss, dec!(100), dec!(0)).unwrap();
        assert_eq!(portfolio.bankroll, dec!(0));

        let candidates = vec![BetCandidate::new("a", dec!(0.6), dec!(2.0))];
        let decisions =
            evaluate_batch(&candidates, &mut portfolio, &StakingConfig::default(), now()).unwrap();

        assert_eq!(decisions[0].decision, Decision::Blocked);
        assert_eq!(decisions[0].blocked_by, Some(BlockReason::DrawdownStop));
        assert!(portfolio.cooldown_until.is_some());
    }

    #[test]
    fn test_loss_beyond_bankroll_rejected() {
        let portfolio = PortfolioState::new(dec!(100));
        let result = record_settlement(portfolio, BetResult::Loss, dec!(100.01), dec!(0));
        assert_eq!(
            result,
            Err(InvalidInputError::StakeExceedsBankroll {
                stake: dec!(100.01),
                bankroll: dec!(100),
            })
        );
    }

    #[test]
    fn test_losing_streak_blocks_next_batch() {
        let mut portfolio = PortfolioState::new(dec!(1000));
        for _ in 0..5 {
            portfolio = record_settlement(portfolio, BetResult::Loss, dec!(1), dec!(0)).unwrap();
        }
        let candidates = vec![BetCandidate::new("a", dec!(0.6), dec!(2.0))];
        let decisions =
            evaluate_batch(&candidates, &mut portfolio, &StakingConfig::default(), now()).unwrap();
        assert_eq!(decisions[0].blocked_by, Some(BlockReason::LossStreak));
        // Losing streak blocks without a cooldown
        assert!(portfolio.cooldown_until.is_none());
    }
}
