//! Bankroll and exposure state carried across evaluation calls.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::InvalidInputError;

/// Exposure key for stakes without a correlation group.
pub const UNCORRELATED_KEY: &str = "";

/// Mutable state of one bankroll within a session.
///
/// Owned by exactly one logical session at a time. The engine only reads it;
/// [`crate::monitor::record_settlement`] is the single writer of `bankroll`
/// and `consecutive_losses`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioState {
    /// Current risk capital.
    pub bankroll: Decimal,
    /// Bankroll at session start, used for drawdown.
    pub initial_bankroll: Decimal,
    /// Committed stake per correlation group.
    #[serde(default)]
    pub open_exposure_by_group: HashMap<String, Decimal>,
    /// Current losing streak.
    #[serde(default)]
    pub consecutive_losses: u32,
    /// New stakes are refused until this instant.
    #[serde(default)]
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl PortfolioState {
    /// Starts a session with `bankroll` as both current and initial capital.
    #[must_use]
    pub fn new(bankroll: Decimal) -> Self {
        Self {
            bankroll,
            initial_bankroll: bankroll,
            open_exposure_by_group: HashMap::new(),
            consecutive_losses: 0,
            cooldown_until: None,
        }
    }

    /// Checks the bankroll and exposure invariants.
    ///
    /// A bankroll of zero is valid: it is a full drawdown, which the engine
    /// reports as a block rather than an error.
    ///
    /// # Errors
    /// Returns [`InvalidInputError`] for a negative bankroll, a non-positive
    /// initial bankroll or a negative group exposure.
    pub fn validate(&self) -> Result<(), InvalidInputError> {
        if self.bankroll < Decimal::ZERO {
            return Err(InvalidInputError::Bankroll(self.bankroll));
        }
        if self.initial_bankroll <= Decimal::ZERO {
            return Err(InvalidInputError::InitialBankroll(self.initial_bankroll));
        }
        if let Some((group, value)) = self
            .open_exposure_by_group
            .iter()
            .find(|(_, value)| **value < Decimal::ZERO)
        {
            return Err(InvalidInputError::Exposure {
                group: group.clone(),
                value: *value,
            });
        }
        Ok(())
    }

    /// Fraction of the initial bankroll lost so far. Negative when in profit.
    #[must_use]
    pub fn drawdown(&self) -> Decimal {
        if self.initial_bankroll <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.initial_bankroll - self.bankroll) / self.initial_bankroll
    }

    /// Open exposure for a group; zero for uncorrelated (`None` or empty) groups.
    #[must_use]
    pub fn exposure_for(&self, group: Option<&str>) -> Decimal {
        match group {
            Some(g) if !g.is_empty() => self
                .open_exposure_by_group
                .get(g)
                .copied()
                .unwrap_or(Decimal::ZERO),
            _ => Decimal::ZERO,
        }
    }

    /// Sum of open exposure across all groups.
    #[must_use]
    pub fn total_exposure(&self) -> Decimal {
        self.open_exposure_by_group
            .values()
            .fold(Decimal::ZERO, |total, open| total.saturating_add(*open))
    }

    /// Returns true while a cooldown is set and `now` is before its end.
    #[must_use]
    pub fn is_cooling_down(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.is_some_and(|until| until > now)
    }

    /// Records stake placed in a group. Uncorrelated stake is kept under
    /// [`UNCORRELATED_KEY`] so it counts toward [`Self::total_exposure`] without
    /// penalising any group.
    pub fn commit_exposure(&mut self, group: Option<&str>, amount: Decimal) {
        let open = self
            .open_exposure_by_group
            .entry(group.unwrap_or(UNCORRELATED_KEY).to_string())
            .or_insert(Decimal::ZERO);
        *open = open.saturating_add(amount.max(Decimal::ZERO));
    }

    /// Releases settled stake from a group, flooring at zero and dropping
    /// groups that become empty.
    pub fn release_exposure(&mut self, group: Option<&str>, amount: Decimal) {
        let key = group.unwrap_or(UNCORRELATED_KEY);
        let remaining = match self.open_exposure_by_group.get_mut(key) {
            Some(open) => {
                *open = (*open - amount.max(Decimal::ZERO)).max(Decimal::ZERO);
                *open
            }
            None => return,
        };
        if remaining.is_zero() {
            self.open_exposure_by_group.remove(key);
        }
    }

    /// Operator override: lifts an active cooldown.
    pub fn clear_cooldown(&mut self) {
        self.cooldown_until = None;
    }

    /// Operator override: forgets the current losing streak.
    pub fn reset_loss_streak(&mut self) {
        self.consecutive_losses = 0;
    }
}
