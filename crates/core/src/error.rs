//! Input validation errors.
//!
//! Only malformed inputs are errors. "Don't bet" outcomes are reported as
//! [`crate::Decision::Skip`] or [`crate::Decision::Blocked`] with reasons.

use rust_decimal::Decimal;
use thiserror::Error;

/// A caller supplied a value outside the domain the engine accepts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidInputError {
    /// Win probability must lie strictly between 0 and 1.
    #[error("probability must be in (0, 1), got {value} for candidate {candidate_id}")]
    Probability {
        /// Candidate the value belongs to.
        candidate_id: String,
        /// Offending value.
        value: Decimal,
    },

    /// Decimal odds must be strictly greater than 1.0.
    #[error("price must be > 1.0, got {value} for candidate {candidate_id}")]
    Price {
        /// Candidate the value belongs to.
        candidate_id: String,
        /// Offending value.
        value: Decimal,
    },

    /// Current bankroll can never be negative.
    #[error("bankroll must be >= 0, got {0}")]
    Bankroll(Decimal),

    /// Starting bankroll must be positive.
    #[error("initial bankroll must be > 0, got {0}")]
    InitialBankroll(Decimal),

    /// Committed exposure can never be negative.
    #[error("exposure for group {group} must be >= 0, got {value}")]
    Exposure {
        /// Correlation group key.
        group: String,
        /// Offending value.
        value: Decimal,
    },

    /// Candidate ids must be unique within one batch.
    #[error("duplicate candidate id in batch: {0}")]
    DuplicateCandidate(String),

    /// Settlement stake and payout must be non-negative.
    #[error("settlement amounts must be >= 0, got stake={stake} payout={payout}")]
    Settlement {
        /// Stake that was risked.
        stake: Decimal,
        /// Gross amount returned.
        payout: Decimal,
    },

    /// A settlement would leave a negative bankroll.
    #[error("settlement of stake={stake} exceeds bankroll {bankroll}")]
    StakeExceedsBankroll {
        /// Stake that was risked.
        stake: Decimal,
        /// Bankroll before settlement.
        bankroll: Decimal,
    },

    /// Odds in another format could not be converted.
    #[error("cannot convert odds: {0}")]
    Odds(String),
}
