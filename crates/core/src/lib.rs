//! Edge detection, fractional Kelly staking and portfolio risk controls.
//!
//! [`evaluate`] turns one [`BetCandidate`] into a [`StakingDecision`] against a
//! read-only [`PortfolioState`]. [`evaluate_batch`] ranks a slate of candidates,
//! applies the portfolio exposure cap and starts cooldowns; [`record_settlement`]
//! folds a settled bet back into the state.
//!
//! ```
//! use chrono::Utc;
//! use edge_stake_core::{evaluate, BetCandidate, Decision, PortfolioState, StakingConfig};
//! use rust_decimal_macros::dec;
//!
//! let candidate = BetCandidate::new("c1", dec!(0.60), dec!(2.00));
//! let portfolio = PortfolioState::new(dec!(1000));
//! let decision = evaluate(&candidate, &portfolio, &StakingConfig::default(), Utc::now()).unwrap();
//!
//! assert_eq!(decision.decision, Decision::Bet);
//! assert_eq!(decision.stake_amount, dec!(50));
//! ```

pub mod candidate;
pub mod config;
pub mod config_loader;
pub mod correlation;
pub mod engine;
pub mod error;
pub mod kelly;
pub mod monitor;
pub mod odds;
pub mod portfolio;

pub use candidate::BetCandidate;
pub use config::StakingConfig;
pub use config_loader::ConfigLoader;
pub use correlation::{CorrelationPenaltyCurve, CurvePoint};
pub use engine::{evaluate, BlockReason, Decision, StakingDecision};
pub use error::InvalidInputError;
pub use monitor::{evaluate_batch, record_settlement, BetResult};
pub use portfolio::{PortfolioState, UNCORRELATED_KEY};
