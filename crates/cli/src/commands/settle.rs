//! Settle CLI command.
//!
//! Applies a resolved bet to the saved portfolio and releases its exposure.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};
use edge_stake_core::{record_settlement, BetResult, PortfolioState, UNCORRELATED_KEY};
use rust_decimal::Decimal;

use crate::state_file::{read_json, write_json};

/// Outcome accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultArg {
    Win,
    Loss,
}

impl From<ResultArg> for BetResult {
    fn from(arg: ResultArg) -> Self {
        match arg {
            ResultArg::Win => BetResult::Win,
            ResultArg::Loss => BetResult::Loss,
        }
    }
}

/// Arguments for the settle command.
#[derive(Args, Debug, Clone)]
pub struct SettleArgs {
    /// Portfolio state JSON file, rewritten in place
    #[arg(long)]
    pub portfolio: PathBuf,

    /// Bet outcome
    #[arg(long, value_enum)]
    pub result: ResultArg,

    /// Amount staked
    #[arg(long)]
    pub stake: Decimal,

    /// Gross return including stake (ignored on a loss)
    #[arg(long, default_value = "0")]
    pub payout: Decimal,

    /// Correlation group the stake was committed under
    #[arg(long)]
    pub group: Option<String>,
}

/// Runs the settle command.
///
/// # Errors
/// Returns an error if the portfolio file cannot be read or written, the
/// amounts are negative or the loss exceeds the bankroll.
pub fn run_settle(args: SettleArgs) -> Result<()> {
    let portfolio: PortfolioState = read_json(&args.portfolio)?;
    let settled = apply_settlement(
        portfolio,
        args.result.into(),
        args.stake,
        args.payout,
        args.group.as_deref(),
    )?;
    write_json(&args.portfolio, &settled)?;

    println!("{}", serde_json::to_string_pretty(&settled)?);
    Ok(())
}

/// Records the settlement and releases the stake from its exposure group.
pub(crate) fn apply_settlement(
    portfolio: PortfolioState,
    result: BetResult,
    stake: Decimal,
    payout: Decimal,
    group: Option<&str>,
) -> Result<PortfolioState> {
    let mut settled = record_settlement(portfolio, result, stake, payout)?;

    let key = group.unwrap_or(UNCORRELATED_KEY);
    let open = settled
        .open_exposure_by_group
        .get(key)
        .copied()
        .unwrap_or(Decimal::ZERO);
    if open < stake {
        tracing::warn!(
            group = key,
            %open,
            %stake,
            "Settled stake exceeds open exposure"
        );
    }

    settled.release_exposure(group, stake);
    Ok(settled)
}
