//! Evaluate CLI command.
//!
//! Sizes a slate of candidates against a saved portfolio and prints the
//! decisions as JSON on stdout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use edge_stake_core::{
    evaluate_batch, BetCandidate, PortfolioState, StakingConfig, StakingDecision,
};

use super::load_config;
use crate::state_file::{read_json, write_json};

/// Arguments for the evaluate command.
#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// Portfolio state JSON file
    #[arg(long)]
    pub portfolio: PathBuf,

    /// JSON array of bet candidates
    #[arg(long)]
    pub candidates: PathBuf,

    /// Staking config file path
    #[arg(short, long, default_value = "config/Staking.toml")]
    pub config: PathBuf,

    /// Config profile overlay (e.g. "conservative")
    #[arg(long, env = "STAKING_PROFILE")]
    pub profile: Option<String>,

    /// Evaluation time in RFC 3339 format (defaults to now)
    #[arg(long)]
    pub now: Option<String>,

    /// Write the portfolio back if a cooldown was started
    #[arg(long)]
    pub write_portfolio: bool,

    /// Record every BET's stake as open exposure and write the portfolio back
    #[arg(long)]
    pub commit: bool,
}

/// Runs the evaluate command.
///
/// # Errors
/// Returns an error if an input file cannot be read, the config is invalid or
/// a candidate is malformed.
pub fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let config = load_config(&args.config, args.profile.as_deref())?;
    let mut portfolio: PortfolioState = read_json(&args.portfolio)?;
    let candidates: Vec<BetCandidate> = read_json(&args.candidates)?;
    let now = parse_now(args.now.as_deref())?;

    let cooldown_before = portfolio.cooldown_until;
    let decisions = evaluate_slate(&candidates, &mut portfolio, &config, now, args.commit)?;

    println!("{}", serde_json::to_string_pretty(&decisions)?);

    let cooldown_started = portfolio.cooldown_until != cooldown_before;
    if args.commit || (args.write_portfolio && cooldown_started) {
        write_json(&args.portfolio, &portfolio)?;
        tracing::info!(
            path = %args.portfolio.display(),
            open_exposure = %portfolio.total_exposure(),
            cooldown_until = ?portfolio.cooldown_until,
            "Portfolio updated"
        );
    }

    Ok(())
}

/// Runs the batch and, when `commit` is set, books each BET's stake under its
/// correlation group.
pub(crate) fn evaluate_slate(
    candidates: &[BetCandidate],
    portfolio: &mut PortfolioState,
    config: &StakingConfig,
    now: DateTime<Utc>,
    commit: bool,
) -> Result<Vec<StakingDecision>> {
    let decisions = evaluate_batch(candidates, portfolio, config, now)
        .context("candidate slate rejected")?;

    if commit {
        for (candidate, decision) in candidates.iter().zip(&decisions) {
            if decision.is_bet() {
                portfolio.commit_exposure(candidate.group(), decision.stake_amount);
            }
        }
    }

    Ok(decisions)
}

/// Parses an RFC 3339 timestamp, falling back to the current time.
pub(crate) fn parse_now(raw: Option<&str>) -> Result<DateTime<Utc>> {
    match raw {
        Some(s) => Ok(DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("invalid --now timestamp: {s}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}
