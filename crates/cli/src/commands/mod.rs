//! CLI commands for the staking engine.

pub mod evaluate;
pub mod settle;
pub mod show_config;

pub use evaluate::{run_evaluate, EvaluateArgs};
pub use settle::{run_settle, SettleArgs};
pub use show_config::{run_show_config, ShowConfigArgs};

use std::path::Path;

use anyhow::Result;
use edge_stake_core::{ConfigLoader, StakingConfig};

/// Loads staking config from `path`, with an optional profile overlay.
pub(crate) fn load_config(path: &Path, profile: Option<&str>) -> Result<StakingConfig> {
    match profile {
        Some(profile) => ConfigLoader::load_with_profile(path, profile),
        None => ConfigLoader::load(path),
    }
}
