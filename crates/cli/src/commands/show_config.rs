use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use super::load_config;

/// Arguments for the show-config command.
#[derive(Args, Debug, Clone)]
pub struct ShowConfigArgs {
    /// Staking config file path
    #[arg(short, long, default_value = "config/Staking.toml")]
    pub config: PathBuf,

    /// Config profile overlay
    #[arg(long, env = "STAKING_PROFILE")]
    pub profile: Option<String>,
}

/// Prints the effective configuration after file, profile and environment
/// layers are merged.
///
/// # Errors
/// Returns an error if the config cannot be parsed or fails validation.
pub fn run_show_config(args: ShowConfigArgs) -> Result<()> {
    let config = load_config(&args.config, args.profile.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
