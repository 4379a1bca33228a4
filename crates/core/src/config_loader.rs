use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::config::StakingConfig;

/// Environment variable prefix for overrides, e.g. `EDGE_STAKE_KELLY_MULTIPLIER`.
pub const ENV_PREFIX: &str = "EDGE_STAKE_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads staking configuration by layering defaults, a TOML file and
    /// environment variables, then validates the result.
    ///
    /// A missing file is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<StakingConfig> {
        Self::extract(Self::layered(path.as_ref(), None))
    }

    /// Loads staking configuration with a profile overlay such as
    /// `config/Staking.conservative.toml` next to the base file.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be parsed or a value is out of range.
    pub fn load_with_profile(path: impl AsRef<Path>, profile: &str) -> Result<StakingConfig> {
        Self::extract(Self::layered(path.as_ref(), Some(profile)))
    }

    /// Defaults, then the file, then the profile file, then the environment.
    fn layered(path: &Path, profile: Option<&str>) -> Figment {
        let mut figment =
            Figment::from(Serialized::defaults(StakingConfig::default())).merge(Toml::file(path));
        if let Some(profile) = profile {
            figment = figment.merge(Toml::file(profile_path(path, profile)));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    fn extract(figment: Figment) -> Result<StakingConfig> {
        let config: StakingConfig = figment.extract()?;
        config.validate()?;
        tracing::debug!(?config, "Staking config loaded");
        Ok(config)
    }
}

fn profile_path(path: &Path, profile: &str) -> std::path::PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Staking");
    path.with_file_name(format!("{stem}.{profile}.toml"))
}
