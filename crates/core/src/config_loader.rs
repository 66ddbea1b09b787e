use crate::config::AppConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;
use tracing::debug;

/// Default location of the TOML configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be parsed or fails validation.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Loads configuration by merging defaults, the TOML file at `path`,
    /// `FHQ_`-prefixed environment variables, and finally `DATABASE_URL`.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be parsed or fails validation.
    pub fn load_from(path: &Path) -> Result<AppConfig> {
        let config: AppConfig = Self::figment(path)
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

        config.validate()?;
        debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("FHQ_").split("__"))
            .merge(
                Env::raw()
                    .only(&["DATABASE_URL"])
                    .map(|_| "database.url".into()),
            )
    }
}
