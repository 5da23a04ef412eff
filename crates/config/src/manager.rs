// crates/config/src/manager.rs
//! Locating, loading and saving the Rampart config file

use crate::error::ValidationError;
use crate::{persistence, Config, ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const FILE_NAME: &str = "config.toml";

/// Owns the path of one config file
///
/// Two views of the file are offered. [`ConfigManager::stored`] is what the
/// file says, for editing it. [`ConfigManager::load`] is what the process
/// runs with: the file, then `RAMPART_*` overrides, then validation.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Uses `config.toml` in the platform config directory
    /// (`~/.config/rampart` on Linux)
    pub fn new() -> ConfigResult<Self> {
        let dirs = ProjectDirs::from("", "", "rampart").ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::with_directory(dirs.config_dir()))
    }

    /// Uses `config.toml` inside `dir`, which need not exist yet
    pub fn with_directory(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(FILE_NAME),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.path
    }

    /// The file's values, defaults if there is no file
    ///
    /// Neither overrides nor validation are applied.
    pub fn stored(&self) -> ConfigResult<Config> {
        Ok(persistence::read(&self.path)?.unwrap_or_default())
    }

    /// The effective config for this process
    pub fn load(&self) -> ConfigResult<Config> {
        self.load_with_vars(std::env::vars())
    }

    /// The stored config with overrides taken from `vars`, validated
    ///
    /// Fails on the first unparseable override, or with every invalid
    /// value at once.
    pub fn load_with_vars<I, K, V>(&self, vars: I) -> ConfigResult<Config>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = self.stored()?;
        config.apply_env_overrides(vars)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Problems with the stored values, empty if there are none
    pub fn validate(&self) -> ConfigResult<Vec<ValidationError>> {
        Ok(self.stored()?.validate().err().unwrap_or_default())
    }

    /// Validates `config` and replaces the file with it
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        config.validate().map_err(ConfigError::Invalid)?;
        persistence::write(&self.path, config)
    }

    /// Edits the stored values in place
    ///
    /// ```rust,no_run
    /// # use rampart_config::ConfigManager;
    /// # fn main() -> rampart_config::ConfigResult<()> {
    /// let manager = ConfigManager::new()?;
    /// manager.update(|config| config.availability.cooldown_secs = 120)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn update(&self, edit: impl FnOnce(&mut Config)) -> ConfigResult<()> {
        let mut config = self.stored()?;
        edit(&mut config);
        self.save(&config)
    }

    /// Writes a default file unless one exists; returns whether it wrote
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        persistence::write(&self.path, &Config::default())?;
        log::info!("Created default config at {}", self.path.display());
        Ok(true)
    }

    /// Overwrites the file with defaults
    pub fn reset(&self) -> ConfigResult<()> {
        persistence::write(&self.path, &Config::default())?;
        log::info!("Reset {} to defaults", self.path.display());
        Ok(())
    }
}
