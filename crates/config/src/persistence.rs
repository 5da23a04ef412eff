// crates/config/src/persistence.rs
//! Reading and atomically replacing the config file

use crate::{Config, ConfigError, ConfigResult, CONFIG_VERSION, ENV_PREFIX};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Reads the file at `path`, `None` if there is none
///
/// Tables and keys missing from the file take their defaults, so an empty
/// file reads as the default config.
pub(crate) fn read(path: &Path) -> ConfigResult<Option<Config>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if config.version > CONFIG_VERSION {
        log::warn!(
            "{} has format version {}, newer than {}; unknown keys are ignored",
            path.display(),
            config.version,
            CONFIG_VERSION
        );
    }
    Ok(Some(config))
}

/// Replaces the file at `path` with `config`
///
/// The new contents go to a temporary file in the same directory which is
/// then renamed over the old one, so readers see either version whole.
pub(crate) fn write(path: &Path, config: &Config) -> ConfigResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(write_err)?;
    let text = render(config)?;

    let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
    temp.write_all(text.as_bytes()).map_err(write_err)?;
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;

    log::debug!("Wrote config to {}", path.display());
    Ok(())
}

fn render(config: &Config) -> ConfigResult<String> {
    Ok(format!(
        "# Rampart resilience settings\n\
         # Any value can be overridden with {}<TABLE>_<KEY>, e.g. {}RETRY_MAX_RETRIES=5\n\n{}",
        ENV_PREFIX,
        ENV_PREFIX,
        toml::to_string_pretty(config)?
    ))
}
