use std::path::{Path, PathBuf};

use tracing::debug;

use crate::app_dirs;
use crate::store::atomic_write;

use super::{CONFIG_FILE_NAME, ConfigError, PackerConfig};

/// Default config location inside the application directory.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(|err| match err {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    })?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load the default config file, or defaults when it does not exist.
pub fn load_or_default() -> Result<PackerConfig, ConfigError> {
    load_from(&config_path()?)
}

/// Load `path`, returning defaults when the file is missing.
///
/// Relative roots in the file are resolved against the file's directory.
pub fn load_from(path: &Path) -> Result<PackerConfig, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Config file missing, using defaults");
            return Ok(PackerConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let config: PackerConfig = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(config.resolved_against(base).normalized())
}

/// Write `config` to `path` as TOML, replacing the file atomically.
pub fn save_to_path(config: &PackerConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, data.as_bytes()).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
