//! Bootstrap configuration loading and root folder resolution
//!
//! Resolution priority for every bootstrap setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is not fatal: the service logs a warning and starts
//! with built-in defaults. A TOML file that exists but fails to parse is.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "TOKWAV_ROOT_FOLDER";

/// Environment variable pointing at an explicit TOML config file
pub const CONFIG_FILE_ENV: &str = "TOKWAV_CONFIG";

/// Resolve the root folder (blob buckets and database live under it).
///
/// `cli_arg` wins, then [`ROOT_FOLDER_ENV`], then the value read from TOML,
/// then the OS default from [`default_root_folder`].
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_value: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    default_root_folder()
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/tokwav (or /var/lib/tokwav for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("tokwav"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/tokwav"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("tokwav"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/tokwav"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("tokwav"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\tokwav"))
    } else {
        PathBuf::from("./tokwav_data")
    }
}

/// Locate the default configuration file for the platform, if one exists.
///
/// Linux checks `~/.config/tokwav/config.toml` then `/etc/tokwav/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("tokwav").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/tokwav/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load a TOML bootstrap file into `T`.
///
/// - `explicit` (CLI or [`CONFIG_FILE_ENV`]) must exist, otherwise it is an error.
/// - Without an explicit path the platform default is tried; when that is
///   absent too, `T::default()` is returned.
pub fn load_toml_config<T>(explicit: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let env_path = std::env::var(CONFIG_FILE_ENV)
        .ok()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from);

    let path = match explicit.map(Path::to_path_buf).or(env_path) {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path
        }
        None => match default_config_path() {
            Some(path) => path,
            None => {
                warn!("No config file found, using built-in defaults");
                return Ok(T::default());
            }
        },
    };

    info!("Loading configuration from {}", path.display());
    parse_toml_file(&path)
}

/// Parse a TOML file that is known to exist
pub fn parse_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

/// Create a directory (and parents) if missing
pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
        info!("Created directory: {}", path.display());
    }
    Ok(())
}
