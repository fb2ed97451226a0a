//! Configuration file discovery and root folder resolution
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config file (`~/.config/tunetag/<module>.toml`)
//! 4. System config file (`/etc/tunetag/<module>.toml`, Linux only)
//!
//! A missing config file is not an error: callers fall back to compiled
//! defaults. An explicitly requested file (CLI or ENV) that does not exist is.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TUNETAG_CONFIG";

/// Environment variable naming the data root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "TUNETAG_ROOT_FOLDER";

/// Locate the TOML config file for `module_name`.
///
/// Returns `Ok(None)` when no file was requested and none of the default
/// locations exist.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    module_name: &str,
) -> Result<Option<PathBuf>> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return explicit_path(path.to_path_buf(), "command line");
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return explicit_path(PathBuf::from(path), env_var_name);
        }
    }

    // Priority 3/4: Platform default locations
    Ok(default_config_candidates(module_name)
        .into_iter()
        .find(|candidate| candidate.exists()))
}

fn explicit_path(path: PathBuf, source: &str) -> Result<Option<PathBuf>> {
    if path.exists() {
        Ok(Some(path))
    } else {
        Err(Error::Config(format!(
            "Config file from {} not found: {}",
            source,
            path.display()
        )))
    }
}

/// Default config file locations for the platform, in priority order
pub fn default_config_candidates(module_name: &str) -> Vec<PathBuf> {
    let file_name = format!("{}.toml", module_name);
    let mut candidates = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("tunetag").join(&file_name));
    }
    if cfg!(target_os = "linux") {
        candidates.push(PathBuf::from("/etc/tunetag").join(&file_name));
    }

    candidates
}

/// Load and parse a TOML config file, or compiled defaults when `path` is `None`.
///
/// **Graceful degradation:** a missing file yields a warning and defaults;
/// a file that exists but fails to parse is a hard error.
pub fn load_toml_config<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        warn!("No config file found, using compiled defaults");
        return Ok(T::default());
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Root folder resolution:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: OS-dependent compiled default
    default_root_folder()
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/tunetag (or /var/lib/tunetag for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("tunetag"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/tunetag"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/tunetag
        dirs::data_dir()
            .map(|d| d.join("tunetag"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/tunetag"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\tunetag
        dirs::data_local_dir()
            .map(|d| d.join("tunetag"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\tunetag"))
    } else {
        PathBuf::from("./tunetag_data")
    }
}
