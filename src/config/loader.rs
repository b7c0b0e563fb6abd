// src/config/loader.rs

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::model::{Config, RawConfig};
use crate::errors::Result;

/// File name looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "assetdag.toml";

/// Load a configuration file from a given path and return the raw `RawConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and resolve it against the current
/// process environment.
///
/// The project root is the directory holding the config file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    Config::resolve(raw, config_root_dir(path), &process_env())
}

/// Resolve the configuration used by the CLI.
///
/// - An explicit `--config` path must exist.
/// - Without one, `assetdag.toml` in the working directory is used if present,
///   otherwise the conventional layout defaults apply.
pub fn load_for_cli(explicit: Option<&str>) -> Result<Config> {
    match explicit {
        Some(path) => {
            info!(config = %path, "loading configuration");
            load_and_validate(path)
        }
        None => {
            let path = default_config_path();
            if path.is_file() {
                info!(config = ?path, "loading configuration");
                load_and_validate(&path)
            } else {
                debug!("no {DEFAULT_CONFIG_FILE} found; using default layout");
                Config::resolve(RawConfig::default(), cwd(), &process_env())
            }
        }
    }
}

/// Helper to resolve a default config path.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Snapshot of the process environment for [`Config::resolve`].
pub fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Figure out the project root for a config path.
///
/// - If the config path has a non-empty parent (e.g. "web/assetdag.toml"),
///   we use that directory.
/// - If it's just a bare filename like "assetdag.toml" (parent = ""),
///   we fall back to the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => cwd(),
    }
}

fn cwd() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
