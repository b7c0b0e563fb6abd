// src/config/validate.rs

use std::collections::HashMap;
use std::path::PathBuf;

use globset::Glob;

use crate::config::model::{Config, RawConfig};
use crate::errors::{AssetdagError, Result};

/// Environment variable overriding `server.default_port`.
pub const PORT_ENV_VAR: &str = "PORT";

impl Config {
    /// Resolve a raw config into the immutable [`Config`].
    ///
    /// Pure function of the raw sections, the project root and the given
    /// environment snapshot; nothing is read from the process environment.
    pub fn resolve(
        raw: RawConfig,
        root: impl Into<PathBuf>,
        env: &HashMap<String, String>,
    ) -> Result<Config> {
        validate_raw_config(&raw)?;
        let port = resolve_port(&raw, env)?;
        Ok(Config::new_unchecked(raw, root.into(), port))
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = AssetdagError;

    /// Resolve against the current directory with an empty environment.
    fn try_from(raw: RawConfig) -> std::result::Result<Self, Self::Error> {
        Config::resolve(raw, ".", &HashMap::new())
    }
}

fn validate_raw_config(cfg: &RawConfig) -> Result<()> {
    ensure_required_paths(cfg)?;
    validate_globs(cfg)?;
    validate_bundle_names(cfg)?;
    validate_server(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> AssetdagError {
    AssetdagError::ConfigError(msg.into())
}

fn ensure_required_paths(cfg: &RawConfig) -> Result<()> {
    let required = [
        ("paths.index", &cfg.paths.index),
        ("paths.temp", &cfg.paths.temp),
        ("paths.build", &cfg.paths.build),
        ("paths.client", &cfg.paths.client),
        ("server.entry", &cfg.server.entry),
        ("server.command", &cfg.server.command),
        ("template_cache.file", &cfg.template_cache.file),
        ("optimized.manifest", &cfg.optimized.manifest),
    ];

    for (key, value) in required {
        if value.trim().is_empty() {
            return Err(config_error(format!("[{key}] must not be empty")));
        }
    }

    if cfg.paths.temp.trim_end_matches('/') == cfg.paths.build.trim_end_matches('/') {
        return Err(config_error(
            "[paths].temp and [paths].build must be different directories",
        ));
    }

    Ok(())
}

fn validate_globs(cfg: &RawConfig) -> Result<()> {
    let lists = [
        ("paths.alljs", &cfg.paths.alljs),
        ("paths.js", &cfg.paths.js),
        ("paths.less", &cfg.paths.less),
        ("paths.html", &cfg.paths.html),
        ("paths.html_templates", &cfg.paths.html_templates),
        ("paths.images", &cfg.paths.images),
        ("paths.fonts", &cfg.paths.fonts),
        ("server.watch", &cfg.server.watch),
    ];

    for (key, patterns) in lists {
        for pat in patterns {
            let pat = pat.strip_prefix('!').unwrap_or(pat);
            Glob::new(pat).map_err(|e| {
                config_error(format!("[{key}] has an invalid glob '{pat}': {e}"))
            })?;
        }
    }

    Ok(())
}

/// The vendor and application bundles are partitions of the same asset set:
/// no file name may be claimed by both filters.
fn validate_bundle_names(cfg: &RawConfig) -> Result<()> {
    let app = cfg.optimized.app.trim();
    let lib = cfg.optimized.lib.trim();

    if app.is_empty() || lib.is_empty() {
        return Err(config_error(
            "[optimized].app and [optimized].lib must not be empty",
        ));
    }

    if app == lib {
        return Err(config_error(format!(
            "[optimized].app and [optimized].lib are both '{app}'"
        )));
    }

    let app_filter = compile(&format!("**/{app}"))?;
    let lib_filter = compile(&format!("**/{lib}"))?;

    if lib_filter.is_match(app) || app_filter.is_match(lib) {
        return Err(config_error(format!(
            "[optimized] filters overlap: '{app}' and '{lib}' would match the same bundle"
        )));
    }

    Ok(())
}

fn compile(pattern: &str) -> Result<globset::GlobMatcher> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| config_error(format!("invalid glob '{pattern}': {e}")))
}

fn validate_server(cfg: &RawConfig) -> Result<()> {
    if cfg.server.default_port == 0 {
        return Err(config_error("[server].default_port must be > 0"));
    }
    if cfg.server.test_port == 0 {
        return Err(config_error("[server].test_port must be > 0"));
    }
    if cfg.server.test_port == cfg.server.default_port {
        return Err(config_error(format!(
            "[server].test_port must differ from default_port (both {})",
            cfg.server.test_port
        )));
    }
    Ok(())
}

fn resolve_port(cfg: &RawConfig, env: &HashMap<String, String>) -> Result<u16> {
    let port = match env.get(PORT_ENV_VAR) {
        Some(value) => match value.trim().parse::<u16>() {
            Ok(port) if port > 0 => port,
            _ => {
                return Err(config_error(format!(
                    "{PORT_ENV_VAR} must be a port number between 1 and 65535 (got '{value}')"
                )))
            }
        },
        None => cfg.server.default_port,
    };

    if port == cfg.server.test_port {
        return Err(config_error(format!(
            "{PORT_ENV_VAR}={port} collides with [server].test_port"
        )));
    }
    Ok(port)
}
