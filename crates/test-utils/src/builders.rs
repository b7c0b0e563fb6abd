#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetdag::config::{Config, RawConfig, PORT_ENV_VAR};
use assetdag::fs::FileSystem;
use assetdag::pipeline::{StageContext, TransformSet};

/// Builder for a resolved `Config` rooted at a test directory.
///
/// Starts from the conventional layout; every `with_*` call overrides one
/// piece of it.
pub struct ConfigBuilder {
    root: PathBuf,
    raw: RawConfig,
    env: HashMap<String, String>,
}

impl ConfigBuilder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            raw: RawConfig::default(),
            env: HashMap::new(),
        }
    }

    pub fn with_port_env(mut self, value: &str) -> Self {
        self.env.insert(PORT_ENV_VAR.to_string(), value.to_string());
        self
    }

    pub fn with_less(mut self, globs: &[&str]) -> Self {
        self.raw.paths.less = globs.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn with_server_watch(mut self, globs: &[&str]) -> Self {
        self.raw.server.watch = globs.iter().map(|g| g.to_string()).collect();
        self
    }

    pub fn with_server(mut self, command: &str, entry: &str) -> Self {
        self.raw.server.command = command.to_string();
        self.raw.server.entry = entry.to_string();
        self
    }

    pub fn with_test_runner(mut self, runner: &str) -> Self {
        self.raw.test.runner = Some(runner.to_string());
        self
    }

    pub fn with_vet_command(mut self, command: &str) -> Self {
        self.raw.vet.commands.push(command.to_string());
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.raw.serve.debounce_ms = ms;
        self
    }

    pub fn with_browser_reload_delay_ms(mut self, ms: u64) -> Self {
        self.raw.serve.browser_reload_delay_ms = ms;
        self
    }

    pub fn with_restart_delay_ms(mut self, ms: u64) -> Self {
        self.raw.serve.restart_delay_ms = ms;
        self
    }

    /// Escape hatch for settings without a dedicated method.
    pub fn edit(mut self, f: impl FnOnce(&mut RawConfig)) -> Self {
        f(&mut self.raw);
        self
    }

    pub fn build(self) -> Config {
        Config::resolve(self.raw, self.root, &self.env)
            .expect("Failed to build valid config from builder")
    }
}

/// Stage context over `fs` with the built-in transformation units.
pub fn stage_context(config: Config, fs: Arc<dyn FileSystem>) -> StageContext {
    StageContext::new(Arc::new(config), fs, Arc::new(TransformSet::builtin()))
}
