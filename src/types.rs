use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Environment mode handed to the supervised server process (`NODE_ENV`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Serving live sources with per-stage rebuilds.
    Dev,
    /// Serving the optimized build output.
    Build,
    /// Isolated instance started by the test orchestrator.
    Test,
}

impl BuildMode {
    pub fn as_env_value(self) -> &'static str {
        match self {
            BuildMode::Dev => "dev",
            BuildMode::Build => "build",
            BuildMode::Test => "test",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_env_value())
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dev" => Ok(BuildMode::Dev),
            "build" => Ok(BuildMode::Build),
            "test" => Ok(BuildMode::Test),
            other => Err(format!(
                "invalid mode: {other} (expected \"dev\", \"build\" or \"test\")"
            )),
        }
    }
}

/// What the browser should do once a triggered rebuild has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReloadPolicy {
    /// Nothing; the developer refreshes by hand.
    None,
    /// Hot-swap the changed stylesheets without a page reload.
    Stylesheet,
    /// Reload the whole page.
    FullPage,
}
