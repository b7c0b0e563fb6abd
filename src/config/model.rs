// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// Every section is optional; the defaults describe the conventional layout:
///
/// ```toml
/// [paths]
/// client = "src/client"
/// temp = ".tmp"
/// build = "build"
///
/// [server]
/// entry = "src/server/app.js"
/// default_port = 7203
///
/// [transforms]
/// less = "lessc -"
/// uglify = "uglifyjs -c -m"
/// ```
///
/// This is the unvalidated form; [`Config`] is what the rest of the crate
/// consumes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub template_cache: TemplateCacheSection,

    #[serde(default)]
    pub optimized: OptimizedSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub serve: ServeSection,

    #[serde(default)]
    pub transforms: TransformsSection,

    #[serde(default)]
    pub vet: VetSection,

    #[serde(default)]
    pub test: TestSection,

    #[serde(default)]
    pub bump: BumpSection,
}

/// `[paths]` section. All paths and globs are relative to the project root.
///
/// Globs starting with `!` exclude what the other globs of the same list
/// include.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub client: String,
    pub server: String,
    pub temp: String,
    pub build: String,
    pub index: String,
    /// Everything `vet` lints.
    pub alljs: Vec<String>,
    /// Application scripts, in injection order.
    pub js: Vec<String>,
    /// Style sources handed to the style compiler.
    pub less: Vec<String>,
    /// Markup watched in build-serve mode.
    pub html: Vec<String>,
    /// Templates baked into the template cache.
    pub html_templates: Vec<String>,
    pub images: Vec<String>,
    pub fonts: Vec<String>,
    /// Third-party dependency manifest (JSON).
    pub vendor_manifest: String,
    /// Test-runner entry page used by `serve-dev --spec-runner`.
    pub spec_runner: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            client: "src/client".to_string(),
            server: "src/server".to_string(),
            temp: ".tmp".to_string(),
            build: "build".to_string(),
            index: "src/client/index.html".to_string(),
            alljs: vec!["src/**/*.js".to_string(), "*.js".to_string()],
            js: vec![
                "src/client/app/**/*.module.js".to_string(),
                "src/client/app/**/*.js".to_string(),
                "!src/client/app/**/*.spec.js".to_string(),
            ],
            less: vec!["src/client/styles/styles.less".to_string()],
            html: vec!["src/client/**/*.html".to_string()],
            html_templates: vec!["src/client/app/**/*.html".to_string()],
            images: vec!["src/client/images/**/*.*".to_string()],
            fonts: vec!["bower_components/font-awesome/fonts/**/*.*".to_string()],
            vendor_manifest: "vendor.json".to_string(),
            spec_runner: "src/client/specs.html".to_string(),
        }
    }
}

/// `[template_cache]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemplateCacheSection {
    /// File name of the generated module inside the temp directory.
    pub file: String,
    /// Client module the cache is registered on.
    pub module: String,
    /// If true, the module is declared instead of looked up.
    pub standalone: bool,
    /// Prefix for every cache key.
    pub root: String,
}

impl Default for TemplateCacheSection {
    fn default() -> Self {
        Self {
            file: "templates.js".to_string(),
            module: "app.core".to_string(),
            standalone: false,
            root: "app/".to_string(),
        }
    }
}

/// `[optimized]` section: bundle file names the optimize filters key on.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptimizedSection {
    pub app: String,
    pub lib: String,
    /// Name of the revision manifest written next to the build output.
    pub manifest: String,
}

impl Default for OptimizedSection {
    fn default() -> Self {
        Self {
            app: "app.js".to_string(),
            lib: "lib.js".to_string(),
            manifest: "rev-manifest.json".to_string(),
        }
    }
}

/// `[server]` section: the server-under-development.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Program used to launch the entry point.
    pub command: String,
    pub entry: String,
    /// Port used when `PORT` is not set in the environment.
    pub default_port: u16,
    /// Fixed port of the isolated instance started for tests.
    pub test_port: u16,
    /// Changes here restart the server instead of rebuilding assets.
    pub watch: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            command: "node".to_string(),
            entry: "src/server/app.js".to_string(),
            default_port: 7203,
            test_port: 8888,
            watch: vec!["src/server/**/*.js".to_string()],
        }
    }
}

/// `[serve]` section: timings of the watch/serve loop, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServeSection {
    pub browser_reload_delay_ms: u64,
    pub debounce_ms: u64,
    pub restart_delay_ms: u64,
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            browser_reload_delay_ms: 1000,
            debounce_ms: 250,
            restart_delay_ms: 1000,
        }
    }
}

impl ServeSection {
    pub fn browser_reload_delay(&self) -> Duration {
        Duration::from_millis(self.browser_reload_delay_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }
}

/// `[transforms]` section: shell commands for the external transformation
/// units. Each reads the asset on stdin and writes the result to stdout.
///
/// An unset unit passes assets through unchanged (except `html_minify`,
/// which falls back to a built-in whitespace collapser).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransformsSection {
    pub less: Option<String>,
    pub autoprefix: Option<String>,
    pub html_minify: Option<String>,
    pub csso: Option<String>,
    pub uglify: Option<String>,
    pub annotate: Option<String>,
    pub imagemin: Option<String>,
}

/// `[vet]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VetSection {
    /// Linter commands; matched files are appended as arguments.
    pub commands: Vec<String>,
}

/// `[test]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TestSection {
    /// Shell command running the test suite once.
    pub runner: Option<String>,
}

/// `[bump]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BumpSection {
    pub packages: Vec<String>,
}

impl Default for BumpSection {
    fn default() -> Self {
        Self {
            packages: vec!["package.json".to_string(), "bower.json".to_string()],
        }
    }
}

/// Fully resolved, validated configuration.
///
/// Built once at startup by [`Config::resolve`] and shared read-only
/// (`Arc<Config>`) by every component.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    port: u16,
    pub paths: PathsSection,
    pub template_cache: TemplateCacheSection,
    pub optimized: OptimizedSection,
    pub server: ServerSection,
    pub serve: ServeSection,
    pub transforms: TransformsSection,
    pub vet: VetSection,
    pub test: TestSection,
    pub bump: BumpSection,
}

impl Config {
    pub(crate) fn new_unchecked(raw: RawConfig, root: PathBuf, port: u16) -> Self {
        Self {
            root,
            port,
            paths: raw.paths,
            template_cache: raw.template_cache,
            optimized: raw.optimized,
            server: raw.server,
            serve: raw.serve,
            transforms: raw.transforms,
            vet: raw.vet,
            test: raw.test,
            bump: raw.bump,
        }
    }

    /// Project root every relative path is resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Port of the server-under-development (`PORT` or `server.default_port`).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve a project-relative path against the root.
    pub fn resolve_path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    pub fn client_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.client)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.temp)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.build)
    }

    pub fn index_file(&self) -> PathBuf {
        self.resolve_path(&self.paths.index)
    }

    /// Glob of the compiled stylesheets inside the temp directory.
    pub fn css_globs(&self) -> Vec<String> {
        vec![join_glob(&self.paths.temp, "styles/**/*.css")]
    }

    /// Project-relative path of the generated template-cache module.
    pub fn template_cache_file(&self) -> String {
        join_glob(&self.paths.temp, &self.template_cache.file)
    }

    /// Glob the optimize stage uses to recognise the vendor bundle.
    pub fn lib_filter_glob(&self) -> String {
        format!("**/{}", self.optimized.lib)
    }

    /// Glob the optimize stage uses to recognise the application bundle.
    pub fn app_filter_glob(&self) -> String {
        format!("**/{}", self.optimized.app)
    }
}

/// Join a project-relative directory and a glob/file suffix with `/`.
pub fn join_glob(dir: &str, suffix: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        suffix.to_string()
    } else {
        format!("{dir}/{suffix}")
    }
}
