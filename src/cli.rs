// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `assetdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetdag",
    about = "Build front-end assets through a task graph and serve them with live reload.",
    long_about = None,
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `assetdag.toml` in the current working directory. A missing
    /// default file means "use the conventional layout".
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETDAG_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Echo every matched file while vetting.
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the available tasks and their prerequisites.
    Help,
    /// Lint the source scripts; fails on violations.
    Vet,
    /// Delete the build and temp directories.
    Clean,
    #[command(name = "clean-styles")]
    CleanStyles,
    #[command(name = "clean-images")]
    CleanImages,
    #[command(name = "clean-fonts")]
    CleanFonts,
    #[command(name = "clean-code")]
    CleanCode,
    /// Compile the style sources into the temp directory.
    Styles,
    /// Compress images into the build directory.
    Images,
    /// Copy fonts into the build directory.
    Fonts,
    /// Generate the template-cache script module.
    Templatecache,
    /// Wire vendor and application scripts into the index file.
    Wiredep,
    /// Wire every dependency and generated stylesheet into the index file.
    Inject,
    /// Produce the minified, content-hashed build.
    Optimize,
    /// Full build (optimize + images), then drop the temp directory.
    Build,
    /// Vet, build the template cache and run the test runner.
    Test(TestArgs),
    /// Serve live sources with rebuild-and-reload on change.
    #[command(name = "serve-dev")]
    ServeDev(ServeArgs),
    /// Serve the optimized build, rebuilding it on change.
    #[command(name = "serve-build")]
    ServeBuild(ServeArgs),
    /// Bump the version in the package manifests.
    Bump(BumpArgs),
    /// Recompile styles whenever a style source changes (no server).
    #[command(name = "less-watcher")]
    LessWatcher,
}

impl Command {
    /// Task Graph entry point for commands that are plain graph runs.
    pub fn task_name(&self) -> Option<&'static str> {
        let name = match self {
            Command::Vet => "vet",
            Command::Clean => "clean",
            Command::CleanStyles => "clean-styles",
            Command::CleanImages => "clean-images",
            Command::CleanFonts => "clean-fonts",
            Command::CleanCode => "clean-code",
            Command::Styles => "styles",
            Command::Images => "images",
            Command::Fonts => "fonts",
            Command::Templatecache => "templatecache",
            Command::Wiredep => "wiredep",
            Command::Inject => "inject",
            Command::Optimize => "optimize",
            Command::Build => "build",
            Command::Test(_) => "test",
            Command::Bump(_) => "bump",
            Command::Help
            | Command::ServeDev(_)
            | Command::ServeBuild(_)
            | Command::LessWatcher => return None,
        };
        Some(name)
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct TestArgs {
    /// Spawn an isolated server instance on the test port for the run.
    #[arg(long = "start-servers", alias = "startServers")]
    pub start_servers: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ServeArgs {
    /// Do not start the browser reload channel or the asset watchers.
    #[arg(long)]
    pub nosync: bool,

    /// Open the spec runner page instead of the application.
    #[arg(long)]
    pub spec_runner: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct BumpArgs {
    /// Which part of the version to increment.
    #[arg(long = "type", value_enum, value_name = "TYPE")]
    pub kind: Option<BumpKind>,

    /// Set this exact version instead of incrementing.
    #[arg(long, value_name = "VERSION")]
    pub version: Option<String>,
}

/// Semver component to increment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, ValueEnum)]
pub enum BumpKind {
    Major,
    Minor,
    #[default]
    Patch,
    Prerelease,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
