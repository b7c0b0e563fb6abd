// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod reload;
pub mod session;
pub mod tasks;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::{BumpArgs, CliArgs, Command, ServeArgs};
use crate::config::{load_for_cli, Config};
use crate::dag::TaskGraph;
use crate::engine::TaskRunner;
use crate::fs::RealFileSystem;
use crate::pipeline::bump::BumpRequest;
use crate::pipeline::{StageContext, TransformSet};
use crate::reload::{BroadcastReloadChannel, NullReloadChannel, ReloadChannel};
use crate::session::{SessionOptions, WatchSession};
use crate::tasks::{build_task_graph, task_listing, TaskOptions};
use crate::watch::ServeMode;

/// Capacity of the reload broadcast channel.
const RELOAD_CHANNEL_CAPACITY: usize = 64;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config resolution
/// - the stage context and the Task Graph
/// - a single task run, or a watch session for the serve commands
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config = Arc::new(load_for_cli(args.config.as_deref())?);
    let command = args.command.clone().unwrap_or(Command::Help);

    let ctx = StageContext::new(
        Arc::clone(&config),
        Arc::new(RealFileSystem),
        Arc::new(TransformSet::from_config(&config.transforms)),
    );
    let graph = build_task_graph(&ctx, task_options(&args, &command))?;
    let runner = TaskRunner::new(graph)?;

    match command {
        Command::Help => {
            print_task_listing(runner.graph());
            Ok(())
        }
        Command::ServeDev(serve_args) => serve(config, runner, ServeMode::Dev, serve_args).await,
        Command::ServeBuild(serve_args) => serve(config, runner, ServeMode::Build, serve_args).await,
        Command::LessWatcher => watch_styles(config, runner).await,
        other => {
            let Some(task) = other.task_name() else {
                return Ok(());
            };
            runner.run(task).await?;
            Ok(())
        }
    }
}

fn task_options(args: &CliArgs, command: &Command) -> TaskOptions {
    let mut options = TaskOptions {
        verbose: args.verbose,
        ..TaskOptions::default()
    };
    match command {
        Command::Test(test) => options.start_servers = test.start_servers,
        Command::Bump(bump) => options.bump = bump_request(bump),
        _ => {}
    }
    options
}

fn bump_request(args: &BumpArgs) -> BumpRequest {
    match &args.version {
        Some(version) => BumpRequest::Exact(version.clone()),
        None => BumpRequest::Increment(args.kind.unwrap_or_default()),
    }
}

/// Build once (`inject` for dev, `build` for the optimized tree), then keep a
/// watch session alive until Ctrl-C.
async fn serve(config: Arc<Config>, runner: TaskRunner, mode: ServeMode, args: ServeArgs) -> Result<()> {
    let initial = match mode {
        ServeMode::Dev => "inject",
        ServeMode::Build => "build",
    };
    runner.run(initial).await?;

    let reload: Arc<dyn ReloadChannel> = if args.nosync {
        Arc::new(NullReloadChannel)
    } else {
        let start_path = if args.spec_runner {
            spec_runner_path(&config)
        } else {
            "/".to_string()
        };
        info!(port = config.port(), start_path = %start_path, "starting browser reload channel");
        Arc::new(BroadcastReloadChannel::new(RELOAD_CHANNEL_CAPACITY, start_path))
    };

    let session = WatchSession::start(
        Arc::clone(&config),
        runner,
        reload,
        SessionOptions::serve(mode, args.nosync),
    )
    .await?;

    wait_for_ctrl_c(session).await;
    Ok(())
}

/// Re-run `styles` on every style source change until Ctrl-C.
async fn watch_styles(config: Arc<Config>, runner: TaskRunner) -> Result<()> {
    let session = WatchSession::start(
        config,
        runner,
        Arc::new(NullReloadChannel),
        SessionOptions::styles_only(),
    )
    .await?;

    wait_for_ctrl_c(session).await;
    Ok(())
}

async fn wait_for_ctrl_c(session: WatchSession) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C; shutting down");
    }
    session.shutdown().await;
}

/// Spec runner page as served from the client directory.
fn spec_runner_path(config: &Config) -> String {
    let runner = config.resolve_path(&config.paths.spec_runner);
    let rel = runner
        .strip_prefix(config.client_dir())
        .map(pipeline::to_slash)
        .unwrap_or_else(|_| config.paths.spec_runner.clone());
    format!("/{rel}")
}

fn print_task_listing(graph: &TaskGraph) {
    println!("assetdag tasks ({}):", graph.len());
    for line in task_listing(graph) {
        println!("  - {line}");
    }
    println!();
    println!("serve-dev   runs inject, then serves live sources");
    println!("serve-build runs build, then serves the optimized tree");
    println!("less-watcher re-runs styles on every style source change");
}
