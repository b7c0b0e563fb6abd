// src/tasks.rs

//! Wiring of every CLI task into the Task Graph.

use std::future::Future;

use tracing::info;

use crate::dag::{TaskAction, TaskGraph};
use crate::errors::TaskError;
use crate::exec::TestOrchestrator;
use crate::pipeline::bump::{bump_versions, BumpRequest};
use crate::pipeline::{assets, clean, inject, optimize, styles, templates, vet, StageContext};

/// Per-invocation switches that change what some actions do.
#[derive(Debug, Clone, Default)]
pub struct TaskOptions {
    /// Echo every file `vet` looks at.
    pub verbose: bool,
    /// `test` runs against an isolated server instance.
    pub start_servers: bool,
    pub bump: BumpRequest,
}

/// Turn a stage function into a task action bound to `ctx`.
fn action<F, Fut>(ctx: &StageContext, f: F) -> impl TaskAction + 'static
where
    F: Fn(StageContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let ctx = ctx.clone();
    move || f(ctx.clone())
}

/// Register the full task set:
///
/// ```text
/// styles        <- clean-styles
/// images        <- clean-images
/// fonts         <- clean-fonts
/// templatecache <- clean-code
/// inject        <- wiredep, styles, fonts, templatecache
/// test          <- vet, templatecache
/// optimize      <- inject, test
/// build         <- optimize, images
/// ```
///
/// plus `vet`, `clean`, `wiredep` and `bump` without prerequisites.
pub fn build_task_graph(ctx: &StageContext, options: TaskOptions) -> Result<TaskGraph, TaskError> {
    let mut graph = TaskGraph::new();
    let none: [&str; 0] = [];

    let verbose = options.verbose;
    graph.register(
        "vet",
        none,
        action(ctx, move |ctx| async move { vet::vet(&ctx, verbose).await }),
    )?;

    graph.register(
        "clean",
        none,
        action(ctx, |ctx| async move { clean::clean_all(&ctx).await }),
    )?;
    graph.register(
        "clean-styles",
        none,
        action(ctx, |ctx| async move { clean::clean_styles(&ctx).await.map(drop) }),
    )?;
    graph.register(
        "clean-images",
        none,
        action(ctx, |ctx| async move { clean::clean_images(&ctx).await.map(drop) }),
    )?;
    graph.register(
        "clean-fonts",
        none,
        action(ctx, |ctx| async move { clean::clean_fonts(&ctx).await.map(drop) }),
    )?;
    graph.register(
        "clean-code",
        none,
        action(ctx, |ctx| async move { clean::clean_code(&ctx).await.map(drop) }),
    )?;

    graph.register(
        "styles",
        ["clean-styles"],
        action(ctx, |ctx| async move { styles::compile_styles(&ctx).await.map(drop) }),
    )?;
    graph.register(
        "images",
        ["clean-images"],
        action(ctx, |ctx| async move { assets::copy_images(&ctx).await.map(drop) }),
    )?;
    graph.register(
        "fonts",
        ["clean-fonts"],
        action(ctx, |ctx| async move { assets::copy_fonts(&ctx).await.map(drop) }),
    )?;
    graph.register(
        "templatecache",
        ["clean-code"],
        action(ctx, |ctx| async move {
            templates::build_template_cache(&ctx).await.map(drop)
        }),
    )?;

    graph.register(
        "wiredep",
        none,
        action(ctx, |ctx| async move { inject::wire_dependencies(&ctx).await.map(drop) }),
    )?;
    graph.register(
        "inject",
        ["wiredep", "styles", "fonts", "templatecache"],
        action(ctx, |ctx| async move { inject::inject_styles(&ctx).await.map(drop) }),
    )?;

    let start_servers = options.start_servers;
    graph.register(
        "test",
        ["vet", "templatecache"],
        action(ctx, move |ctx| async move {
            TestOrchestrator::new(ctx.config.clone())
                .run(start_servers)
                .await
                .map_err(anyhow::Error::from)
        }),
    )?;

    graph.register(
        "optimize",
        ["inject", "test"],
        action(ctx, |ctx| async move { optimize::optimize(&ctx).await.map(drop) }),
    )?;

    graph.register(
        "build",
        ["optimize", "images"],
        action(ctx, |ctx| async move {
            clean::clean_dirs(&ctx, vec![ctx.config.temp_dir()]).await?;
            info!(
                build = %ctx.config.build_dir().display(),
                "build complete: deployed to the build folder; run `assetdag serve-build`"
            );
            Ok::<(), anyhow::Error>(())
        }),
    )?;

    let bump = options.bump;
    graph.register(
        "bump",
        none,
        action(ctx, move |ctx| {
            let bump = bump.clone();
            async move { bump_versions(&ctx, &bump).await.map(drop) }
        }),
    )?;

    Ok(graph)
}

/// Lines for the `help` command: every task with its prerequisites.
pub fn task_listing(graph: &TaskGraph) -> Vec<String> {
    graph
        .tasks()
        .map(|name| {
            let deps = graph.dependencies_of(name);
            if deps.is_empty() {
                name.to_string()
            } else {
                format!("{name} <- {}", deps.join(", "))
            }
        })
        .collect()
}
