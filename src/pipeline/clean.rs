// src/pipeline/clean.rs

//! Deleting stale output before a stage regenerates it.

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::config::model::join_glob;
use crate::pipeline::{blocking, StageContext};

/// Delete every file matched by `globs` (project-relative). Returns the
/// number of files removed.
pub async fn clean_globs(ctx: &StageContext, globs: Vec<String>) -> Result<usize> {
    info!(globs = ?globs, "cleaning");
    let files = ctx.file_set(&globs).await?;
    let count = files.len();

    let fs = ctx.fs.clone();
    blocking(move || {
        for file in &files {
            fs.remove_file(&file.path)?;
        }
        Ok(())
    })
    .await?;

    Ok(count)
}

/// Delete whole directory trees.
pub async fn clean_dirs(ctx: &StageContext, dirs: Vec<PathBuf>) -> Result<()> {
    info!(dirs = ?dirs, "cleaning");
    let fs = ctx.fs.clone();
    blocking(move || {
        for dir in &dirs {
            fs.remove_dir_all(dir)?;
        }
        Ok(())
    })
    .await
}

/// `clean`: the build and temp directories.
pub async fn clean_all(ctx: &StageContext) -> Result<()> {
    clean_dirs(ctx, vec![ctx.config.build_dir(), ctx.config.temp_dir()]).await
}

/// `clean-styles`: compiled stylesheets in the temp directory.
pub async fn clean_styles(ctx: &StageContext) -> Result<usize> {
    let temp = &ctx.config.paths.temp;
    clean_globs(ctx, vec![join_glob(temp, "**/*.css")]).await
}

/// `clean-images`: compressed images in the build directory.
pub async fn clean_images(ctx: &StageContext) -> Result<usize> {
    let build = &ctx.config.paths.build;
    clean_globs(ctx, vec![join_glob(build, "images/**/*.*")]).await
}

/// `clean-fonts`: copied fonts in the temp and build directories.
pub async fn clean_fonts(ctx: &StageContext) -> Result<usize> {
    let paths = &ctx.config.paths;
    clean_globs(
        ctx,
        vec![
            join_glob(&paths.temp, "font/**/*.*"),
            join_glob(&paths.build, "font/**/*.*"),
        ],
    )
    .await
}

/// `clean-code`: generated scripts and markup.
pub async fn clean_code(ctx: &StageContext) -> Result<usize> {
    let paths = &ctx.config.paths;
    clean_globs(
        ctx,
        vec![
            join_glob(&paths.temp, "**/*.js"),
            join_glob(&paths.build, "**/*.html"),
            join_glob(&paths.build, "js/**/*.js"),
        ],
    )
    .await
}
