// src/pipeline/vet.rs

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::exec::command::{run_to_completion, shell_command_with_args};
use crate::pipeline::StageContext;

/// `vet`: run every configured linter over the `alljs` File Set.
///
/// Matched files are passed to each linter as arguments. A non-zero exit
/// fails the task.
pub async fn vet(ctx: &StageContext, verbose: bool) -> Result<()> {
    info!("analyzing source with the configured linters");

    let files = ctx.file_set(&ctx.config.paths.alljs).await?;
    let rel: Vec<String> = files.iter().map(|f| f.slash_path()).collect();
    if verbose {
        for file in &rel {
            info!(file = %file, "vet");
        }
    }

    if ctx.config.vet.commands.is_empty() {
        warn!("no [vet].commands configured; skipping lint");
        return Ok(());
    }
    if rel.is_empty() {
        info!("no files to vet");
        return Ok(());
    }

    for linter in &ctx.config.vet.commands {
        let mut cmd = shell_command_with_args(linter, &rel);
        cmd.current_dir(ctx.config.root());

        let status = run_to_completion("vet", cmd).await?;
        if !status.success() {
            bail!(
                "'{linter}' reported violations (exit code {})",
                status.code().unwrap_or(-1)
            );
        }
        info!(linter = %linter, files = rel.len(), "lint passed");
    }

    Ok(())
}
