// src/pipeline/styles.rs

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::pipeline::transform::apply_all;
use crate::pipeline::{to_slash, with_extension, Asset, StageContext};

/// Compile the style sources into `<temp>/styles/`.
///
/// Each source goes through the style compiler, then the vendor prefixer.
/// Output keeps the source's path below its glob base, with a `.css`
/// extension. Returns the written paths relative to the project root.
pub async fn compile_styles(ctx: &StageContext) -> Result<Vec<PathBuf>> {
    info!("compiling styles to css");

    let sources = ctx.file_set(&ctx.config.paths.less).await?;
    let out_dir = PathBuf::from(&ctx.config.paths.temp).join("styles");
    let units = [&ctx.transforms.less, &ctx.transforms.autoprefix];

    let mut written = Vec::with_capacity(sources.len());
    for source in sources {
        let contents = ctx.read(&source.path).await?;
        let logical = with_extension(&source.relative_to_base(), "css");
        let asset = apply_all(Asset::new(logical, contents), &units).await?;

        let rel = out_dir.join(&asset.path);
        ctx.write(&ctx.config.resolve_path(&rel), asset.contents).await?;
        info!(file = %to_slash(&rel), "wrote stylesheet");
        written.push(rel);
    }

    Ok(written)
}
