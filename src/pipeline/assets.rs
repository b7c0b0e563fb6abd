// src/pipeline/assets.rs

//! Static assets copied into the build directory.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::pipeline::transform::apply_all;
use crate::pipeline::{Asset, StageContext};

/// `images`: compress every image into `<build>/images/`.
pub async fn copy_images(ctx: &StageContext) -> Result<usize> {
    info!("copying and compressing the images");
    let out_dir = PathBuf::from(&ctx.config.paths.build).join("images");
    let images = ctx.file_set(&ctx.config.paths.images).await?;

    let mut count = 0;
    for image in images {
        let contents = ctx.read(&image.path).await?;
        let asset = apply_all(
            Asset::new(image.relative_to_base(), contents),
            &[&ctx.transforms.imagemin],
        )
        .await?;
        write_below(ctx, &out_dir, asset).await?;
        count += 1;
    }
    Ok(count)
}

/// `fonts`: copy fonts into `<build>/font/`.
pub async fn copy_fonts(ctx: &StageContext) -> Result<usize> {
    info!("copying fonts");
    let out_dir = PathBuf::from(&ctx.config.paths.build).join("font");
    let fonts = ctx.file_set(&ctx.config.paths.fonts).await?;

    let mut count = 0;
    for font in fonts {
        let contents = ctx.read(&font.path).await?;
        write_below(ctx, &out_dir, Asset::new(font.relative_to_base(), contents)).await?;
        count += 1;
    }
    Ok(count)
}

async fn write_below(ctx: &StageContext, out_dir: &Path, asset: Asset) -> Result<()> {
    let target = ctx.config.resolve_path(out_dir.join(&asset.path));
    ctx.write(&target, asset.contents).await
}
