// src/pipeline/templates.rs

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::config::TemplateCacheSection;
use crate::pipeline::transform::apply_all;
use crate::pipeline::{to_slash, Asset, StageContext};

/// `templatecache`: minify every markup template and bake them into one
/// script module that pre-populates the client's `$templateCache`.
///
/// Keys are `template_cache.root` followed by the template's path below its
/// glob base. Returns the written module path relative to the root.
pub async fn build_template_cache(ctx: &StageContext) -> Result<PathBuf> {
    info!("creating template cache module");

    let templates = ctx.file_set(&ctx.config.paths.html_templates).await?;
    let mut entries = Vec::with_capacity(templates.len());

    for template in templates {
        let contents = ctx.read(&template.path).await?;
        let key = format!(
            "{}{}",
            ctx.config.template_cache.root,
            to_slash(&template.relative_to_base())
        );
        let minified = apply_all(
            Asset::new(template.relative.clone(), contents),
            &[&ctx.transforms.html_minify],
        )
        .await?;
        entries.push((key, minified.text()?.to_string()));
    }

    let module = render_template_cache(&ctx.config.template_cache, &entries)?;
    let rel = PathBuf::from(ctx.config.template_cache_file());
    ctx.write(&ctx.config.resolve_path(&rel), module.into_bytes()).await?;

    info!(file = %to_slash(&rel), templates = entries.len(), "wrote template cache");
    Ok(rel)
}

/// Render the module source for `(key, markup)` entries.
pub fn render_template_cache(options: &TemplateCacheSection, entries: &[(String, String)]) -> Result<String> {
    let module = serde_json::to_string(&options.module)?;
    let declaration = if options.standalone {
        format!("angular.module({module}, [])")
    } else {
        format!("angular.module({module})")
    };

    let mut puts = Vec::with_capacity(entries.len());
    for (key, markup) in entries {
        puts.push(format!(
            "$templateCache.put({},{});",
            serde_json::to_string(key)?,
            serde_json::to_string(markup)?
        ));
    }

    Ok(format!(
        "{declaration}.run([\"$templateCache\", function($templateCache) {{{}}}]);\n",
        puts.join("\n")
    ))
}
