// src/pipeline/inject.rs

//! Dependency injection into the index file.
//!
//! References are written between marker comments:
//!
//! ```html
//! <!-- inject:css -->
//! <link rel="stylesheet" href="/.tmp/styles/styles.css">
//! <!-- endinject -->
//! ```
//!
//! Vendor references use `<!-- bower:css -->` / `<!-- bower:js -->` closed by
//! `<!-- endbower -->`. Whatever sat between the markers before is replaced,
//! so re-running a stage never duplicates references.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::pipeline::{MatchedFile, StageContext};

pub const INJECT_END: &str = "<!-- endinject -->";
pub const BOWER_END: &str = "<!-- endbower -->";

/// Third-party dependency manifest.
///
/// ```json
/// { "dependencies": [ { "name": "angular", "main": ["bower_components/angular/angular.js"] } ] }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorManifest {
    #[serde(default)]
    pub dependencies: Vec<VendorDependency>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorDependency {
    pub name: String,
    /// Project-relative files to reference, in load order.
    #[serde(default)]
    pub main: Vec<String>,
}

impl VendorManifest {
    /// Main files with the given extension, in declaration order.
    pub fn files_with_extension(&self, ext: &str) -> Vec<String> {
        self.dependencies
            .iter()
            .flat_map(|dep| dep.main.iter())
            .filter(|f| f.rsplit('.').next() == Some(ext))
            .cloned()
            .collect()
    }
}

/// Markup tag referencing a root-relative URL, chosen by extension.
pub fn reference_tag(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('.').next() {
        Some("css") => Some(format!("<link rel=\"stylesheet\" href=\"{url}\">")),
        Some("js") => Some(format!("<script src=\"{url}\"></script>")),
        _ => None,
    }
}

/// Root-relative URL of a project-relative path.
pub fn root_url(rel: &str) -> String {
    format!("/{}", rel.trim_start_matches('/'))
}

/// Replace the contents of every `start_tag ... end_tag` block with `tags`,
/// one per line, indented like the start marker.
///
/// Returns the new markup and the number of blocks found.
pub fn inject_block(html: &str, start_tag: &str, end_tag: &str, tags: &[String]) -> (String, usize) {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    let mut blocks = 0;

    while let Some(start) = rest.find(start_tag) {
        let after_start = start + start_tag.len();
        let Some(end_offset) = rest[after_start..].find(end_tag) else {
            break;
        };

        let line_start = rest[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let prefix = &rest[line_start..start];
        let indent = if prefix.chars().all(char::is_whitespace) { prefix } else { "" };

        out.push_str(&rest[..after_start]);
        for tag in tags {
            out.push('\n');
            out.push_str(indent);
            out.push_str(tag);
        }
        if !tags.is_empty() {
            out.push('\n');
            out.push_str(indent);
        }
        out.push_str(end_tag);

        rest = &rest[after_start + end_offset + end_tag.len()..];
        blocks += 1;
    }

    out.push_str(rest);
    (out, blocks)
}

fn inject_files(html: &str, start_tag: &str, end_tag: &str, rel_paths: &[String]) -> String {
    let tags: Vec<String> = rel_paths
        .iter()
        .filter_map(|rel| reference_tag(&root_url(rel)))
        .collect();

    let (html, blocks) = inject_block(html, start_tag, end_tag, &tags);
    if blocks == 0 {
        warn!(marker = %start_tag, "marker not found in index file; nothing injected");
    } else {
        info!(marker = %start_tag, files = tags.len(), "injected references");
    }
    html
}

fn slash_paths(files: &[MatchedFile]) -> Vec<String> {
    files.iter().map(MatchedFile::slash_path).collect()
}

async fn load_vendor_manifest(ctx: &StageContext) -> Result<VendorManifest> {
    let path = ctx.config.resolve_path(&ctx.config.paths.vendor_manifest);
    if !ctx.fs.is_file(&path) {
        warn!(manifest = %path.display(), "vendor manifest not found; no vendor references");
        return Ok(VendorManifest::default());
    }
    let raw = ctx.read_to_string(&path).await?;
    serde_json::from_str(&raw).with_context(|| format!("parsing vendor manifest {}", path.display()))
}

/// `wiredep`: vendor stylesheets and scripts plus the application scripts.
pub async fn wire_dependencies(ctx: &StageContext) -> Result<PathBuf> {
    info!("wiring vendor and application scripts into the index file");

    let index = ctx.config.index_file();
    let original = ctx.read_to_string(&index).await?;
    let mut html = original.clone();

    let vendor = load_vendor_manifest(ctx).await?;
    html = inject_files(&html, "<!-- bower:css -->", BOWER_END, &vendor.files_with_extension("css"));
    html = inject_files(&html, "<!-- bower:js -->", BOWER_END, &vendor.files_with_extension("js"));

    let scripts = ctx.file_set(&ctx.config.paths.js).await?;
    html = inject_files(&html, "<!-- inject:js -->", INJECT_END, &slash_paths(&scripts));

    write_if_changed(ctx, &index, &original, html).await?;
    Ok(index)
}

/// `inject`: the compiled stylesheets.
pub async fn inject_styles(ctx: &StageContext) -> Result<PathBuf> {
    info!("wiring the compiled stylesheets into the index file");

    let index = ctx.config.index_file();
    let original = ctx.read_to_string(&index).await?;

    let styles = ctx.file_set(&ctx.config.css_globs()).await?;
    let html = inject_files(&original, "<!-- inject:css -->", INJECT_END, &slash_paths(&styles));

    write_if_changed(ctx, &index, &original, html).await?;
    Ok(index)
}

/// Write only when the markup changed; an unchanged index raises no watch event.
async fn write_if_changed(ctx: &StageContext, path: &Path, original: &str, updated: String) -> Result<()> {
    if updated == original {
        debug!(file = %path.display(), "index file unchanged");
        return Ok(());
    }
    ctx.write(path, updated.into_bytes()).await
}
