// src/pipeline/optimize.rs

//! Build-time optimization of the injected index file.
//!
//! 1. Inject the template-cache module at `<!-- inject:templates:js -->`.
//! 2. Collect asset groups: every `<!-- build:css|js <out> -->` block is
//!    concatenated into `<out>`; every other local stylesheet/script
//!    reference is a group of its own.
//! 3. Minify each group according to the css / lib / app filters.
//! 4. Content-hash every output, rewrite the references, write the build
//!    tree and the Revision Manifest.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use globset::GlobMatcher;
use regex::{Captures, Match, Regex};
use tracing::{debug, info, warn};

use crate::config::model::join_glob;
use crate::pipeline::clean::clean_globs;
use crate::pipeline::fileset::compile;
use crate::pipeline::inject::{inject_block, reference_tag, root_url, INJECT_END};
use crate::pipeline::revision::{revisioned_name, RevisionManifest};
use crate::pipeline::transform::{apply_all, Transform};
use crate::pipeline::{to_slash, Asset, StageContext};

pub const TEMPLATES_MARKER: &str = "<!-- inject:templates:js -->";

const BUILD_BLOCK: &str = r"(?s)<!--\s*build:(css|js)\s+(\S+?)\s*-->(.*?)<!--\s*endbuild\s*-->";
const ASSET_REF: &str =
    r#"<(?:link|script)\b[^>]*?\b(?:href|src)\s*=\s*(?:"([^"]+)"|'([^']+)')[^>]*>"#;

/// One output file of the optimize stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetGroup {
    /// Name in the Revision Manifest, e.g. `styles/app.css`.
    pub logical: String,
    /// Project-relative sources, concatenated in order.
    pub sources: Vec<PathBuf>,
}

/// Which minifier chain an output goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetFilter {
    Css,
    Lib,
    App,
    Untouched,
}

/// Filter predicates built from `[optimized]`.
#[derive(Debug, Clone)]
pub struct AssetFilters {
    css: GlobMatcher,
    lib: GlobMatcher,
    app: GlobMatcher,
}

impl AssetFilters {
    pub fn new(lib_glob: &str, app_glob: &str) -> Result<Self> {
        Ok(Self {
            css: compile("**/*.css")?,
            lib: compile(lib_glob)?,
            app: compile(app_glob)?,
        })
    }

    /// Partition a logical name. Lib and app are exclusive.
    pub fn classify(&self, logical: &str) -> Result<AssetFilter> {
        let lib = self.lib.is_match(logical);
        let app = self.app.is_match(logical);
        match (lib, app) {
            (true, true) => bail!("'{logical}' matches both the lib and the app bundle filters"),
            (true, false) => Ok(AssetFilter::Lib),
            (false, true) => Ok(AssetFilter::App),
            (false, false) if self.css.is_match(logical) => Ok(AssetFilter::Css),
            (false, false) => Ok(AssetFilter::Untouched),
        }
    }
}

/// Index markup with its asset groups extracted.
#[derive(Debug, Clone)]
pub struct ParsedIndex {
    /// Markup with every build block collapsed to one reference.
    pub html: String,
    pub groups: Vec<AssetGroup>,
    /// Reference as written in the markup -> logical name.
    pub refs: HashMap<String, String>,
}

fn is_local(url: &str) -> bool {
    !(url.starts_with("http:")
        || url.starts_with("https:")
        || url.starts_with("//")
        || url.starts_with("data:"))
}

/// The URL of an `ASSET_REF` match, whichever quote style it used.
fn ref_url<'h>(caps: &Captures<'h>) -> Option<Match<'h>> {
    caps.get(1).or_else(|| caps.get(2))
}

/// Record `logical -> sources`; the same name may not stand for two inputs.
fn claim(claimed: &mut HashMap<String, Vec<PathBuf>>, logical: &str, sources: &[PathBuf]) -> Result<bool> {
    match claimed.get(logical) {
        Some(existing) if existing == sources => Ok(false),
        Some(existing) => bail!(
            "'{logical}' would be written from {:?} and from {:?}; rename one of the references",
            existing.iter().map(|p| to_slash(p)).collect::<Vec<_>>(),
            sources.iter().map(|p| to_slash(p)).collect::<Vec<_>>(),
        ),
        None => {
            claimed.insert(logical.to_string(), sources.to_vec());
            Ok(true)
        }
    }
}

fn strip_dir_prefix<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
    let dir = dir.trim_start_matches("./").trim_end_matches('/');
    if dir.is_empty() {
        return None;
    }
    path.strip_prefix(dir)?.strip_prefix('/')
}

/// Collect the asset groups of `html`.
///
/// References resolve against the project root (`/x` and `x` alike);
/// standalone references are named relative to the temp or client
/// directory when they live there.
pub fn parse_index(html: &str, temp_dir: &str, client_dir: &str) -> Result<ParsedIndex> {
    let build_block = Regex::new(BUILD_BLOCK)?;
    let asset_ref = Regex::new(ASSET_REF)?;

    let mut groups = Vec::new();
    let mut refs = HashMap::new();
    let mut claimed: HashMap<String, Vec<PathBuf>> = HashMap::new();
    let mut collapsed = String::with_capacity(html.len());
    let mut last = 0;

    for caps in build_block.captures_iter(html) {
        let (Some(whole), Some(kind), Some(out), Some(body)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };

        let sources: Vec<PathBuf> = asset_ref
            .captures_iter(body.as_str())
            .filter_map(|c| ref_url(&c).map(|m| m.as_str()))
            .filter(|url| is_local(url))
            .map(|url| PathBuf::from(url.trim_start_matches('/')))
            .collect();

        let out_ref = out.as_str().to_string();
        let logical = out_ref.trim_start_matches('/').to_string();
        let tag = match kind.as_str() {
            "css" => format!("<link rel=\"stylesheet\" href=\"{out_ref}\">"),
            _ => format!("<script src=\"{out_ref}\"></script>"),
        };

        collapsed.push_str(&html[last..whole.start()]);
        collapsed.push_str(&tag);
        last = whole.end();

        if sources.is_empty() {
            bail!("build block '{logical}' references no local assets");
        }

        debug!(output = %logical, sources = sources.len(), "build block");
        refs.insert(out_ref, logical.clone());
        if claim(&mut claimed, &logical, &sources)? {
            groups.push(AssetGroup { logical, sources });
        }
    }
    collapsed.push_str(&html[last..]);

    for caps in asset_ref.captures_iter(&collapsed) {
        let Some(url) = ref_url(&caps).map(|m| m.as_str()) else {
            continue;
        };
        if refs.contains_key(url) || !is_local(url) || reference_tag(url).is_none() {
            continue;
        }

        let rel = url.trim_start_matches('/');
        let logical = strip_dir_prefix(rel, temp_dir)
            .or_else(|| strip_dir_prefix(rel, client_dir))
            .unwrap_or(rel)
            .to_string();

        let sources = vec![PathBuf::from(rel)];
        refs.insert(url.to_string(), logical.clone());
        if claim(&mut claimed, &logical, &sources)? {
            groups.push(AssetGroup { logical, sources });
        }
    }

    Ok(ParsedIndex {
        html: collapsed,
        groups,
        refs,
    })
}

/// Point every known reference at its revisioned file.
pub fn rewrite_references(html: &str, refs: &HashMap<String, String>, manifest: &RevisionManifest) -> Result<String> {
    let asset_ref = Regex::new(ASSET_REF)?;

    let rewritten = asset_ref.replace_all(html, |caps: &Captures<'_>| {
        let whole = &caps[0];
        let Some(url) = ref_url(caps) else {
            return whole.to_string();
        };
        let target = refs
            .get(url.as_str())
            .and_then(|logical| manifest.get(logical));

        match target {
            Some(target) => {
                let offset = caps.get(0).map(|m| m.start()).unwrap_or(0);
                let (start, end) = (url.start() - offset, url.end() - offset);
                format!("{}{}{}", &whole[..start], target, &whole[end..])
            }
            None => whole.to_string(),
        }
    });

    Ok(rewritten.into_owned())
}

/// `optimize`: write the hashed build tree. Returns the manifest.
pub async fn optimize(ctx: &StageContext) -> Result<RevisionManifest> {
    info!("optimizing the javascript, css and html");
    let config = &ctx.config;
    let build = &config.paths.build;

    // Stale hashed outputs from an earlier run.
    clean_globs(
        ctx,
        vec![
            join_glob(build, "**/*.css"),
            join_glob(build, "**/*.js"),
            join_glob(build, "**/*.html"),
            join_glob(build, &config.optimized.manifest),
        ],
    )
    .await?;

    let mut html = ctx.read_to_string(&config.index_file()).await?;

    let template_cache = config.template_cache_file();
    if ctx.fs.is_file(&config.resolve_path(&template_cache)) {
        let tags: Vec<String> = reference_tag(&root_url(&template_cache)).into_iter().collect();
        let (injected, blocks) = inject_block(&html, TEMPLATES_MARKER, INJECT_END, &tags);
        if blocks == 0 {
            warn!("no {TEMPLATES_MARKER} marker in index file; template cache not referenced");
        }
        html = injected;
    } else {
        warn!(file = %template_cache, "template cache module missing; skipping its injection");
    }

    let parsed = parse_index(&html, &config.paths.temp, &config.paths.client)?;
    let filters = AssetFilters::new(&config.lib_filter_glob(), &config.app_filter_glob())?;
    let mut manifest = RevisionManifest::new();

    for group in &parsed.groups {
        let asset = concat_group(ctx, group).await?;
        let units = units_for(ctx, filters.classify(&group.logical)?);
        let asset = apply_all(asset, &units).await?;

        let revisioned = revisioned_name(&group.logical, &asset.contents);
        ctx.write(&config.build_dir().join(&revisioned), asset.contents)
            .await?;
        debug!(logical = %group.logical, revisioned = %revisioned, "wrote revisioned asset");
        manifest.insert(group.logical.clone(), revisioned);
    }

    let html = rewrite_references(&parsed.html, &parsed.refs, &manifest)?;
    let index_name = config
        .index_file()
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("index.html"));
    ctx.write(&config.build_dir().join(index_name), html.into_bytes())
        .await?;

    let manifest_path = config.build_dir().join(&config.optimized.manifest);
    ctx.write(&manifest_path, manifest.to_json()?.into_bytes())
        .await?;

    info!(assets = manifest.len(), manifest = %manifest_path.display(), "optimized build written");
    Ok(manifest)
}

fn units_for(ctx: &StageContext, filter: AssetFilter) -> Vec<&std::sync::Arc<dyn Transform>> {
    let t = &ctx.transforms;
    match filter {
        AssetFilter::Css => vec![&t.csso],
        AssetFilter::Lib => vec![&t.uglify],
        // Annotation must see the unminified parameter names.
        AssetFilter::App => vec![&t.annotate, &t.uglify],
        AssetFilter::Untouched => Vec::new(),
    }
}

async fn concat_group(ctx: &StageContext, group: &AssetGroup) -> Result<Asset> {
    let mut contents = Vec::new();
    for (i, source) in group.sources.iter().enumerate() {
        let path = resolve_source(ctx, source);
        let bytes = ctx
            .read(&path)
            .await
            .with_context(|| format!("asset '{}' referenced by the index file", to_slash(source)))?;
        if i > 0 {
            contents.push(b'\n');
        }
        contents.extend_from_slice(&bytes);
    }
    Ok(Asset::new(group.logical.clone(), contents))
}

fn resolve_source(ctx: &StageContext, source: &Path) -> PathBuf {
    let from_root = ctx.config.resolve_path(source);
    if ctx.fs.is_file(&from_root) {
        return from_root;
    }
    // Relative to the index file's directory.
    ctx.config
        .index_file()
        .parent()
        .map(|dir| dir.join(source))
        .filter(|p| ctx.fs.is_file(p))
        .unwrap_or(from_root)
}
