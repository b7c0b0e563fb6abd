// src/pipeline/transform.rs

//! External transformation units.
//!
//! The core treats every unit as an opaque function over bytes. Production
//! units shell out ([`CommandTransform`]); unconfigured units pass assets
//! through unchanged.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::config::TransformsSection;
use crate::exec::command::pipe_through;

/// A file travelling through a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Logical path (relative), e.g. `styles/app.css`.
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

impl Asset {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.contents)
            .with_context(|| format!("{} is not valid UTF-8", self.path.display()))
    }
}

pub type TransformFuture = Pin<Box<dyn Future<Output = Result<Asset>> + Send>>;

/// One transformation unit.
pub trait Transform: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn apply(&self, asset: Asset) -> TransformFuture;
}

/// Pipes the asset through a shell command (stdin to stdout).
///
/// The command sees the logical path in `ASSET_PATH`.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    name: String,
    command: String,
}

impl CommandTransform {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }
}

impl Transform for CommandTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, asset: Asset) -> TransformFuture {
        let command = self.command.clone();
        Box::pin(async move {
            let contents = pipe_through(&command, &asset.path, asset.contents).await?;
            Ok(Asset {
                path: asset.path,
                contents,
            })
        })
    }
}

/// Returns the asset unchanged.
#[derive(Debug, Clone)]
pub struct Passthrough {
    name: String,
}

impl Passthrough {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Transform for Passthrough {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, asset: Asset) -> TransformFuture {
        Box::pin(async move { Ok(asset) })
    }
}

/// Built-in markup minifier: collapses every whitespace run to one space
/// and trims the ends. `<pre>` and `<textarea>` bodies are kept verbatim.
#[derive(Debug, Clone, Default)]
pub struct CollapseWhitespace;

const VERBATIM_BLOCK: &str = r"(?is)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>";

impl CollapseWhitespace {
    pub fn collapse(markup: &str) -> Result<String> {
        let verbatim = Regex::new(VERBATIM_BLOCK)?;
        let whitespace_run = Regex::new(r"\s+")?;

        let mut out = String::with_capacity(markup.len());
        let mut last = 0;
        for block in verbatim.find_iter(markup) {
            out.push_str(&whitespace_run.replace_all(&markup[last..block.start()], " "));
            out.push_str(block.as_str());
            last = block.end();
        }
        out.push_str(&whitespace_run.replace_all(&markup[last..], " "));

        Ok(out.trim().to_string())
    }
}

impl Transform for CollapseWhitespace {
    fn name(&self) -> &str {
        "html_minify"
    }

    fn apply(&self, asset: Asset) -> TransformFuture {
        Box::pin(async move {
            let collapsed = Self::collapse(asset.text()?)?;
            Ok(Asset::new(asset.path, collapsed))
        })
    }
}

/// The named units the stages draw from.
#[derive(Debug, Clone)]
pub struct TransformSet {
    pub less: Arc<dyn Transform>,
    pub autoprefix: Arc<dyn Transform>,
    pub html_minify: Arc<dyn Transform>,
    pub csso: Arc<dyn Transform>,
    pub uglify: Arc<dyn Transform>,
    pub annotate: Arc<dyn Transform>,
    pub imagemin: Arc<dyn Transform>,
}

impl TransformSet {
    /// Command units where configured, pass-through (or the built-in
    /// whitespace collapser for markup) elsewhere.
    pub fn from_config(section: &TransformsSection) -> Self {
        let unit = |name: &str, command: &Option<String>| -> Arc<dyn Transform> {
            match command {
                Some(cmd) if !cmd.trim().is_empty() => Arc::new(CommandTransform::new(name, cmd.clone())),
                _ => Arc::new(Passthrough::new(name)),
            }
        };

        let html_minify: Arc<dyn Transform> = match &section.html_minify {
            Some(cmd) if !cmd.trim().is_empty() => Arc::new(CommandTransform::new("html_minify", cmd.clone())),
            _ => Arc::new(CollapseWhitespace),
        };

        Self {
            less: unit("less", &section.less),
            autoprefix: unit("autoprefix", &section.autoprefix),
            html_minify,
            csso: unit("csso", &section.csso),
            uglify: unit("uglify", &section.uglify),
            annotate: unit("annotate", &section.annotate),
            imagemin: unit("imagemin", &section.imagemin),
        }
    }

    /// No external commands at all.
    pub fn builtin() -> Self {
        Self::from_config(&TransformsSection::default())
    }
}

/// Apply `units` in order.
pub async fn apply_all(mut asset: Asset, units: &[&Arc<dyn Transform>]) -> Result<Asset> {
    for unit in units {
        let path = asset.path.clone();
        debug!(unit = unit.name(), asset = %path.display(), "applying transform");
        asset = unit
            .apply(asset)
            .await
            .with_context(|| format!("{} failed on {}", unit.name(), path.display()))?;
    }
    Ok(asset)
}
