// src/watch/patterns.rs

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::Config;
use crate::pipeline::fileset::normalize_glob;

/// Which part of the project a changed file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeKind {
    /// Style sources (`paths.less`).
    Style,
    /// Application scripts (`paths.js`).
    Script,
    /// Client markup (`paths.html`).
    Markup,
    /// Server-under-development sources (`server.watch`).
    Server,
}

/// Compiled include/exclude globs for one change source.
///
/// Patterns are relative to the project root; `!pattern` entries exclude.
#[derive(Clone)]
pub struct WatchProfile {
    kind: ChangeKind,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for WatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchProfile")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl WatchProfile {
    pub fn new(kind: ChangeKind, patterns: &[String]) -> Result<Self> {
        let patterns: Vec<String> = patterns.iter().map(|p| normalize_glob(p)).collect();
        let (excludes, includes): (Vec<&String>, Vec<&String>) =
            patterns.iter().partition(|p| p.starts_with('!'));

        let watch_set = build_globset(includes.iter().map(|p| p.as_str()))
            .with_context(|| format!("building watch globset for {kind:?} changes"))?;
        let exclude_set = if excludes.is_empty() {
            None
        } else {
            Some(
                build_globset(excludes.iter().map(|p| p.trim_start_matches('!')))
                    .with_context(|| format!("building exclude globset for {kind:?} changes"))?,
            )
        };

        Ok(Self {
            kind,
            watch_set,
            exclude_set,
        })
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    /// Returns true if `rel_path` (relative to the root, forward slashes)
    /// belongs to this change source.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Maps changed paths to the change sources they belong to.
#[derive(Debug, Clone)]
pub struct ChangeClassifier {
    profiles: Vec<WatchProfile>,
}

impl ChangeClassifier {
    pub fn new(profiles: Vec<WatchProfile>) -> Self {
        Self { profiles }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self::new(vec![
            WatchProfile::new(ChangeKind::Style, &cfg.paths.less)?,
            WatchProfile::new(ChangeKind::Script, &cfg.paths.js)?,
            WatchProfile::new(ChangeKind::Markup, &cfg.paths.html)?,
            WatchProfile::new(ChangeKind::Server, &cfg.server.watch)?,
        ]))
    }

    /// Only style sources; used by the styles-only watch.
    pub fn styles_only(cfg: &Config) -> Result<Self> {
        Ok(Self::new(vec![WatchProfile::new(ChangeKind::Style, &cfg.paths.less)?]))
    }

    /// Every change source `rel_path` belongs to, in profile order.
    pub fn classify(&self, rel_path: &str) -> Vec<ChangeKind> {
        self.profiles
            .iter()
            .filter(|p| p.matches(rel_path))
            .map(WatchProfile::kind)
            .collect()
    }
}

fn build_globset<'a>(patterns: impl Iterator<Item = &'a str>) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// - First we try a direct `strip_prefix(root)`.
/// - If that fails (e.g. symlinked temp dirs), we canonicalize both paths and
///   try again.
///
/// Returns `None` if the path is not below `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(rel.to_string_lossy().replace('\\', "/"));
        }
    }

    None
}
