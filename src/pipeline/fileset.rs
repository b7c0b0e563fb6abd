// src/pipeline/fileset.rs

//! File Set resolution: `(globs, filesystem snapshot) -> ordered paths`.
//!
//! Resolved fresh at the start of every stage, never cached, so files added
//! during a watch session are picked up by the next run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::fs::FileSystem;
use crate::pipeline::to_slash;

/// One file matched by a glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    /// Absolute path (root joined with `relative`).
    pub path: PathBuf,
    /// Path relative to the project root.
    pub relative: PathBuf,
    /// Static prefix of the glob that matched (relative to the root), e.g.
    /// `src/client/app` for `src/client/app/**/*.html`.
    pub base: PathBuf,
}

impl MatchedFile {
    /// Path below the glob base; what stages mirror into their output dir.
    pub fn relative_to_base(&self) -> PathBuf {
        self.relative
            .strip_prefix(&self.base)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| self.relative.clone())
    }

    /// Root-relative path with forward slashes.
    pub fn slash_path(&self) -> String {
        to_slash(&self.relative)
    }
}

/// Resolve `globs` against `root`.
///
/// - Globs starting with `!` exclude files from the result.
/// - Order follows the include globs; files within one glob are sorted.
/// - A file matched by several include globs is reported once, at its first
///   match.
/// - `*` does not cross `/`; `**` does.
pub fn resolve_file_set(fs: &dyn FileSystem, root: &Path, globs: &[String]) -> Result<Vec<MatchedFile>> {
    let normalized: Vec<String> = globs.iter().map(|g| normalize_glob(g)).collect();
    let (includes, excludes): (Vec<&String>, Vec<&String>) =
        normalized.iter().partition(|g| !g.starts_with('!'));

    let exclude_set = build_exclude_set(&excludes)?;

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut out = Vec::new();

    for pattern in includes {
        let matcher = compile(pattern)?;
        let (base, depth) = split_glob(pattern);

        let mut candidates = if is_literal(pattern) {
            let path = root.join(pattern);
            if fs.is_file(&path) { vec![path] } else { Vec::new() }
        } else {
            walk_files(fs, &root.join(&base), depth)?
        };
        candidates.sort();

        for path in candidates {
            let Ok(relative) = path.strip_prefix(root).map(Path::to_path_buf) else {
                continue;
            };
            let rel = to_slash(&relative);
            if !matcher.is_match(&rel) || exclude_set.is_match(&rel) {
                continue;
            }
            if !seen.insert(relative.clone()) {
                continue;
            }

            let base = if is_literal(pattern) {
                relative.parent().map(Path::to_path_buf).unwrap_or_default()
            } else {
                base.clone()
            };
            out.push(MatchedFile {
                path,
                relative,
                base,
            });
        }
    }

    debug!(globs = ?globs, matched = out.len(), "resolved file set");
    Ok(out)
}

/// Drop leading `./` components (after an optional `!`): matching is done
/// against root-relative paths, which never carry them.
pub fn normalize_glob(pattern: &str) -> String {
    let (negated, mut body) = match pattern.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };
    while let Some(rest) = body.strip_prefix("./") {
        body = rest.trim_start_matches('/');
    }
    if negated { format!("!{body}") } else { body.to_string() }
}

/// Compile a single include glob with `/`-aware `*`.
pub fn compile(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob '{pattern}'"))?;
    Ok(glob.compile_matcher())
}

fn build_exclude_set(excludes: &[&String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in excludes {
        let pattern = pattern.trim_start_matches('!');
        let glob: Glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid exclude glob '{pattern}'"))?;
        builder.add(glob);
    }
    builder.build().context("building exclude glob set")
}

fn is_glob_component(part: &str) -> bool {
    part.contains(['*', '?', '[', '{'])
}

fn is_literal(pattern: &str) -> bool {
    !pattern.split('/').any(is_glob_component)
}

/// Split a glob into its static base directory and the walk depth its
/// dynamic suffix needs (`None` = unbounded, for `**`).
pub fn split_glob(pattern: &str) -> (PathBuf, Option<usize>) {
    let parts: Vec<&str> = pattern.split('/').filter(|p| !p.is_empty() && *p != ".").collect();
    let split = parts
        .iter()
        .position(|p| is_glob_component(p))
        .unwrap_or(parts.len());

    let base: PathBuf = parts[..split].iter().collect();
    let suffix = &parts[split..];
    let depth = if suffix.iter().any(|p| p.contains("**")) {
        None
    } else {
        Some(suffix.len())
    };
    (base, depth)
}

/// Every file below `dir`, at most `depth` levels deep.
fn walk_files(fs: &dyn FileSystem, dir: &Path, depth: Option<usize>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !fs.is_dir(dir) {
        return Ok(files);
    }

    let mut stack = vec![(dir.to_path_buf(), 1usize)];
    while let Some((current, level)) = stack.pop() {
        for entry in fs.read_dir(&current)? {
            if fs.is_dir(&entry) {
                if depth.is_none_or(|max| level < max) {
                    stack.push((entry, level + 1));
                }
            } else if fs.is_file(&entry) {
                files.push(entry);
            }
        }
    }
    Ok(files)
}
