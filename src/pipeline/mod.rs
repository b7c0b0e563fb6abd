// src/pipeline/mod.rs

//! Pipeline Stages.
//!
//! Each stage reads a File Set, pushes every file through an ordered list of
//! [`Transform`]s and writes the results under a declared output directory.
//! Stages are plain async functions over a [`StageContext`]; `tasks` wires
//! them into the Task Graph.
//!
//! Filesystem phases run on the blocking pool (see [`blocking`]) so the event
//! loop keeps serving watch callbacks and other tasks.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::fs::FileSystem;

pub mod assets;
pub mod bump;
pub mod clean;
pub mod fileset;
pub mod inject;
pub mod optimize;
pub mod revision;
pub mod styles;
pub mod templates;
pub mod transform;
pub mod vet;

pub use fileset::{resolve_file_set, MatchedFile};
pub use revision::RevisionManifest;
pub use transform::{Asset, CollapseWhitespace, CommandTransform, Passthrough, Transform, TransformSet};

/// Everything a stage needs: configuration, filesystem and transformation units.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub config: Arc<Config>,
    pub fs: Arc<dyn FileSystem>,
    pub transforms: Arc<TransformSet>,
}

impl StageContext {
    pub fn new(config: Arc<Config>, fs: Arc<dyn FileSystem>, transforms: Arc<TransformSet>) -> Self {
        Self {
            config,
            fs,
            transforms,
        }
    }

    /// Resolve `globs` against the project root right now.
    pub async fn file_set(&self, globs: &[String]) -> Result<Vec<MatchedFile>> {
        let fs = Arc::clone(&self.fs);
        let root = self.config.root().to_path_buf();
        let globs = globs.to_vec();
        blocking(move || resolve_file_set(fs.as_ref(), &root, &globs)).await
    }

    pub async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let fs = Arc::clone(&self.fs);
        let path = path.to_path_buf();
        blocking(move || fs.read(&path)).await
    }

    pub async fn read_to_string(&self, path: &Path) -> Result<String> {
        let fs = Arc::clone(&self.fs);
        let path = path.to_path_buf();
        blocking(move || fs.read_to_string(&path)).await
    }

    pub async fn write(&self, path: &Path, contents: Vec<u8>) -> Result<()> {
        let fs = Arc::clone(&self.fs);
        let path = path.to_path_buf();
        blocking(move || fs.write(&path, &contents)).await
    }
}

/// Run a blocking filesystem phase on Tokio's blocking pool.
pub async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("filesystem worker panicked")?
}

/// Forward-slash form of a relative path, as used in markup and manifests.
///
/// Only normal components are kept.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// `path` with its extension replaced.
pub fn with_extension(path: &Path, ext: &str) -> PathBuf {
    let mut out = path.to_path_buf();
    out.set_extension(ext);
    out
}
