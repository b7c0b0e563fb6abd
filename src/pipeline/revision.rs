// src/pipeline/revision.rs

//! Content hashing and the Revision Manifest.

use std::collections::BTreeMap;

use anyhow::Result;
use blake3::Hasher;
use serde::Serialize;

/// Hex characters of the content hash kept in file names.
pub const HASH_LEN: usize = 10;

/// Short content hash of `contents`.
pub fn content_hash(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..HASH_LEN].to_string()
}

/// `styles/app.css` + contents -> `styles/app-<hash>.css`.
pub fn revisioned_name(logical: &str, contents: &[u8]) -> String {
    let hash = content_hash(contents);
    let (dir, file) = match logical.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, logical),
    };

    let file = match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}-{hash}.{ext}"),
        _ => format!("{file}-{hash}"),
    };

    match dir {
        Some(dir) => format!("{dir}/{file}"),
        None => file,
    }
}

/// Logical asset name -> content-hashed file name, for one optimize run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RevisionManifest {
    entries: BTreeMap<String, String>,
}

impl RevisionManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, logical: impl Into<String>, revisioned: impl Into<String>) {
        self.entries.insert(logical.into(), revisioned.into());
    }

    pub fn get(&self, logical: &str) -> Option<&str> {
        self.entries.get(logical).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Whether `revisioned` is the output name of some entry.
    pub fn contains_output(&self, revisioned: &str) -> bool {
        self.entries.values().any(|v| v == revisioned)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)? + "\n")
    }
}
