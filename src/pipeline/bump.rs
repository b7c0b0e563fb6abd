// src/pipeline/bump.rs

//! Version bumping of the package manifests.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use semver::{Prerelease, Version};
use serde_json::Value;
use tracing::info;

use crate::cli::BumpKind;
use crate::pipeline::StageContext;

/// What to do with the current version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BumpRequest {
    Increment(BumpKind),
    Exact(String),
}

impl Default for BumpRequest {
    fn default() -> Self {
        BumpRequest::Increment(BumpKind::Patch)
    }
}

/// Next version after `current`, following semver increment rules.
///
/// A prerelease is released by the matching increment
/// (`1.3.0-1` bumped `minor` becomes `1.3.0`); `prerelease` counts up the
/// last numeric identifier or starts `-0` on the next patch.
pub fn next_version(current: &str, request: &BumpRequest) -> Result<String> {
    let kind = match request {
        BumpRequest::Exact(version) => {
            Version::parse(version).with_context(|| format!("invalid version '{version}'"))?;
            return Ok(version.clone());
        }
        BumpRequest::Increment(kind) => *kind,
    };

    let mut v = Version::parse(current).with_context(|| format!("invalid current version '{current}'"))?;
    let is_pre = !v.pre.is_empty();
    v.build = semver::BuildMetadata::EMPTY;

    match kind {
        BumpKind::Major => {
            if !(is_pre && v.minor == 0 && v.patch == 0) {
                v.major += 1;
                v.minor = 0;
                v.patch = 0;
            }
            v.pre = Prerelease::EMPTY;
        }
        BumpKind::Minor => {
            if !(is_pre && v.patch == 0) {
                v.minor += 1;
                v.patch = 0;
            }
            v.pre = Prerelease::EMPTY;
        }
        BumpKind::Patch => {
            if !is_pre {
                v.patch += 1;
            }
            v.pre = Prerelease::EMPTY;
        }
        BumpKind::Prerelease => {
            v.pre = if is_pre {
                Prerelease::new(&increment_prerelease(v.pre.as_str()))?
            } else {
                v.patch += 1;
                Prerelease::new("0")?
            };
        }
    }

    Ok(v.to_string())
}

fn increment_prerelease(pre: &str) -> String {
    let mut parts: Vec<String> = pre.split('.').map(str::to_string).collect();
    match parts.last().and_then(|last| last.parse::<u64>().ok()) {
        Some(n) => {
            let last = parts.len() - 1;
            parts[last] = (n + 1).to_string();
        }
        None => parts.push("0".to_string()),
    }
    parts.join(".")
}

/// Rewrite the `version` field of `manifest` (JSON), preserving key order.
pub fn bump_manifest(manifest: &str, request: &BumpRequest) -> Result<(String, String)> {
    let mut doc: Value = serde_json::from_str(manifest)?;
    let obj = doc
        .as_object_mut()
        .ok_or_else(|| anyhow!("package manifest is not a JSON object"))?;

    let current = obj
        .get("version")
        .and_then(Value::as_str)
        .unwrap_or("0.0.0")
        .to_string();
    let next = next_version(&current, request)?;
    obj.insert("version".to_string(), Value::String(next.clone()));

    Ok((serde_json::to_string_pretty(&doc)? + "\n", next))
}

/// `bump`: update every configured package manifest in place.
pub async fn bump_versions(ctx: &StageContext, request: &BumpRequest) -> Result<Vec<(PathBuf, String)>> {
    match request {
        BumpRequest::Exact(v) => info!("bumping versions to {v}"),
        BumpRequest::Increment(kind) => info!("bumping versions for a {kind:?} release"),
    }

    let mut bumped = Vec::new();
    for package in &ctx.config.bump.packages {
        let path = ctx.config.resolve_path(package);
        if !ctx.fs.is_file(&path) {
            info!(package = %package, "package manifest not present; skipping");
            continue;
        }

        let raw = ctx.read_to_string(&path).await?;
        let (updated, version) =
            bump_manifest(&raw, request).with_context(|| format!("bumping {package}"))?;
        ctx.write(&path, updated.into_bytes()).await?;

        info!(package = %package, version = %version, "bumped");
        bumped.push((path, version));
    }
    Ok(bumped)
}
