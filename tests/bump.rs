// tests/bump.rs

use std::path::Path;
use std::sync::Arc;

use assetdag::cli::BumpKind;
use assetdag::fs::{FileSystem, MemoryFileSystem};
use assetdag::pipeline::bump::{bump_manifest, bump_versions, next_version, BumpRequest};
use assetdag_test_utils::builders::{stage_context, ConfigBuilder};
use assetdag_test_utils::with_timeout;

fn bump(current: &str, kind: BumpKind) -> String {
    next_version(current, &BumpRequest::Increment(kind)).unwrap()
}

#[test]
fn increments_follow_semver_rules() {
    assert_eq!(bump("1.2.3", BumpKind::Patch), "1.2.4");
    assert_eq!(bump("1.2.3", BumpKind::Minor), "1.3.0");
    assert_eq!(bump("1.2.3", BumpKind::Major), "2.0.0");
    assert_eq!(bump("1.2.3", BumpKind::Prerelease), "1.2.4-0");
    assert_eq!(bump("1.2.4-0", BumpKind::Prerelease), "1.2.4-1");
    assert_eq!(bump("1.2.4-beta", BumpKind::Prerelease), "1.2.4-beta.0");
}

#[test]
fn increments_release_a_matching_prerelease() {
    assert_eq!(bump("1.2.4-1", BumpKind::Patch), "1.2.4");
    assert_eq!(bump("1.3.0-1", BumpKind::Minor), "1.3.0");
    assert_eq!(bump("2.0.0-rc.1", BumpKind::Major), "2.0.0");
    assert_eq!(bump("1.3.1-1", BumpKind::Minor), "1.4.0");
}

#[test]
fn exact_version_must_be_valid() {
    let exact = BumpRequest::Exact("3.0.0".to_string());
    assert_eq!(next_version("1.2.3", &exact).unwrap(), "3.0.0");

    let invalid = BumpRequest::Exact("three".to_string());
    assert!(next_version("1.2.3", &invalid).is_err());
}

#[test]
fn manifest_keeps_its_key_order() {
    let manifest = r#"{"name":"app","version":"1.2.3","private":true}"#;

    let (updated, version) = bump_manifest(manifest, &BumpRequest::default()).unwrap();

    assert_eq!(version, "1.2.4");
    assert!(updated.ends_with('\n'));
    let name = updated.find("\"name\"").unwrap();
    let ver = updated.find("\"version\": \"1.2.4\"").unwrap();
    let private = updated.find("\"private\"").unwrap();
    assert!(name < ver && ver < private, "manifest was {updated}");
}

#[tokio::test]
async fn bump_updates_present_manifests_and_skips_missing_ones() {
    let fs = MemoryFileSystem::new();
    fs.add_file("/proj/package.json", r#"{"name":"app","version":"0.9.0"}"#);
    let ctx = stage_context(ConfigBuilder::new("/proj").build(), Arc::new(fs.clone()));

    let bumped = with_timeout(bump_versions(&ctx, &BumpRequest::Increment(BumpKind::Minor)))
        .await
        .unwrap();

    assert_eq!(bumped.len(), 1);
    assert_eq!(bumped[0].1, "0.10.0");
    let written = fs.read_to_string(Path::new("/proj/package.json")).unwrap();
    assert!(written.contains("\"version\": \"0.10.0\""));
    assert!(!fs.is_file(Path::new("/proj/bower.json")));
}
