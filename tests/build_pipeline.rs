// tests/build_pipeline.rs

use std::fs;
use std::path::Path;
use std::sync::Arc;

use assetdag::engine::TaskRunner;
use assetdag::fs::RealFileSystem;
use assetdag::pipeline::optimize::parse_index;
use assetdag::pipeline::revision::{content_hash, revisioned_name};
use assetdag::tasks::{build_task_graph, TaskOptions};
use assetdag_test_utils::builders::{stage_context, ConfigBuilder};
use assetdag_test_utils::{init_tracing, with_timeout};

const INDEX: &str = r#"<!DOCTYPE html>
<html>
<head>
    <!-- bower:css -->
    <!-- endbower -->
    <!-- inject:css -->
    <!-- endinject -->
</head>
<body>
    <!-- bower:js -->
    <!-- endbower -->
    <!-- inject:js -->
    <!-- endinject -->
    <!-- inject:templates:js -->
    <!-- endinject -->
</body>
</html>
"#;

const STYLE: &str = "body { color: red; }\n";
const CSS_LINK: &str = r#"<link rel="stylesheet" href="/.tmp/styles/a.css">"#;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

fn runner_for(root: &Path) -> TaskRunner {
    let config = ConfigBuilder::new(root)
        .with_less(&["src/client/styles/a.less"])
        .build();
    let ctx = stage_context(config, Arc::new(RealFileSystem));
    TaskRunner::new(build_task_graph(&ctx, TaskOptions::default()).unwrap()).unwrap()
}

#[tokio::test]
async fn inject_references_each_compiled_stylesheet_exactly_once() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/client/index.html", INDEX);
    write(root, "src/client/styles/a.less", STYLE);
    let runner = runner_for(root);

    with_timeout(runner.run("inject")).await.unwrap();
    assert_eq!(read(root, ".tmp/styles/a.css"), STYLE);
    assert_eq!(read(root, "src/client/index.html").matches(CSS_LINK).count(), 1);

    // Re-running replaces the block instead of appending to it.
    with_timeout(runner.run("inject")).await.unwrap();
    assert_eq!(read(root, "src/client/index.html").matches(CSS_LINK).count(), 1);
}

#[tokio::test]
async fn optimize_writes_hashed_assets_and_the_revision_manifest() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/client/index.html", INDEX);
    write(root, "src/client/styles/a.less", STYLE);
    let runner = runner_for(root);

    with_timeout(runner.run("optimize")).await.unwrap();

    let hashed = format!("styles/a-{}.css", content_hash(STYLE.as_bytes()));
    assert_eq!(revisioned_name("styles/a.css", STYLE.as_bytes()), hashed);

    let manifest: serde_json::Value =
        serde_json::from_str(&read(root, "build/rev-manifest.json")).unwrap();
    assert_eq!(manifest["styles/a.css"].as_str(), Some(hashed.as_str()));

    assert_eq!(read(root, &format!("build/{hashed}")), STYLE);

    let index = read(root, "build/index.html");
    assert!(index.contains(&format!("href=\"{hashed}\"")), "index was {index}");
    assert!(!index.contains("/.tmp/styles/a.css"));
}

#[tokio::test]
async fn build_removes_the_temp_directory() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "src/client/index.html", INDEX);
    write(root, "src/client/styles/a.less", STYLE);
    write(root, "src/client/images/logo.png", "png");
    let runner = runner_for(root);

    with_timeout(runner.run("build")).await.unwrap();

    assert!(!root.join(".tmp").exists());
    assert!(root.join("build/index.html").is_file());
    assert!(root.join("build/rev-manifest.json").is_file());
    assert_eq!(read(root, "build/images/logo.png"), "png");
}

#[tokio::test]
async fn failing_stage_stops_the_build_before_optimize() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    // No index file: wiredep cannot run.
    write(root, "src/client/styles/a.less", STYLE);
    let runner = runner_for(root);

    let err = with_timeout(runner.run("build")).await.unwrap_err();

    assert_eq!(err.task(), Some("wiredep"));
    assert!(!root.join("build/rev-manifest.json").exists());
}

#[test]
fn build_blocks_collapse_into_one_group() {
    let html = r#"<head>
<!-- build:css styles/app.css -->
<link rel="stylesheet" href="/.tmp/styles/a.css">
<link rel="stylesheet" href="/.tmp/styles/b.css">
<!-- endbuild -->
<script src="https://cdn.example.com/x.js"></script>
<script src="/src/client/app/main.js"></script>
</head>"#;

    let parsed = parse_index(html, ".tmp", "src/client").unwrap();

    assert_eq!(parsed.groups.len(), 2);
    assert_eq!(parsed.groups[0].logical, "styles/app.css");
    assert_eq!(parsed.groups[0].sources.len(), 2);
    assert_eq!(parsed.groups[1].logical, "app/main.js");
    assert!(parsed.html.contains(r#"<link rel="stylesheet" href="styles/app.css">"#));
    assert!(!parsed.html.contains("b.css"));
    assert!(parsed.html.contains("https://cdn.example.com/x.js"));
}

#[test]
fn single_quoted_references_are_collected() {
    let html = "<head>\n<!-- build:js js/app.js -->\n<script src='/src/client/app/a.js'></script>\n<script src=\"/src/client/app/b.js\"></script>\n<!-- endbuild -->\n<link rel='stylesheet' href='/.tmp/styles/a.css'>\n</head>";

    let parsed = parse_index(html, ".tmp", "src/client").unwrap();

    assert_eq!(parsed.groups.len(), 2);
    assert_eq!(parsed.groups[0].logical, "js/app.js");
    assert_eq!(
        parsed.groups[0].sources,
        vec![
            Path::new("src/client/app/a.js").to_path_buf(),
            Path::new("src/client/app/b.js").to_path_buf(),
        ]
    );
    assert_eq!(parsed.groups[1].logical, "styles/a.css");
    assert_eq!(parsed.refs.get("/.tmp/styles/a.css").map(String::as_str), Some("styles/a.css"));
}

#[test]
fn build_block_without_local_sources_is_an_error() {
    let html = "<!-- build:js js/lib.js -->\n<script src=\"https://cdn.example.com/x.js\"></script>\n<!-- endbuild -->";

    let err = parse_index(html, ".tmp", "src/client").unwrap_err();

    assert!(err.to_string().contains("js/lib.js"), "error was {err}");
}

#[test]
fn two_sources_for_one_logical_name_are_rejected() {
    let html = r#"<link rel="stylesheet" href="/.tmp/styles/a.css">
<link rel="stylesheet" href="/src/client/styles/a.css">"#;

    let err = parse_index(html, ".tmp", "src/client").unwrap_err();

    assert!(err.to_string().contains("styles/a.css"), "error was {err}");
}

#[test]
fn the_same_asset_referenced_twice_is_one_group() {
    let html = r#"<link rel="stylesheet" href="/.tmp/styles/a.css">
<link rel="stylesheet" href=".tmp/styles/a.css">"#;

    let parsed = parse_index(html, ".tmp", "src/client").unwrap();

    assert_eq!(parsed.groups.len(), 1);
    assert_eq!(parsed.refs.len(), 2);
}

#[tokio::test]
async fn optimize_rewrites_single_quoted_references() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let index = INDEX.replace(
        "</head>",
        "    <link rel='stylesheet' href='/src/client/css/extra.css'>\n</head>",
    );
    write(root, "src/client/index.html", &index);
    write(root, "src/client/styles/a.less", STYLE);
    write(root, "src/client/css/extra.css", "p { margin: 0; }\n");
    let runner = runner_for(root);

    with_timeout(runner.run("optimize")).await.unwrap();

    let hashed = revisioned_name("css/extra.css", b"p { margin: 0; }\n");
    let built = read(root, "build/index.html");
    assert!(built.contains(&format!("href='{hashed}'")), "index was {built}");
    assert!(!built.contains("/src/client/css/extra.css"));
    assert_eq!(read(root, &format!("build/{hashed}")), "p { margin: 0; }\n");
}
