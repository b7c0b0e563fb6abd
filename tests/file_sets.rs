// tests/file_sets.rs

use std::path::{Path, PathBuf};

use assetdag::fs::MemoryFileSystem;
use assetdag::pipeline::fileset::split_glob;
use assetdag::pipeline::resolve_file_set;

fn globs(list: &[&str]) -> Vec<String> {
    list.iter().map(|g| g.to_string()).collect()
}

fn project() -> MemoryFileSystem {
    let fs = MemoryFileSystem::new();
    fs.add_file("/proj/src/client/app/app.module.js", "angular.module('app', []);");
    fs.add_file("/proj/src/client/app/core/core.module.js", "angular.module('app.core', []);");
    fs.add_file("/proj/src/client/app/core/logger.js", "function logger() {}");
    fs.add_file("/proj/src/client/app/core/logger.spec.js", "describe('logger');");
    fs.add_file("/proj/src/client/app/core/logger.html", "<div></div>");
    fs.add_file("/proj/src/main.js", "");
    fs.add_file("/proj/src/nested/deep.js", "");
    fs
}

fn relatives(files: &[assetdag::pipeline::MatchedFile]) -> Vec<String> {
    files.iter().map(|f| f.slash_path()).collect()
}

#[test]
fn include_order_is_kept_and_excludes_apply_to_every_glob() {
    let fs = project();
    let files = resolve_file_set(
        &fs,
        Path::new("/proj"),
        &globs(&[
            "src/client/app/**/*.module.js",
            "src/client/app/**/*.js",
            "!src/client/app/**/*.spec.js",
        ]),
    )
    .unwrap();

    assert_eq!(
        relatives(&files),
        vec![
            "src/client/app/app.module.js",
            "src/client/app/core/core.module.js",
            "src/client/app/core/logger.js",
        ]
    );
}

#[test]
fn single_star_does_not_cross_directories() {
    let fs = project();
    let files = resolve_file_set(&fs, Path::new("/proj"), &globs(&["src/*.js"])).unwrap();
    assert_eq!(relatives(&files), vec!["src/main.js"]);
}

#[test]
fn missing_directories_and_literals_resolve_to_nothing() {
    let fs = project();
    let files = resolve_file_set(
        &fs,
        Path::new("/proj"),
        &globs(&["bower_components/**/*.*", "src/client/styles/styles.less"]),
    )
    .unwrap();
    assert!(files.is_empty());
}

#[test]
fn matched_files_know_their_glob_base() {
    let fs = project();
    let files = resolve_file_set(&fs, Path::new("/proj"), &globs(&["src/client/app/**/*.html"])).unwrap();

    assert_eq!(files.len(), 1);
    let file = &files[0];
    assert_eq!(file.path, PathBuf::from("/proj/src/client/app/core/logger.html"));
    assert_eq!(file.base, PathBuf::from("src/client/app"));
    assert_eq!(file.relative_to_base(), PathBuf::from("core/logger.html"));
}

#[test]
fn literal_globs_use_their_parent_as_base() {
    let fs = project();
    let files = resolve_file_set(&fs, Path::new("/proj"), &globs(&["src/client/app/core/logger.js"])).unwrap();

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].relative_to_base(), PathBuf::from("logger.js"));
}

#[test]
fn files_added_later_are_picked_up_by_the_next_resolution() {
    let fs = project();
    let pattern = globs(&["src/client/styles/**/*.less"]);
    assert!(resolve_file_set(&fs, Path::new("/proj"), &pattern).unwrap().is_empty());

    fs.add_file("/proj/src/client/styles/a.less", "body {}");
    let files = resolve_file_set(&fs, Path::new("/proj"), &pattern).unwrap();
    assert_eq!(relatives(&files), vec!["src/client/styles/a.less"]);
}

#[test]
fn split_glob_finds_the_static_base() {
    assert_eq!(split_glob("src/client/**/*.html"), (PathBuf::from("src/client"), None));
    assert_eq!(split_glob("src/*.js"), (PathBuf::from("src"), Some(1)));
    assert_eq!(split_glob("*.js"), (PathBuf::new(), Some(1)));
}

#[test]
fn dot_slash_globs_match_like_plain_ones() {
    let fs = project();
    let root = Path::new("/proj");

    let plain = resolve_file_set(
        &fs,
        root,
        &globs(&["src/client/app/**/*.js", "!src/client/app/**/*.spec.js"]),
    )
    .unwrap();
    let dotted = resolve_file_set(
        &fs,
        root,
        &globs(&["./src/client/app/**/*.js", "!./src/client/app/**/*.spec.js"]),
    )
    .unwrap();

    assert_eq!(relatives(&plain).len(), 3);
    assert_eq!(relatives(&dotted), relatives(&plain));
    assert_eq!(dotted[0].base, PathBuf::from("src/client/app"));
}

#[test]
fn dot_slash_literal_path_resolves() {
    let fs = project();
    let files = resolve_file_set(&fs, Path::new("/proj"), &globs(&["./src/main.js"])).unwrap();

    assert_eq!(relatives(&files), vec!["src/main.js".to_string()]);
}
