// tests/config_resolution.rs

use std::collections::HashMap;
use std::io::Write;

use assetdag::config::{load_and_validate, load_from_path, Config, RawConfig};
use assetdag::errors::AssetdagError;
use assetdag_test_utils::builders::ConfigBuilder;
use tempfile::NamedTempFile;

#[test]
fn defaults_describe_the_conventional_layout() {
    let cfg = Config::resolve(RawConfig::default(), "/proj", &HashMap::new()).unwrap();

    assert_eq!(cfg.port(), 7203);
    assert_eq!(cfg.server.test_port, 8888);
    assert_eq!(cfg.temp_dir(), std::path::PathBuf::from("/proj/.tmp"));
    assert_eq!(cfg.build_dir(), std::path::PathBuf::from("/proj/build"));
    assert_eq!(cfg.css_globs(), vec![".tmp/styles/**/*.css".to_string()]);
    assert_eq!(cfg.template_cache_file(), ".tmp/templates.js");
    assert_eq!(cfg.lib_filter_glob(), "**/lib.js");
    assert_eq!(cfg.app_filter_glob(), "**/app.js");
}

#[test]
fn port_environment_variable_overrides_the_default() {
    let cfg = ConfigBuilder::new("/proj").with_port_env("9000").build();
    assert_eq!(cfg.port(), 9000);
    // The isolated test port is not affected.
    assert_eq!(cfg.server.test_port, 8888);
}

#[test]
fn invalid_port_is_a_config_error() {
    for bad in ["abc", "0", "70000"] {
        let env = HashMap::from([("PORT".to_string(), bad.to_string())]);
        let result = Config::resolve(RawConfig::default(), "/proj", &env);
        assert!(
            matches!(result, Err(AssetdagError::ConfigError(_))),
            "PORT={bad} should be rejected"
        );
    }
}

#[test]
fn port_override_may_not_take_the_test_port() {
    let env = HashMap::from([("PORT".to_string(), "8888".to_string())]);

    match Config::resolve(RawConfig::default(), "/proj", &env) {
        Err(AssetdagError::ConfigError(msg)) => assert!(msg.contains("test_port"), "message was {msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn overlapping_bundle_filters_are_rejected() {
    let mut raw = RawConfig::default();
    raw.optimized.lib = "app.js".to_string();

    let err = Config::resolve(raw, "/proj", &HashMap::new()).unwrap_err();
    match err {
        AssetdagError::ConfigError(msg) => assert!(msg.contains("app.js"), "message was {msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn temp_and_build_must_differ() {
    let mut raw = RawConfig::default();
    raw.paths.build = ".tmp/".to_string();

    assert!(matches!(
        Config::resolve(raw, "/proj", &HashMap::new()),
        Err(AssetdagError::ConfigError(_))
    ));
}

#[test]
fn toml_sections_override_defaults_and_root_is_the_config_directory() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[paths]
less = ["web/styles/**/*.less"]

[server]
command = "deno"
default_port = 4000
test_port = 4001

[serve]
debounce_ms = 50

[transforms]
less = "lessc -"
"#
    )
    .unwrap();

    let raw = load_from_path(file.path()).unwrap();
    assert_eq!(raw.paths.less, vec!["web/styles/**/*.less".to_string()]);
    assert_eq!(raw.paths.temp, ".tmp", "unset keys keep their defaults");
    assert_eq!(raw.transforms.less.as_deref(), Some("lessc -"));
    assert_eq!(raw.transforms.uglify, None);

    let cfg = Config::resolve(raw, "/proj", &HashMap::new()).unwrap();
    assert_eq!(cfg.port(), 4000);
    assert_eq!(cfg.server.command, "deno");
    assert_eq!(cfg.serve.debounce().as_millis(), 50);

    let loaded = load_and_validate(file.path()).unwrap();
    assert_eq!(Some(loaded.root()), file.path().parent());
}

#[test]
fn malformed_toml_is_reported() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[server\ncommand = ").unwrap();

    assert!(matches!(
        load_from_path(file.path()),
        Err(AssetdagError::TomlError(_))
    ));
}
