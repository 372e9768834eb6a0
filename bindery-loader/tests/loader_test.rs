//! Integration tests for bindery-loader

use bindery_core::{Bindable, BoundValue, Origin};
use bindery_loader::*;
use std::fs;
use temp_env::with_vars;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_priority_order() {
    let dir = TempDir::new().unwrap();
    write(&dir, "application.yaml", "app:\n  name: from-yaml\n  port: 1\n  region: yaml\n");
    write(&dir, "application.properties", "app.name=from-properties\napp.port=2\n");
    write(&dir, "config/application.properties", "app.port=3\n");
    let explicit = write(&dir, "override.properties", "app.limit=10\n");

    with_vars([("TESTAPP_APP_LIMIT", Some("20")), ("TESTAPP_APP_PORT", Some("4"))], || {
        let binder = EnvironmentLoader::new()
            .with_locations([dir.path().join("config"), dir.path().to_path_buf()])
            .with_env_prefix("TESTAPP")
            .with_file(&explicit)
            .with_args(["--app.port=5"])
            .binder()
            .unwrap();

        let value = |name: &str| binder.bind(name, &Bindable::of::<String>()).unwrap().into_option();
        assert_eq!(value("app.port"), Some(BoundValue::String("5".into())));
        assert_eq!(value("app.limit"), Some(BoundValue::String("20".into())));
        assert_eq!(value("app.name"), Some(BoundValue::String("from-properties".into())));
        assert_eq!(value("app.region"), Some(BoundValue::String("yaml".into())));
    });
}

#[test]
fn test_source_order_is_reported() {
    let dir = TempDir::new().unwrap();
    write(&dir, "application.properties", "a=1\n");
    let sources = EnvironmentLoader::new()
        .with_locations([dir.path()])
        .without_env()
        .with_args(["--b=2"])
        .load()
        .unwrap();
    let names: Vec<_> = sources.iter().map(|s| s.name().to_string()).collect();
    assert_eq!(names.len(), 2);
    assert_eq!(names[0], COMMAND_LINE_ARGS);
    assert!(names[1].ends_with("application.properties]"));
}

#[test]
fn test_origins_from_files() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "app.properties", "# header\nserver.port=eighty\n");
    let binder = EnvironmentLoader::new()
        .with_locations(Vec::<std::path::PathBuf>::new())
        .without_env()
        .with_file(&path)
        .binder()
        .unwrap();
    let error = binder.bind("server.port", &Bindable::of::<u16>()).unwrap_err();
    let invalid = error.as_invalid_value().unwrap();
    match invalid.origin() {
        Some(Origin::TextResource {
            resource,
            location: Some(location),
        }) => {
            assert!(resource.ends_with("app.properties]"));
            assert_eq!(location.line(), 1);
            assert_eq!(location.column(), 12);
        }
        other => panic!("unexpected origin {other:?}"),
    }
}

#[test]
fn test_missing_explicit_file() {
    let dir = TempDir::new().unwrap();
    let error = EnvironmentLoader::new()
        .without_env()
        .with_file(dir.path().join("missing.properties"))
        .load_sources()
        .unwrap_err();
    assert!(matches!(error, LoadError::Io { .. }));

    let error = load_file(&dir.path().join("config.toml")).unwrap_err();
    assert!(matches!(error, LoadError::UnsupportedFormat(_)));
}

#[test]
fn test_environment_list_binding() {
    with_vars(
        [("LISTAPP_APP_HOSTS_0", Some("a")), ("LISTAPP_APP_HOSTS_1", Some("b"))],
        || {
            let binder = EnvironmentLoader::new()
                .with_locations(Vec::<std::path::PathBuf>::new())
                .with_env_prefix("LISTAPP")
                .binder()
                .unwrap();
            let hosts = binder
                .bind_as::<Vec<String>>("app.hosts")
                .unwrap()
                .into_option()
                .unwrap();
            assert_eq!(hosts, vec!["a".to_string(), "b".to_string()]);
        },
    );
}
