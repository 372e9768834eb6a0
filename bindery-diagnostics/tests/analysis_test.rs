//! End-to-end failure analysis over loaded sources

use bindery_core::Bindable;
use bindery_diagnostics::*;
use bindery_loader::EnvironmentLoader;
use std::fs;
use tempfile::TempDir;

fn loader(dir: &TempDir, args: &[&str]) -> EnvironmentLoader {
    EnvironmentLoader::new()
        .with_locations([dir.path()])
        .without_env()
        .with_args(args.iter().copied())
}

#[test]
fn test_invalid_value_lists_shadowed_sources() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("application.properties");
    fs::write(&file, "app.port=8080\n").unwrap();

    let sources = loader(&dir, &["--app.port=eighty"]).load().unwrap();
    let binder = bindery_core::Binder::new(sources.clone());
    let error = binder.bind("app.port", &Bindable::of::<u16>()).unwrap_err();

    let analysis = default_analyzers(sources).analyze(&error).unwrap();
    let description = analysis.description();
    assert!(description.starts_with(
        "Invalid value 'eighty' for configuration property 'app.port' (originating from \
         '\"--app.port=eighty\" from command line argument 0'). Validation failed for the following reason:"
    ));
    let shadowed = format!(
        "\t- In 'file [{}]' with the value '8080' (originating from 'file [{}] - 1:10').\n",
        file.display(),
        file.display()
    );
    assert!(description.ends_with(&shadowed), "{description}");
    assert_eq!(analysis.action(), "Review the value of the property with the provided reason.");
}

#[test]
fn test_higher_priority_value_binds() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("application.yaml"), "app:\n  threshold: 5\n").unwrap();
    let binder = loader(&dir, &["--app.threshold=7"]).binder().unwrap();
    let threshold = binder.bind_as::<u32>("app.threshold").unwrap().into_option();
    assert_eq!(threshold, Some(7));
}

#[test]
fn test_report_and_json() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("application.properties"), "app.timeout=soon\n").unwrap();
    let sources = loader(&dir, &[]).load().unwrap();
    let binder = bindery_core::Binder::new(sources.clone());
    let error = binder
        .bind("app.timeout", &Bindable::of::<std::time::Duration>())
        .unwrap_err();

    let analysis = default_analyzers(sources).analyze(&error).unwrap();
    let message = build_message(&analysis);
    assert!(message.contains("APPLICATION FAILED TO START"));
    assert!(message.contains("Invalid value 'soon' for configuration property 'app.timeout'"));
    assert!(!message.contains("Additionally"));
    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["action"], analysis.action());
    assert_eq!(json["description"], analysis.description());
}
