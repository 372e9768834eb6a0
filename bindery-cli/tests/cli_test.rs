//! Runs the `bindery` binary against files in a temporary directory

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

fn bindery(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bindery"))
        .arg("--location")
        .arg(dir.path())
        .arg("--no-env")
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_get_prefers_command_line() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("application.yaml"), "server:\n  port: 8080\n").unwrap();

    let output = bindery(&dir, &["get", "server.port", "--type", "uint"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "8080\n");

    let output = bindery(&dir, &["get", "server.port", "--", "--server.port=9090"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "9090\n");
}

#[test]
fn test_explain_invalid_value() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("application.properties"), "server.port=http\n").unwrap();

    let output = bindery(&dir, &["explain", "server.port", "--type", "uint"]);
    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("APPLICATION FAILED TO START"));
    assert!(text.contains("Invalid value 'http' for configuration property 'server.port'"));
    assert!(text.contains("application.properties] - 1:13"));
}

#[test]
fn test_missing_property_fails() {
    let dir = TempDir::new().unwrap();
    let output = bindery(&dir, &["get", "nothing.here"]);
    assert!(!output.status.success());
}
