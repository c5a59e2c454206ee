//! Tests running the `todoist-mcp` binary.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run the binary isolated from the user's environment, config and `.env`.
fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_todoist-mcp"))
        .args(args)
        .current_dir(dir)
        .env_remove("TODOIST_API_TOKEN")
        .env_remove("TRANSPORT")
        .env_remove("HOST")
        .env_remove("PORT")
        .env_remove("RUST_LOG")
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("config"))
        .output()
        .expect("failed to run todoist-mcp")
}

#[test]
fn test_serve_without_token_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");

    let output = run(
        dir.path(),
        &[
            "--config",
            config.to_str().unwrap(),
            "serve",
            "--no-keychain",
        ],
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("TODOIST_API_TOKEN"), "stderr: {}", stderr);
    assert!(output.stdout.is_empty());
}

#[test]
fn test_blank_token_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");

    let output = run(
        dir.path(),
        &[
            "--config",
            config.to_str().unwrap(),
            "serve",
            "--no-keychain",
            "--token",
            "   ",
        ],
    );

    assert!(!output.status.success());
}

#[test]
fn test_invalid_transport_rejected() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["serve", "--transport", "carrier-pigeon"]);
    assert!(!output.status.success());
}

#[test]
fn test_config_set_get_roundtrip() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    let config_arg = config.to_str().unwrap();

    let output = run(
        dir.path(),
        &["--config", config_arg, "config", "set", "server.port", "9100"],
    );
    assert!(output.status.success());
    assert!(config.exists());

    let output = run(
        dir.path(),
        &["--config", config_arg, "config", "get", "server.port"],
    );
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "9100");

    let output = run(
        dir.path(),
        &["--config", config_arg, "config", "get", "server.host"],
    );
    assert!(!output.status.success());
}

#[test]
fn test_config_set_rejects_bad_value() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");

    let output = run(
        dir.path(),
        &[
            "--config",
            config.to_str().unwrap(),
            "config",
            "set",
            "server.port",
            "not-a-port",
        ],
    );
    assert!(!output.status.success());
    assert!(!config.exists());
}

#[test]
fn test_config_path_override() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.toml");

    let output = run(
        dir.path(),
        &["--config", config.to_str().unwrap(), "config", "path"],
    );
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        config.to_str().unwrap()
    );
}
