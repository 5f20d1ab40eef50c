//! Web service CLI specs
//!
//! Flag parsing, help output, and startup failure exit codes.

use crate::prelude::*;

#[test]
fn help_shows_usage_and_flags() {
    web()
        .args(&["--help"])
        .passes()
        .stdout_has("Usage:")
        .stdout_has("--daemon-config")
        .stdout_has("--listen-port")
        .stdout_has("--max-upload-bytes");
}

#[test]
fn version_flag_prints_version() {
    web().args(&["--version"]).passes().stdout_has("0.1");
}

#[test]
fn missing_daemon_config_flag_is_a_usage_error() {
    web().fails_with(2).stderr_has("--daemon-config");
}

#[test]
fn unknown_flag_is_a_usage_error() {
    web()
        .args(&["--daemon-config", "x.json", "--no-such-flag"])
        .fails_with(2);
}

#[test]
fn missing_allow_list_file_is_a_runtime_error() {
    web()
        .args(&["--daemon-config", "/nonexistent/allow.json"])
        .fails_with(1);
}

#[test]
fn malformed_service_config_is_a_runtime_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("service.yaml");
    std::fs::write(&config, "listen: [not, a, mapping]\n").unwrap();

    web()
        .args(&[
            "--daemon-config",
            "allow.json",
            "--config",
            config.to_str().unwrap(),
        ])
        .fails_with(1)
        .stderr_has("service config");
}
