//! Ingest daemon CLI specs
//!
//! Subcommands, help output, and startup failure exit codes.

use crate::prelude::*;

#[test]
fn help_shows_subcommands_and_flags() {
    ingest()
        .args(&["--help"])
        .passes()
        .stdout_has("Usage:")
        .stdout_has("migrate")
        .stdout_has("version")
        .stdout_has("--daemon-config")
        .stdout_has("--db-host");
}

#[test]
fn version_subcommand_prints_version() {
    ingest()
        .args(&["version"])
        .passes()
        .stdout_has("insights-ingest 0.1");
}

#[test]
fn version_flag_prints_version() {
    ingest().args(&["--version"]).passes().stdout_has("0.1");
}

#[test]
fn run_without_daemon_config_is_a_runtime_error() {
    ingest().fails_with(1).stderr_has("daemon-config");
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    ingest().args(&["frobnicate"]).fails_with(2);
}

#[test]
fn migrate_help_names_the_directory_argument() {
    ingest()
        .args(&["migrate", "--help"])
        .passes()
        .stdout_has("DIR");
}
