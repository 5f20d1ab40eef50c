//! Behavioral specifications for the Ubuntu Insights server binaries.
//!
//! These tests are black-box: they invoke the built binaries and
//! verify stdout, stderr, and exit codes. Nothing here needs a
//! database or open ports.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// web/
#[path = "specs/web/cli.rs"]
mod web_cli;

// ingest/
#[path = "specs/ingest/cli.rs"]
mod ingest_cli;
