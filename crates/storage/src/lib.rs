// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! insights-storage: file spool and PostgreSQL sink

mod db;
mod models;
mod sink;
pub mod spool;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use db::{quote_identifier, Database, DbConfig, SinkError};
pub use models::{LegacyReport, TargetedReport};
pub use sink::ReportSink;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeSink, FakeUpload};
