// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! insights-ingest: the spool-to-database ingest daemon

pub mod config;
pub mod processor;
pub mod service;
pub mod worker;

pub use config::IngestConfig;
pub use processor::{ProcessError, Processor};
pub use service::{IngestService, ServiceError, SupervisorState};
