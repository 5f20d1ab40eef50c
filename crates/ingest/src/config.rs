// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effective ingest-daemon settings.
//!
//! Resolution order: command-line flag, then service-config file,
//! then built-in default.

use std::path::PathBuf;
use std::time::Duration;

use insights_config::ServiceFile;
use insights_storage::DbConfig;

use crate::processor::DEFAULT_MAX_IN_FLIGHT;

pub const DEFAULT_REPORTS_DIR: &str = "/var/lib/ubuntu-insights/reports";
pub const DEFAULT_METRICS_HOST: &str = "0.0.0.0";
pub const DEFAULT_METRICS_PORT: u16 = 2113;
/// Seconds between processing passes of one worker.
pub const DEFAULT_WORKER_INTERVAL_SECONDS: u64 = 30;
/// Bound on draining collaborators once the supervisor is degraded.
pub const DEFAULT_MAX_DEGRADED_SECONDS: u64 = 5;

/// Flag values that override the service-config file.
#[derive(Debug, Clone, Default)]
pub struct IngestOverrides {
    pub reports_dir: Option<PathBuf>,
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub db_name: Option<String>,
    pub db_sslmode: Option<String>,
    pub metrics_host: Option<String>,
    pub metrics_port: Option<u16>,
}

/// Fully resolved ingest-daemon configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Path to the allow-list (daemon config) JSON file.
    pub daemon_config: PathBuf,
    pub reports_dir: PathBuf,
    pub database: DbConfig,
    pub metrics_host: String,
    pub metrics_port: u16,
    pub worker_interval: Duration,
    pub max_in_flight: usize,
    pub max_degraded: Duration,
}

impl IngestConfig {
    pub fn resolve(
        daemon_config: PathBuf,
        overrides: IngestOverrides,
        file: &ServiceFile,
    ) -> Self {
        let defaults = DbConfig::default();
        Self {
            daemon_config,
            reports_dir: overrides
                .reports_dir
                .or_else(|| file.reports_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORTS_DIR)),
            database: DbConfig {
                host: overrides
                    .db_host
                    .or_else(|| file.database.host.clone())
                    .unwrap_or(defaults.host),
                port: overrides
                    .db_port
                    .or(file.database.port)
                    .unwrap_or(defaults.port),
                user: overrides
                    .db_user
                    .or_else(|| file.database.user.clone())
                    .unwrap_or(defaults.user),
                password: overrides
                    .db_password
                    .or_else(|| file.database.password.clone())
                    .unwrap_or(defaults.password),
                name: overrides
                    .db_name
                    .or_else(|| file.database.name.clone())
                    .unwrap_or(defaults.name),
                sslmode: overrides
                    .db_sslmode
                    .or_else(|| file.database.sslmode.clone())
                    .unwrap_or(defaults.sslmode),
            },
            metrics_host: overrides
                .metrics_host
                .or_else(|| file.metrics.host.clone())
                .unwrap_or_else(|| DEFAULT_METRICS_HOST.to_string()),
            metrics_port: overrides
                .metrics_port
                .or(file.metrics.port)
                .unwrap_or(DEFAULT_METRICS_PORT),
            worker_interval: Duration::from_secs(DEFAULT_WORKER_INTERVAL_SECONDS),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            max_degraded: Duration::from_secs(DEFAULT_MAX_DEGRADED_SECONDS),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
