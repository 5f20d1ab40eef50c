// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PostgreSQL sink.
//!
//! One insert per upload, keyed by the per-upload UUID. All values are
//! bind parameters; the only interpolated fragment is the per-app
//! table name, which must pass [`quote_identifier`] and is expected to
//! have been checked against the allow-list by the caller.

use std::path::Path;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::{LegacyReport, TargetedReport};
use crate::sink::ReportSink;

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// SQLSTATE for `undefined_table`.
const UNDEFINED_TABLE: &str = "42P01";

/// Errors that can occur in sink operations.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("table for '{0}' does not exist")]
    MissingTable(String),
    #[error("invalid table name: '{0}'")]
    InvalidTableName(String),
    #[error("invalid sslmode: '{0}'")]
    InvalidSslMode(String),
}

/// Database connection settings, resolved from flags and config file.
#[derive(Debug, Clone, PartialEq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub sslmode: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            name: "insights".to_string(),
            sslmode: "prefer".to_string(),
        }
    }
}

impl DbConfig {
    fn connect_options(&self) -> Result<PgConnectOptions, SinkError> {
        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.name)
            .ssl_mode(parse_ssl_mode(&self.sslmode)?);
        if !self.password.is_empty() {
            options = options.password(&self.password);
        }
        Ok(options)
    }
}

fn parse_ssl_mode(raw: &str) -> Result<PgSslMode, SinkError> {
    Ok(match raw {
        "disable" => PgSslMode::Disable,
        "allow" => PgSslMode::Allow,
        "prefer" => PgSslMode::Prefer,
        "require" => PgSslMode::Require,
        "verify-ca" => PgSslMode::VerifyCa,
        "verify-full" => PgSslMode::VerifyFull,
        other => return Err(SinkError::InvalidSslMode(other.to_string())),
    })
}

/// Quote `name` for use as a table identifier.
///
/// Accepts only `[A-Za-z0-9_-]`; everything else is rejected so that
/// an allow-list entry can never smuggle SQL into the statement.
pub fn quote_identifier(name: &str) -> Result<String, SinkError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(SinkError::InvalidTableName(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}

/// Pooled PostgreSQL connection shared by all workers.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect and build the shared pool.
    pub async fn connect(config: &DbConfig) -> Result<Self, SinkError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(config.connect_options()?)
            .await?;
        debug!(host = %config.host, db = %config.name, "database pool ready");
        Ok(Self { pool })
    }

    /// Run the SQL migrations under `dir`.
    pub async fn migrate(&self, dir: &Path) -> Result<(), SinkError> {
        let migrator = Migrator::new(dir).await?;
        migrator.run(&self.pool).await?;
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn map_insert_error(target: &str, error: sqlx::Error) -> SinkError {
        if let sqlx::Error::Database(ref db) = error {
            if db.code().as_deref() == Some(UNDEFINED_TABLE) {
                return SinkError::MissingTable(target.to_string());
            }
        }
        SinkError::Database(error)
    }
}

#[async_trait::async_trait]
impl ReportSink for Database {
    async fn upload(&self, id: Uuid, app: &str, report: &TargetedReport) -> Result<(), SinkError> {
        let table = quote_identifier(app)?;
        let sql = format!(
            "INSERT INTO {table} \
             (id, optout, insights_version, collection_time, hardware, software, platform, source_metrics) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(report.opt_out)
            .bind(report.insights_version.as_deref())
            .bind(report.collection_time)
            .bind(report.hardware.as_ref())
            .bind(report.software.as_ref())
            .bind(report.platform.as_ref())
            .bind(report.source_metrics.as_ref())
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_insert_error(app, e))?;
        Ok(())
    }

    async fn upload_legacy(
        &self,
        id: Uuid,
        distribution: &str,
        version: &str,
        report: &LegacyReport,
    ) -> Result<(), SinkError> {
        sqlx::query(
            "INSERT INTO ubuntu_report (id, distribution, version, optout, report) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(distribution)
        .bind(version)
        .bind(report.opt_out)
        .bind(report.report.as_ref())
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_insert_error("ubuntu_report", e))?;
        Ok(())
    }

    async fn upload_invalid(&self, id: Uuid, app: &str, raw_report: &str) -> Result<(), SinkError> {
        sqlx::query("INSERT INTO invalid_reports (id, app_name, raw_report) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(app)
            .bind(raw_report)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_insert_error("invalid_reports", e))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
