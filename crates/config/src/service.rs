// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service configuration file (YAML).
//!
//! Every field is optional: binaries resolve effective settings as
//! flag value, then file value, then built-in default.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::allow_list::ConfigError;

/// Process-wide options shared by the web and ingest services.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ServiceFile {
    /// 0-2; maps to info/debug/trace.
    pub verbosity: Option<u8>,
    pub reports_dir: Option<PathBuf>,
    pub database: DatabaseSection,
    pub listen: ListenSection,
    pub metrics: ListenSection,
    pub timeouts: TimeoutsSection,
    pub max_header_bytes: Option<usize>,
    pub max_upload_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct DatabaseSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub sslmode: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ListenSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct TimeoutsSection {
    pub read_seconds: Option<u64>,
    pub write_seconds: Option<u64>,
    pub request_seconds: Option<u64>,
}

impl ServiceFile {
    /// Parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Parse `path` when given, defaults otherwise.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
