// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application tags: allow-list identifiers, spool subdirectory names,
//! and per-app table names.

use serde::{Deserialize, Serialize};

/// Prefix marking legacy Ubuntu-Report applications.
pub const LEGACY_PREFIX: &str = "ubuntu-report/";

/// Distribution and version extracted from a legacy app tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTarget {
    pub distribution: String,
    pub version: String,
}

/// An application identifier as registered in the allow-list.
///
/// The same string names the spool subdirectory under the reports root
/// and (for non-legacy apps) the per-app database table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppTag(String);

impl AppTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for `ubuntu-report/...` tags, which route to the shared
    /// legacy table instead of a per-app table.
    pub fn is_legacy(&self) -> bool {
        self.0.starts_with(LEGACY_PREFIX)
    }

    /// Parse `ubuntu-report/<distribution>/desktop/<version>`.
    ///
    /// Returns `None` for non-legacy tags and for legacy tags that do
    /// not match the expected shape.
    pub fn legacy_target(&self) -> Option<LegacyTarget> {
        let rest = self.0.strip_prefix(LEGACY_PREFIX)?;
        let mut parts = rest.split('/');
        let distribution = parts.next().filter(|s| !s.is_empty())?;
        if parts.next() != Some("desktop") {
            return None;
        }
        let version = parts.next().filter(|s| !s.is_empty())?;
        if parts.next().is_some() {
            return None;
        }
        Some(LegacyTarget {
            distribution: distribution.to_string(),
            version: version.to_string(),
        })
    }

    /// True when the tag is safe to use as a path below the reports
    /// root: every `/`-separated segment is non-empty and neither `.`
    /// nor `..`, and no segment smuggles a Windows separator.
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && self
                .0
                .split('/')
                .all(|seg| !seg.is_empty() && seg != "." && seg != ".." && !seg.contains('\\'))
    }
}

impl std::fmt::Display for AppTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AppTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AppTag {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
#[path = "app_tests.rs"]
mod tests;
