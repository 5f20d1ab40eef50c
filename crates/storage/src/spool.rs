// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk report spool.
//!
//! The web service writes `<base>/<app>/<uuid>.json` atomically (write
//! to `.tmp`, sync, rename); the ingest daemon enumerates, reads, and
//! deletes. Readers never see partial contents because `.tmp` names
//! are excluded from enumeration.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Extension of finalized report files.
pub const REPORT_EXT: &str = "json";
/// Extension of in-flight writes; ignored by readers.
pub const TMP_EXT: &str = "tmp";

#[cfg(unix)]
const DIR_MODE: u32 = 0o750;
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Atomically persist `data` as `<base>/<app>/<id>.json`.
///
/// The app directory is created on demand. Returns the final path.
pub fn write_report(base: &Path, app: &str, id: Uuid, data: &[u8]) -> std::io::Result<PathBuf> {
    let dir = base.join(app);
    create_report_dir(&dir)?;

    let tmp = dir.join(format!("{id}.{TMP_EXT}"));
    let path = dir.join(format!("{id}.{REPORT_EXT}"));

    // Write to temp file and sync before the rename makes it visible.
    {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(FILE_MODE);
        }
        let mut file = options.open(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
    }

    fs::rename(&tmp, &path)?;
    Ok(path)
}

fn create_report_dir(dir: &Path) -> std::io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(dir)
}

/// List finalized report files in `dir`, sorted by name.
///
/// A missing directory is an empty spool, not an error.
pub fn list_reports(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut reports = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(REPORT_EXT) {
            continue;
        }
        if entry.file_type()?.is_file() {
            reports.push(path);
        }
    }
    reports.sort();
    Ok(reports)
}

/// Parse the per-upload UUID from a report file name.
pub fn report_id(path: &Path) -> Option<Uuid> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Count and total size in bytes of finalized reports in `dir`.
pub fn dir_stats(dir: &Path) -> std::io::Result<(u64, u64)> {
    let mut count = 0;
    let mut bytes = 0;
    for path in list_reports(dir)? {
        count += 1;
        bytes += fs::metadata(&path)?.len();
    }
    Ok((count, bytes))
}

#[cfg(test)]
#[path = "spool_tests.rs"]
mod tests;
