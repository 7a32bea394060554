// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desktop tool audit trail: `<workspace>/.msgcode/desktop_sessions.ndjson`
//! (named in the filesystem layout, spec §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DesktopLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesktopSessionRecord {
    pub timestamp: DateTime<Utc>,
    pub tool: String,
    pub workspace_path: PathBuf,
    pub ok: bool,
    pub summary: String,
}

pub fn desktop_log_path(workspace: &Path) -> PathBuf {
    workspace.join(".msgcode").join("desktop_sessions.ndjson")
}

pub fn append_desktop_record(workspace: &Path, record: &DesktopSessionRecord) -> Result<(), DesktopLogError> {
    let path = desktop_log_path(workspace);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    let line = serde_json::to_string(record).map_err(|e| std::io::Error::other(e.to_string()))?;
    writeln!(file, "{line}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn appends_one_line_per_record() {
        let dir = TempDir::new().unwrap();
        let record = DesktopSessionRecord {
            timestamp: Utc::now(),
            tool: "desktop".into(),
            workspace_path: dir.path().to_path_buf(),
            ok: true,
            summary: "clicked button".into(),
        };
        append_desktop_record(dir.path(), &record).unwrap();
        append_desktop_record(dir.path(), &record).unwrap();
        let content = fs::read_to_string(desktop_log_path(dir.path())).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
