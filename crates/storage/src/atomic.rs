// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic write-to-temp-then-rename persistence, shared by every store.
//!
//! Grounded on `oj-storage`'s `Snapshot::save`/`load`, generalized from one
//! global snapshot to many independent small stores.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtomicStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write `value` to `path` via `<path>.tmp` then an atomic rename.
pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), AtomicStoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load `path` as JSON. Returns `Ok(None)` if it doesn't exist.
pub fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, AtomicStoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(Some(serde_json::from_reader(reader)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        value: u32,
    }

    #[test]
    fn round_trips_and_leaves_no_tmp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        write_json(&path, &Payload { value: 7 }).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
        let loaded: Payload = read_json(&path).unwrap().unwrap();
        assert_eq!(loaded, Payload { value: 7 });
    }

    #[test]
    fn missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json");
        let loaded: Option<Payload> = read_json(&path).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deep/store.json");
        write_json(&path, &Payload { value: 1 }).unwrap();
        assert!(path.exists());
    }
}
