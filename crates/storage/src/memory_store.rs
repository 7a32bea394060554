// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace memory: the persistent key-value store backing the `mem` tool.
//!
//! Named in the workspace on-disk state list (spec §1: "bindings, session
//! windows, summaries, thread transcripts, memory, SOUL persona, tool
//! policy") but not otherwise detailed in the distilled spec body.

use crate::atomic::{read_json, write_json, AtomicStoreError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryStoreError {
    #[error(transparent)]
    Store(#[from] AtomicStoreError),
}

pub fn memory_path(workspace: &Path) -> PathBuf {
    workspace.join(".msgcode").join("memory.json")
}

pub struct MemoryStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn load(workspace: &Path) -> Result<Self, MemoryStoreError> {
        let path = memory_path(workspace);
        let entries = read_json::<BTreeMap<String, String>>(&path)?.unwrap_or_default();
        Ok(Self { path, entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), MemoryStoreError> {
        self.entries.insert(key.into(), value.into());
        write_json(&self.path, &self.entries)?;
        Ok(())
    }

    pub fn list(&self) -> Vec<(&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    pub fn delete(&mut self, key: &str) -> Result<bool, MemoryStoreError> {
        let removed = self.entries.remove(key).is_some();
        if removed {
            write_json(&self.path, &self.entries)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn set_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut store = MemoryStore::load(dir.path()).unwrap();
        store.set("favorite_color", "blue").unwrap();
        assert_eq!(store.get("favorite_color"), Some("blue"));
    }

    #[test]
    fn persists_across_reloads() {
        let dir = TempDir::new().unwrap();
        let mut store = MemoryStore::load(dir.path()).unwrap();
        store.set("k", "v").unwrap();
        let reloaded = MemoryStore::load(dir.path()).unwrap();
        assert_eq!(reloaded.get("k"), Some("v"));
    }

    #[test]
    fn delete_removes_entry() {
        let dir = TempDir::new().unwrap();
        let mut store = MemoryStore::load(dir.path()).unwrap();
        store.set("k", "v").unwrap();
        assert!(store.delete("k").unwrap());
        assert!(store.get("k").is_none());
        assert!(!store.delete("k").unwrap());
    }
}
