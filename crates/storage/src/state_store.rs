// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State Store (C3): per-chat resume cursor (spec §4.3).

use crate::atomic::{read_json, write_json, AtomicStoreError};
use msgcode_core::ChatCursor;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

const VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error(transparent)]
    Store(#[from] AtomicStoreError),
    #[error("state store version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("corrupt state file: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StateFile {
    version: u32,
    chats: HashMap<String, ChatCursor>,
}

pub struct StateStore {
    path: PathBuf,
    chats: HashMap<String, ChatCursor>,
}

impl StateStore {
    /// Corrupt JSON is a fatal load error (spec §4.3, §7 `CORRUPT_STATE`).
    pub fn load(path: &Path) -> Result<Self, StateStoreError> {
        let chats = match read_json::<StateFile>(path) {
            Ok(Some(file)) => {
                if file.version != VERSION {
                    return Err(StateStoreError::VersionMismatch {
                        expected: VERSION,
                        found: file.version,
                    });
                }
                file.chats
            }
            Ok(None) => HashMap::new(),
            Err(e) => return Err(StateStoreError::Corrupt(e.to_string())),
        };
        Ok(Self { path: path.to_path_buf(), chats })
    }

    pub fn save(&self) -> Result<(), StateStoreError> {
        let file = StateFile {
            version: VERSION,
            chats: self.chats.clone(),
        };
        write_json(&self.path, &file)?;
        Ok(())
    }

    pub fn get_chat_state(&self, chat_id: &str) -> Option<&ChatCursor> {
        self.chats.get(chat_id)
    }

    /// Monotonic; ignores updates that would decrease `last_seen_rowid`.
    pub fn update_last_seen(&mut self, chat_id: &str, rowid: i64, msg_id: &str) {
        let cursor = self
            .chats
            .entry(chat_id.to_string())
            .or_insert_with(|| ChatCursor::new(chat_id));
        cursor.advance(rowid, msg_id);
    }

    pub fn reset_chat_state(&mut self, chat_id: &str) {
        self.chats.remove(chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn update_last_seen_is_monotonic_across_calls() {
        let dir = TempDir::new().unwrap();
        let mut store = StateStore::load(&dir.path().join("state.json")).unwrap();
        store.update_last_seen("c1", 10, "m10");
        store.update_last_seen("c1", 4, "m4");
        assert_eq!(store.get_chat_state("c1").unwrap().last_seen_rowid, 10);
    }

    #[test]
    fn save_and_reload_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let mut store = StateStore::load(&path).unwrap();
        store.update_last_seen("c1", 5, "m5");
        store.save().unwrap();

        let reloaded = StateStore::load(&path).unwrap();
        assert_eq!(reloaded.get_chat_state("c1").unwrap().last_seen_rowid, 5);
    }

    #[test]
    fn reset_drops_chat_state() {
        let dir = TempDir::new().unwrap();
        let mut store = StateStore::load(&dir.path().join("state.json")).unwrap();
        store.update_last_seen("c1", 5, "m5");
        store.reset_chat_state("c1");
        assert!(store.get_chat_state("c1").is_none());
    }

    #[test]
    fn corrupt_json_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not valid json").unwrap();
        let err = StateStore::load(&path).unwrap_err();
        assert!(matches!(err, StateStoreError::Corrupt(_)));
    }

    #[test]
    fn version_mismatch_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"version":2,"chats":{}}"#).unwrap();
        let err = StateStore::load(&path).unwrap_err();
        assert!(matches!(err, StateStoreError::VersionMismatch { .. }));
    }
}
