// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread Store (C6): human-readable Markdown transcript per conversation (spec §4.6).

use chrono::Utc;
use msgcode_core::ThreadInfo;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThreadStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

const TITLE_MAX_CHARS: usize = 24;
const STRIPPED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

fn sanitize_title(first_user_message: &str) -> String {
    let stripped: String = first_user_message.chars().filter(|c| !STRIPPED_CHARS.contains(c)).collect();
    let trimmed: String = stripped.trim().chars().take(TITLE_MAX_CHARS).collect();
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed
    }
}

/// Per-process cache of the active thread per chat. An empty/missing entry
/// means the next user message starts a new thread file.
pub struct ThreadStore {
    threads_dir: PathBuf,
    active: Mutex<HashMap<String, ThreadInfo>>,
}

impl ThreadStore {
    pub fn new(workspace: &Path) -> Self {
        Self {
            threads_dir: workspace.join(".msgcode").join("threads"),
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Drop the cached thread for `chat_id` so the next user message starts
    /// a new file (`/clear`).
    pub fn reset_thread(&self, chat_id: &str) {
        self.active.lock().remove(chat_id);
    }

    fn next_file_path(&self, first_user_message: &str, metadata: &ThreadMeta) -> Result<PathBuf, ThreadStoreError> {
        fs::create_dir_all(&self.threads_dir)?;
        let date = Utc::now().format("%Y-%m-%d");
        let title = sanitize_title(first_user_message);
        let base = format!("{date}_{title}");
        let mut candidate = self.threads_dir.join(format!("{base}.md"));
        let mut n = 2;
        while candidate.exists() {
            candidate = self.threads_dir.join(format!("{base}-{n}.md"));
            n += 1;
        }
        let _ = metadata;
        Ok(candidate)
    }

    /// Append a user/assistant turn, creating a new thread file on the
    /// first user message of a thread.
    pub fn append_turn(
        &self,
        chat_id: &str,
        workspace_path: &Path,
        meta: &ThreadMeta,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<ThreadInfo, ThreadStoreError> {
        let mut active = self.active.lock();
        let info = if let Some(info) = active.get(chat_id).cloned() {
            info
        } else {
            let file_path = self.next_file_path(user_text, meta)?;
            let thread_id = uuid::Uuid::new_v4().to_string();
            let info = ThreadInfo {
                thread_id: thread_id.clone(),
                chat_id: chat_id.to_string(),
                workspace_path: workspace_path.to_path_buf(),
                file_path: file_path.clone(),
                turn_count: 0,
                created_at: Utc::now(),
            };
            let front_matter = format!(
                "---\nthreadId: {}\nchatId: {}\nworkspace: {}\nworkspacePath: {}\ncreatedAt: {}\nruntimeKind: {}\nagentProvider: {}\ntmuxClient: {}\n---\n",
                thread_id,
                chat_id,
                meta.workspace_label,
                workspace_path.display(),
                info.created_at.to_rfc3339(),
                meta.runtime_kind,
                meta.agent_provider,
                meta.tmux_client,
            );
            fs::write(&file_path, front_matter)?;
            info
        };

        let turn_no = info.turn_count + 1;
        let turn = format!(
            "\n## Turn {} - {}\n\n### User\n{}\n\n### Assistant\n{}\n",
            turn_no,
            Utc::now().to_rfc3339(),
            user_text,
            assistant_text,
        );
        let mut file = fs::OpenOptions::new().append(true).open(&info.file_path)?;
        use std::io::Write;
        file.write_all(turn.as_bytes())?;

        let updated = ThreadInfo { turn_count: turn_no, ..info };
        active.insert(chat_id.to_string(), updated.clone());
        Ok(updated)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ThreadMeta {
    pub workspace_label: String,
    pub runtime_kind: String,
    pub agent_provider: String,
    pub tmux_client: String,
}
