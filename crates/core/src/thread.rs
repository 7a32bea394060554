// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ThreadInfo`: metadata for one Markdown transcript file (spec §3, §4.6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub thread_id: String,
    pub chat_id: String,
    pub workspace_path: PathBuf,
    pub file_path: PathBuf,
    pub turn_count: u64,
    pub created_at: DateTime<Utc>,
}
