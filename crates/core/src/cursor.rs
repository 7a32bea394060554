// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ChatCursor`: per-chat monotonic resume pointer (spec §3, §4.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCursor {
    pub chat_guid: String,
    pub last_seen_rowid: i64,
    pub last_message_id: String,
    pub last_seen_at: DateTime<Utc>,
    pub message_count: u64,
}

impl ChatCursor {
    pub fn new(chat_guid: impl Into<String>) -> Self {
        Self {
            chat_guid: chat_guid.into(),
            last_seen_rowid: 0,
            last_message_id: String::new(),
            last_seen_at: Utc::now(),
            message_count: 0,
        }
    }

    /// Advance the cursor, ignoring updates that would decrease
    /// `last_seen_rowid` (invariant: it never decreases).
    pub fn advance(&mut self, rowid: i64, message_id: impl Into<String>) {
        if rowid < self.last_seen_rowid {
            return;
        }
        self.last_seen_rowid = rowid;
        self.last_message_id = message_id.into();
        self.last_seen_at = Utc::now();
        self.message_count += 1;
    }
}
