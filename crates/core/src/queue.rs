// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `QueuedMessage`: in-memory-only steer/follow-up intervention item (spec §3, §4.9).

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl QueuedMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}
