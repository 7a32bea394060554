// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `RouteEntry`: a binding of a chat to a workspace (spec §3, §4.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    Active,
    Paused,
    Archived,
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteStatus::Active => write!(f, "active"),
            RouteStatus::Paused => write!(f, "paused"),
            RouteStatus::Archived => write!(f, "archived"),
        }
    }
}

/// The persisted binding of a `chatGuid` to a workspace directory.
///
/// Unique by `chat_guid`. Created by `/bind`, mutated by `/unbind`,
/// deleted only by an administrative operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEntry {
    pub chat_guid: String,
    pub chat_id: String,
    pub workspace_path: std::path::PathBuf,
    pub label: String,
    pub bot_type: String,
    pub status: RouteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_matches_json_rename() {
        assert_eq!(RouteStatus::Active.to_string(), "active");
        let json = serde_json::to_string(&RouteStatus::Archived).unwrap();
        assert_eq!(json, "\"archived\"");
    }
}
