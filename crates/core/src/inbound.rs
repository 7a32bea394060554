// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `InboundMessage`: the immutable record the transport hands to ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub path: String,
    pub mime: Option<String>,
}

/// A single inbound chat message, as delivered by the transport RPC.
///
/// Immutable: nothing in the ingestion pipeline mutates a received
/// message, only wraps it with routing/cursor context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    pub chat_id: String,
    pub text: String,
    pub sender: String,
    pub handle: String,
    pub is_from_me: bool,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub date: DateTime<Utc>,
}

impl InboundMessage {
    /// Whether this message should be treated as a control command.
    pub fn is_command(&self) -> bool {
        self.text.trim_start().starts_with('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str) -> InboundMessage {
        InboundMessage {
            id: "1".into(),
            chat_id: "any;+;c1".into(),
            text: text.into(),
            sender: "alice".into(),
            handle: "alice@example.com".into(),
            is_from_me: false,
            attachments: vec![],
            date: Utc::now(),
        }
    }

    #[test]
    fn detects_command_prefix() {
        assert!(msg("/bind acme/ops").is_command());
        assert!(!msg("hello there").is_command());
    }

    #[test]
    fn tolerates_leading_whitespace() {
        assert!(msg("  /where").is_command());
    }
}
