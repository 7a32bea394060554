// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ToolPolicy` / `ToolEvent`: the tool bus data model (spec §3, §4.8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolSource {
    SlashCommand,
    LlmToolCall,
    MediaPipeline,
    Internal,
}

impl fmt::Display for ToolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolSource::SlashCommand => "slash-command",
            ToolSource::LlmToolCall => "llm-tool-call",
            ToolSource::MediaPipeline => "media-pipeline",
            ToolSource::Internal => "internal",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolMode {
    Explicit,
    Autonomous,
}

/// Derived tool policy. Never mutated after derivation from `WorkspaceConfig`.
#[derive(Debug, Clone)]
pub struct ToolPolicy {
    pub mode: ToolMode,
    pub allow: HashSet<String>,
    pub require_confirm: HashSet<String>,
}

impl ToolPolicy {
    /// The stable minimal default allow-list per spec §9's open-question
    /// resolution: `explicit` mode, `{tts, asr, vision}` allowed.
    pub fn default_minimal() -> Self {
        Self {
            mode: ToolMode::Explicit,
            allow: ["tts", "asr", "vision"].iter().map(|s| s.to_string()).collect(),
            require_confirm: HashSet::new(),
        }
    }

    /// Derives the active policy from a workspace's persisted config
    /// (spec §4.7/§4.8: `tooling.mode`, `tooling.allow`, `tooling.require_confirm`).
    pub fn from_workspace_config(config: &crate::config::WorkspaceConfig) -> Self {
        let mode = if config.tooling_mode() == "autonomous" {
            ToolMode::Autonomous
        } else {
            ToolMode::Explicit
        };
        Self {
            mode,
            allow: config.tooling_allow().into_iter().collect(),
            require_confirm: config.tooling_require_confirm().into_iter().collect(),
        }
    }
}

/// A single recorded tool invocation, stored in the bounded telemetry ring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEvent {
    pub request_id: String,
    pub workspace_path: std::path::PathBuf,
    pub tool: String,
    pub source: ToolSource,
    pub duration_ms: u64,
    pub ok: bool,
    pub error_code: Option<String>,
    pub artifact_paths: Vec<std::path::PathBuf>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_minimal_is_explicit_with_media_tools() {
        let p = ToolPolicy::default_minimal();
        assert_eq!(p.mode, ToolMode::Explicit);
        assert!(p.allow.contains("tts"));
        assert!(p.allow.contains("asr"));
        assert!(p.allow.contains("vision"));
        assert!(!p.allow.contains("bash"));
    }

    #[test]
    fn source_display_matches_spec_strings() {
        assert_eq!(ToolSource::LlmToolCall.to_string(), "llm-tool-call");
        assert_eq!(ToolSource::MediaPipeline.to_string(), "media-pipeline");
    }

    #[test]
    fn from_workspace_config_reads_tooling_keys() {
        let config = crate::config::WorkspaceConfig::from_json(serde_json::json!({
            "tooling.mode": "autonomous",
            "tooling.allow": ["bash", "read_file"],
        }));
        let policy = ToolPolicy::from_workspace_config(&config);
        assert_eq!(policy.mode, ToolMode::Autonomous);
        assert!(policy.allow.contains("bash"));
        assert!(policy.allow.contains("read_file"));
    }

    #[test]
    fn from_workspace_config_defaults_to_explicit() {
        let config = crate::config::WorkspaceConfig::default();
        let policy = ToolPolicy::from_workspace_config(&config);
        assert_eq!(policy.mode, ToolMode::Explicit);
    }
}
