// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SOUL resolution (spec §9 "SOUL precedence"): workspace `SOUL.md` beats
//! the active global soul, which beats none.

use msgcode_core::{SoulResolution, SoulSource};
use std::path::{Path, PathBuf};

fn workspace_soul_path(workspace: &Path) -> PathBuf {
    workspace.join(".msgcode").join("SOUL.md")
}

fn active_soul_path(config_dir: &Path) -> PathBuf {
    config_dir.join("souls").join("active.json")
}

fn global_soul_path(config_dir: &Path, id: &str) -> PathBuf {
    config_dir.join("souls").join("default").join(format!("{id}.md"))
}

fn read_nonempty(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    if content.trim().is_empty() {
        None
    } else {
        Some(content)
    }
}

/// Resolves the active SOUL for a workspace: workspace `SOUL.md` > active
/// global soul under `<configDir>/souls/` > none.
pub fn resolve_soul(workspace: &Path, config_dir: &Path) -> SoulResolution {
    let ws_path = workspace_soul_path(workspace);
    if let Some(content) = read_nonempty(&ws_path) {
        return SoulResolution {
            source: SoulSource::Workspace,
            chars: content.chars().count(),
            content,
            path: Some(ws_path),
        };
    }

    if let Some(raw) = std::fs::read_to_string(active_soul_path(config_dir)).ok() {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw) {
            if let Some(id) = value.get("id").and_then(serde_json::Value::as_str) {
                let soul_path = global_soul_path(config_dir, id);
                if let Some(content) = read_nonempty(&soul_path) {
                    return SoulResolution {
                        source: SoulSource::Global,
                        chars: content.chars().count(),
                        content,
                        path: Some(soul_path),
                    };
                }
            }
        }
    }

    SoulResolution::none()
}
