// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace Config Store (C7): `<workspace>/.msgcode/config.json` persistence (spec §4.7).

use crate::atomic::{read_json, write_json, AtomicStoreError};
use msgcode_core::WorkspaceConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceConfigStoreError {
    #[error(transparent)]
    Store(#[from] AtomicStoreError),
}

pub fn config_path(workspace: &Path) -> PathBuf {
    workspace.join(".msgcode").join("config.json")
}

pub fn load_workspace_config(workspace: &Path) -> Result<WorkspaceConfig, WorkspaceConfigStoreError> {
    let path = config_path(workspace);
    let raw = read_json::<serde_json::Value>(&path)?.unwrap_or(serde_json::json!({}));
    Ok(WorkspaceConfig::from_json(raw))
}

pub fn save_workspace_config(workspace: &Path, config: &WorkspaceConfig) -> Result<(), WorkspaceConfigStoreError> {
    write_json(&config_path(workspace), &config.to_json())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgcode_core::DefaultRunner;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load_workspace_config(dir.path()).unwrap();
        assert_eq!(cfg.runtime_kind(), "agent");
    }

    #[test]
    fn save_then_load_round_trips_modern_keys() {
        let dir = TempDir::new().unwrap();
        let mut cfg = load_workspace_config(dir.path()).unwrap();
        cfg.set_default_runner(DefaultRunner::Openai);
        save_workspace_config(dir.path(), &cfg).unwrap();

        let reloaded = load_workspace_config(dir.path()).unwrap();
        assert_eq!(reloaded.agent_provider(), "openai");
    }
}
