// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux session adapter, backing the `/start /stop /status /snapshot /esc`
//! verbs of the Session Orchestrator (C14, spec §4.14).

use super::{SessionAdapter, SessionError};
use crate::subprocess::TMUX_TIMEOUT;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

#[derive(Clone, Default)]
pub struct TmuxAdapter;

impl TmuxAdapter {
    pub fn new() -> Self {
        Self
    }

    fn session_id(name: &str) -> String {
        format!("msgcode-{name}")
    }
}

#[async_trait]
impl SessionAdapter for TmuxAdapter {
    async fn spawn(&self, name: &str, cwd: &Path, cmd: &str) -> Result<String, SessionError> {
        if !cwd.exists() {
            return Err(SessionError::SpawnFailed(format!(
                "working directory does not exist: {}",
                cwd.display()
            )));
        }
        let session_id = Self::session_id(name);

        let existing = tokio::time::timeout(
            TMUX_TIMEOUT,
            Command::new("tmux").args(["has-session", "-t", &session_id]).output(),
        )
        .await;
        if matches!(existing, Ok(Ok(out)) if out.status.success()) {
            tracing::warn!(session_id, "session already exists, killing first");
            let _ = Command::new("tmux").args(["kill-session", "-t", &session_id]).output().await;
        }

        let mut tmux_cmd = Command::new("tmux");
        tmux_cmd.arg("new-session").arg("-d").arg("-s").arg(&session_id).arg("-c").arg(cwd).arg(cmd);

        let output = tokio::time::timeout(TMUX_TIMEOUT, tmux_cmd.output())
            .await
            .map_err(|_| SessionError::SpawnFailed("tmux new-session timed out".into()))?
            .map_err(|e| SessionError::SpawnFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SessionError::SpawnFailed(stderr.to_string()));
        }
        Ok(session_id)
    }

    async fn send(&self, id: &str, input: &str) -> Result<(), SessionError> {
        let output = Command::new("tmux")
            .args(["send-keys", "-t", id, input, "Enter"])
            .output()
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(SessionError::CommandFailed(String::from_utf8_lossy(&output.stderr).to_string()));
        }
        Ok(())
    }

    async fn capture(&self, id: &str) -> Result<String, SessionError> {
        let output = Command::new("tmux")
            .args(["capture-pane", "-t", id, "-p"])
            .output()
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn kill(&self, id: &str) -> Result<(), SessionError> {
        let output = Command::new("tmux")
            .args(["kill-session", "-t", id])
            .output()
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn send_escape(&self, id: &str) -> Result<(), SessionError> {
        let output = Command::new("tmux")
            .args(["send-keys", "-t", id, "Escape"])
            .output()
            .await
            .map_err(|e| SessionError::CommandFailed(e.to_string()))?;
        if !output.status.success() {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn is_alive(&self, id: &str) -> bool {
        Command::new("tmux")
            .args(["has-session", "-t", id])
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}
