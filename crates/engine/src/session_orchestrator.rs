// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session Orchestrator (C14, spec §4.14): control-verb behaviors that
//! differ between direct agent chat and a tmux-hosted client.

use msgcode_adapters::{SessionAdapter, SessionError};
use msgcode_core::WorkspaceConfig;
use msgcode_storage::{clear_summary, clear_window};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runner {
    Direct,
    Tmux,
}

#[derive(Debug, Clone)]
pub struct ResolvedRunner {
    pub runner: Runner,
    pub blocked_reason: Option<String>,
}

/// `resolveRunner(projectDir)`: picks direct vs tmux from `runtime.kind`,
/// flagging a block when tmux is requested under a local-only egress policy.
pub fn resolve_runner(config: &WorkspaceConfig) -> ResolvedRunner {
    let runner = if config.runtime_kind() == "tmux" { Runner::Tmux } else { Runner::Direct };
    let blocked_reason = if runner == Runner::Tmux && config.policy_mode() != "egress-allowed" {
        Some("egress required: set policy.mode=egress-allowed to use a tmux runner".to_string())
    } else {
        None
    };
    ResolvedRunner { runner, blocked_reason }
}

#[derive(Debug, Clone)]
pub struct VerbResult {
    pub ok: bool,
    pub message: String,
}

impl VerbResult {
    fn ok(message: impl Into<String>) -> Self {
        Self { ok: true, message: message.into() }
    }
    fn err(message: impl Into<String>) -> Self {
        Self { ok: false, message: message.into() }
    }
}

pub struct SessionOrchestrator<'a> {
    pub session_adapter: &'a dyn SessionAdapter,
}

impl<'a> SessionOrchestrator<'a> {
    pub fn new(session_adapter: &'a dyn SessionAdapter) -> Self {
        Self { session_adapter }
    }

    pub async fn start(&self, runner: Runner, session_id: &str, cwd: &Path, cmd: &str) -> VerbResult {
        match runner {
            Runner::Direct => VerbResult::ok("no session needed"),
            Runner::Tmux => match self.session_adapter.spawn(session_id, cwd, cmd).await {
                Ok(_) => VerbResult::ok("session started"),
                Err(e) => VerbResult::err(e.to_string()),
            },
        }
    }

    pub async fn stop(&self, runner: Runner, session_id: &str) -> VerbResult {
        match runner {
            Runner::Direct => VerbResult::ok("no session needed"),
            Runner::Tmux => match self.session_adapter.kill(session_id).await {
                Ok(_) => VerbResult::ok("session stopped"),
                Err(e) => VerbResult::err(e.to_string()),
            },
        }
    }

    pub async fn status(&self, runner: Runner, session_id: &str) -> VerbResult {
        match runner {
            Runner::Direct => VerbResult::ok("direct (no tmux)"),
            Runner::Tmux => {
                let alive = self.session_adapter.is_alive(session_id).await;
                VerbResult::ok(if alive { "tmux session alive" } else { "tmux session not running" })
            }
        }
    }

    pub async fn snapshot(&self, runner: Runner, session_id: &str) -> VerbResult {
        match runner {
            Runner::Direct => VerbResult::err("unsupported in direct runner"),
            Runner::Tmux => match self.session_adapter.capture(session_id).await {
                Ok(pane) => VerbResult::ok(pane),
                Err(e) => VerbResult::err(e.to_string()),
            },
        }
    }

    pub async fn esc(&self, runner: Runner, session_id: &str) -> VerbResult {
        match runner {
            Runner::Direct => VerbResult::err("unsupported in direct runner"),
            Runner::Tmux => match self.session_adapter.send_escape(session_id).await {
                Ok(_) => VerbResult::ok("escape sent"),
                Err(e) => VerbResult::err(e.to_string()),
            },
        }
    }

    /// `/clear`: clear window+summary; tmux additionally restarts the client.
    pub async fn clear(&self, runner: Runner, session_id: &str, workspace: &Path, chat_id: &str, cwd: &Path, cmd: &str) -> VerbResult {
        let cleared = clear_session_artifacts(workspace, chat_id);
        if !cleared.ok {
            return cleared;
        }
        if runner == Runner::Tmux {
            if let Err(e) = self.session_adapter.kill(session_id).await {
                if !matches!(e, SessionError::NotFound(_)) {
                    return VerbResult::err(format!("清理失败: {e}"));
                }
            }
            if let Err(e) = self.session_adapter.spawn(session_id, cwd, cmd).await {
                return VerbResult::err(format!("清理失败: {e}"));
            }
        }
        cleared
    }
}

/// `clearSessionArtifacts`: checks binding, clears window+summary, wraps
/// any internal failure as `{ok:false, error:"清理失败: ..."}` and logs it.
pub fn clear_session_artifacts(workspace: &Path, chat_id: &str) -> VerbResult {
    if workspace.as_os_str().is_empty() {
        return VerbResult::err("未绑定 workspace …");
    }
    match clear_session_files(workspace, chat_id) {
        Ok(()) => VerbResult::ok("已清理会话文件…"),
        Err(e) => {
            warn!(chat_id, workspace = %workspace.display(), error = %e, "clear session artifacts failed");
            VerbResult::err(format!("清理失败: {e}"))
        }
    }
}

/// Pure variant (no logging) used by tests.
pub fn clear_session_files(workspace: &Path, chat_id: &str) -> std::io::Result<()> {
    clear_window(workspace, chat_id).map_err(|e| std::io::Error::other(e.to_string()))?;
    clear_summary(workspace, chat_id).map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgcode_adapters::FakeSessionAdapter;
    use msgcode_storage::append_window;
    use tempfile::TempDir;

    #[test]
    fn resolve_runner_flags_tmux_under_local_only_policy() {
        let mut config = WorkspaceConfig::default();
        config.set_runtime_kind("tmux");
        let resolved = resolve_runner(&config);
        assert_eq!(resolved.runner, Runner::Tmux);
        assert!(resolved.blocked_reason.is_some());
    }

    #[test]
    fn resolve_runner_direct_has_no_block() {
        let config = WorkspaceConfig::default();
        let resolved = resolve_runner(&config);
        assert_eq!(resolved.runner, Runner::Direct);
        assert!(resolved.blocked_reason.is_none());
    }

    #[tokio::test]
    async fn direct_start_stop_report_no_session_needed() {
        let adapter = FakeSessionAdapter::default();
        let orchestrator = SessionOrchestrator::new(&adapter);
        let dir = TempDir::new().unwrap();
        let start = orchestrator.start(Runner::Direct, "c1", dir.path(), "echo").await;
        assert!(start.ok);
        assert_eq!(start.message, "no session needed");
        let stop = orchestrator.stop(Runner::Direct, "c1").await;
        assert_eq!(stop.message, "no session needed");
    }

    #[tokio::test]
    async fn direct_snapshot_and_esc_are_unsupported() {
        let adapter = FakeSessionAdapter::default();
        let orchestrator = SessionOrchestrator::new(&adapter);
        let dir = TempDir::new().unwrap();
        let snapshot = orchestrator.snapshot(Runner::Direct, "c1").await;
        assert!(!snapshot.ok);
        let esc = orchestrator.esc(Runner::Direct, "c1").await;
        assert!(!esc.ok);
    }

    #[tokio::test]
    async fn tmux_start_then_snapshot_round_trips() {
        let adapter = FakeSessionAdapter::default();
        let orchestrator = SessionOrchestrator::new(&adapter);
        let dir = TempDir::new().unwrap();
        let id = "msgcode-c1";
        orchestrator.start(Runner::Tmux, "c1", dir.path(), "codex").await;
        adapter.send(id, "hello pane").await.unwrap();
        let snapshot = orchestrator.snapshot(Runner::Tmux, id).await;
        assert!(snapshot.ok);
        assert_eq!(snapshot.message, "hello pane");
    }

    #[test]
    fn clear_artifacts_rejects_unbound_workspace() {
        let result = clear_session_artifacts(Path::new(""), "c1");
        assert!(!result.ok);
        assert!(result.message.contains("未绑定"));
    }

    #[test]
    fn clear_artifacts_clears_window_and_summary() {
        let dir = TempDir::new().unwrap();
        append_window(dir.path(), "c1", &msgcode_core::WindowMessage::user("hi")).unwrap();
        let result = clear_session_artifacts(dir.path(), "c1");
        assert!(result.ok);
        assert!(msgcode_storage::load_window(dir.path(), "c1").unwrap().is_empty());
    }
}
