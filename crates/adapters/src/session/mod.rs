// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session Adapter: tmux-hosted client backend for the Session Orchestrator (C14).

mod fake;
mod tmux;

pub use fake::FakeSessionAdapter;
pub use tmux::TmuxAdapter;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

#[async_trait]
pub trait SessionAdapter: Send + Sync {
    async fn spawn(&self, name: &str, cwd: &Path, cmd: &str) -> Result<String, SessionError>;
    async fn send(&self, id: &str, input: &str) -> Result<(), SessionError>;
    async fn capture(&self, id: &str) -> Result<String, SessionError>;
    async fn kill(&self, id: &str) -> Result<(), SessionError>;
    async fn send_escape(&self, id: &str) -> Result<(), SessionError>;
    async fn is_alive(&self, id: &str) -> bool;
}
