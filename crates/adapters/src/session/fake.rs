// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory fake session adapter for tests (grounds the Session
//! Orchestrator's tests without spawning real tmux processes).

use super::{SessionAdapter, SessionError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;

#[derive(Default)]
pub struct FakeSessionAdapter {
    sessions: Mutex<HashMap<String, Vec<String>>>,
    escapes: Mutex<HashMap<String, u32>>,
}

#[async_trait]
impl SessionAdapter for FakeSessionAdapter {
    async fn spawn(&self, name: &str, _cwd: &Path, _cmd: &str) -> Result<String, SessionError> {
        let id = format!("msgcode-{name}");
        self.sessions.lock().insert(id.clone(), vec![]);
        Ok(id)
    }

    async fn send(&self, id: &str, input: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(id).ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.push(input.to_string());
        Ok(())
    }

    async fn capture(&self, id: &str) -> Result<String, SessionError> {
        let sessions = self.sessions.lock();
        let session = sessions.get(id).ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        Ok(session.join("\n"))
    }

    async fn kill(&self, id: &str) -> Result<(), SessionError> {
        self.sessions
            .lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    async fn send_escape(&self, id: &str) -> Result<(), SessionError> {
        if !self.sessions.lock().contains_key(id) {
            return Err(SessionError::NotFound(id.to_string()));
        }
        *self.escapes.lock().entry(id.to_string()).or_insert(0) += 1;
        Ok(())
    }

    async fn is_alive(&self, id: &str) -> bool {
        self.sessions.lock().contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_send_capture_round_trip() {
        let adapter = FakeSessionAdapter::default();
        let id = adapter.spawn("c1", Path::new("."), "echo hi").await.unwrap();
        adapter.send(&id, "hello").await.unwrap();
        let captured = adapter.capture(&id).await.unwrap();
        assert_eq!(captured, "hello");
    }

    #[tokio::test]
    async fn kill_then_operations_fail_not_found() {
        let adapter = FakeSessionAdapter::default();
        let id = adapter.spawn("c1", Path::new("."), "echo hi").await.unwrap();
        adapter.kill(&id).await.unwrap();
        assert!(adapter.send(&id, "hi").await.is_err());
        assert!(!adapter.is_alive(&id).await);
    }
}
