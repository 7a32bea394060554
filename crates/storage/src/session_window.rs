// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session Window (C4): append-only per-chat NDJSON message log (spec §4.4).

use msgcode_core::WindowMessage;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SessionWindowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn window_path(workspace: &Path, chat_id: &str) -> PathBuf {
    workspace.join(".msgcode").join("sessions").join(format!("{chat_id}.jsonl"))
}

/// Append one message. Opens in append mode so concurrent writers
/// interleave line-atomically (spec §5).
pub fn append_window(workspace: &Path, chat_id: &str, msg: &WindowMessage) -> Result<(), SessionWindowError> {
    let path = window_path(workspace, chat_id);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    let line = serde_json::to_string(msg).map_err(|e| std::io::Error::other(e.to_string()))?;
    writeln!(file, "{line}")?;
    Ok(())
}

/// Load all messages, silently dropping malformed lines.
pub fn load_window(workspace: &Path, chat_id: &str) -> Result<Vec<WindowMessage>, SessionWindowError> {
    let path = window_path(workspace, chat_id);
    if !path.exists() {
        return Ok(vec![]);
    }
    let reader = BufReader::new(File::open(&path)?);
    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<WindowMessage>(&line) {
            Ok(msg) => out.push(msg),
            Err(e) => warn!(chat_id, line_no = i, error = %e, "dropping malformed window message"),
        }
    }
    Ok(out)
}

pub fn clear_window(workspace: &Path, chat_id: &str) -> Result<(), SessionWindowError> {
    let path = window_path(workspace, chat_id);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    File::create(&path)?;
    Ok(())
}

/// Return the last `max` entries.
pub fn prune_window(history: &[WindowMessage], max: usize) -> Vec<WindowMessage> {
    if history.len() <= max {
        history.to_vec()
    } else {
        history[history.len() - max..].to_vec()
    }
}

pub struct TrimResult {
    pub kept: Vec<WindowMessage>,
    pub trimmed: Vec<WindowMessage>,
    pub was_trimmed: bool,
}

pub fn trim_window_with_result(history: &[WindowMessage], max: usize) -> TrimResult {
    if history.len() <= max {
        return TrimResult {
            kept: history.to_vec(),
            trimmed: vec![],
            was_trimmed: false,
        };
    }
    let split = history.len() - max;
    TrimResult {
        kept: history[split..].to_vec(),
        trimmed: history[..split].to_vec(),
        was_trimmed: true,
    }
}

/// Compose: optional system -> pruned history (excluding current user, one
/// slot reserved) -> current user.
pub fn build_window_context(
    system: Option<&str>,
    history: &[WindowMessage],
    current_user: &str,
    max_messages: usize,
) -> Vec<WindowMessage> {
    let mut out = Vec::new();
    if let Some(s) = system {
        out.push(WindowMessage::system(s));
    }
    let reserved_for_current = max_messages.saturating_sub(1).max(1);
    out.extend(prune_window(history, reserved_for_current));
    out.push(WindowMessage::user(current_user));
    out
}

/// As `build_window_context`, inserting a `[Previous Context Summary]`
/// system message between system and pruned history when a summary is supplied.
pub fn build_window_context_with_summary(
    system: Option<&str>,
    summary: Option<&str>,
    history: &[WindowMessage],
    current_user: &str,
    max_messages: usize,
) -> Vec<WindowMessage> {
    let mut out = Vec::new();
    if let Some(s) = system {
        out.push(WindowMessage::system(s));
    }
    if let Some(summary) = summary.filter(|s| !s.trim().is_empty()) {
        out.push(WindowMessage::system(format!(
            "[Previous Context Summary]\n{summary}\n[End Summary]"
        )));
    }
    let reserved_for_current = max_messages.saturating_sub(1).max(1);
    out.extend(prune_window(history, reserved_for_current));
    out.push(WindowMessage::user(current_user));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn append_then_load_round_trips_in_order() {
        let dir = TempDir::new().unwrap();
        append_window(dir.path(), "c1", &WindowMessage::user("one")).unwrap();
        append_window(dir.path(), "c1", &WindowMessage::assistant("two")).unwrap();
        let loaded = load_window(dir.path(), "c1").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].content.as_deref(), Some("one"));
        assert_eq!(loaded[1].content.as_deref(), Some("two"));
    }

    #[test]
    fn malformed_lines_are_dropped_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = window_path(dir.path(), "c1");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json\n{\"role\":\"user\",\"content\":\"ok\"}\n").unwrap();
        let loaded = load_window(dir.path(), "c1").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].content.as_deref(), Some("ok"));
    }

    #[test]
    fn clear_window_truncates() {
        let dir = TempDir::new().unwrap();
        append_window(dir.path(), "c1", &WindowMessage::user("one")).unwrap();
        clear_window(dir.path(), "c1").unwrap();
        assert!(load_window(dir.path(), "c1").unwrap().is_empty());
    }

    #[test]
    fn prune_window_returns_last_k_elements() {
        let history: Vec<_> = (0..10).map(|i| WindowMessage::user(i.to_string())).collect();
        let pruned = prune_window(&history, 3);
        assert_eq!(pruned.len(), 3);
        assert_eq!(pruned[0].content.as_deref(), Some("7"));
        assert_eq!(pruned[2].content.as_deref(), Some("9"));
    }

    #[test]
    fn prune_window_shorter_than_k_returns_all() {
        let history = vec![WindowMessage::user("a")];
        assert_eq!(prune_window(&history, 5).len(), 1);
    }

    #[test]
    fn trim_with_result_reports_trimmed_flag() {
        let history: Vec<_> = (0..5).map(|i| WindowMessage::user(i.to_string())).collect();
        let result = trim_window_with_result(&history, 2);
        assert!(result.was_trimmed);
        assert_eq!(result.kept.len(), 2);
        assert_eq!(result.trimmed.len(), 3);

        let not_trimmed = trim_window_with_result(&history, 10);
        assert!(!not_trimmed.was_trimmed);
        assert_eq!(not_trimmed.trimmed.len(), 0);
    }

    #[test]
    fn build_window_context_orders_system_history_then_current() {
        let history: Vec<_> = (0..3).map(|i| WindowMessage::user(i.to_string())).collect();
        let ctx = build_window_context(Some("sys"), &history, "now", 10);
        assert_eq!(ctx[0].content.as_deref(), Some("sys"));
        assert_eq!(ctx.last().unwrap().content.as_deref(), Some("now"));
        assert_eq!(ctx.len(), 1 + 3 + 1);
    }

    #[test]
    fn build_window_context_with_summary_inserts_second_system_message() {
        let history = vec![WindowMessage::user("old")];
        let ctx = build_window_context_with_summary(Some("sys"), Some("gist"), &history, "now", 10);
        assert_eq!(ctx[0].content.as_deref(), Some("sys"));
        assert!(ctx[1].content.as_deref().unwrap().contains("[Previous Context Summary]"));
        assert!(ctx[1].content.as_deref().unwrap().contains("gist"));
        assert_eq!(ctx.last().unwrap().content.as_deref(), Some("now"));
    }

    #[test]
    fn build_window_context_with_empty_summary_omits_summary_message() {
        let ctx = build_window_context_with_summary(Some("sys"), Some(""), &[], "now", 10);
        assert_eq!(ctx.len(), 2);
    }
}
