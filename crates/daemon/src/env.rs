// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment variable resolution (spec §6 "Environment variables").

use std::path::PathBuf;

/// `MSGCODE_CONFIG_DIR` overrides the process-global config root; default
/// `~/.config/msgcode`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MSGCODE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".config").join("msgcode")
}

/// `WORKSPACE_ROOT` roots relative bind paths; falls back to the current
/// working directory when unset.
pub fn workspace_root() -> PathBuf {
    std::env::var("WORKSPACE_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

pub fn routes_file_path(config_dir: &std::path::Path) -> PathBuf {
    std::env::var("ROUTES_FILE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| config_dir.join("routes.json"))
}

pub fn state_file_path(config_dir: &std::path::Path) -> PathBuf {
    std::env::var("STATE_FILE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| config_dir.join("state.json"))
}

/// `LOG_LEVEL` overrides the persisted log level (reported with source `env`).
pub fn log_level_override() -> Option<String> {
    std::env::var("LOG_LEVEL").ok()
}

pub fn dev_mode() -> bool {
    std::env::var("MSGCODE_DEV_MODE").map(|v| v == "true").unwrap_or(false)
}

pub fn remote_hint_enabled() -> bool {
    std::env::var("MSGCODE_REMOTE_HINT").map(|v| v == "1").unwrap_or(false)
}

pub fn remote_hint_text() -> Option<String> {
    std::env::var("MSGCODE_REMOTE_HINT_TEXT").ok()
}

pub fn log_plaintext_input() -> bool {
    std::env::var("MSGCODE_LOG_PLAINTEXT_INPUT").map(|v| v == "1").unwrap_or(false)
}

pub fn pid_path(config_dir: &std::path::Path, name: &str) -> PathBuf {
    config_dir.join("run").join(format!("{name}.pid"))
}

/// `MSGCODE_PROVIDER_URL` overrides the OpenAI-compatible base URL the
/// provider adapter posts to; default is the local LM Studio server.
pub fn provider_base_url() -> String {
    std::env::var("MSGCODE_PROVIDER_URL").unwrap_or_else(|_| "http://127.0.0.1:1234".to_string())
}

/// `MSGCODE_POLL_INTERVAL_MS` overrides how often the daemon polls the
/// transport for new inbound messages.
pub fn poll_interval() -> std::time::Duration {
    let ms = std::env::var("MSGCODE_POLL_INTERVAL_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(1000);
    std::time::Duration::from_millis(ms)
}
