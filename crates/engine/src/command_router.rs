// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command Router (C15, spec §4.15): parses `/...` control commands and
//! dispatches bind/where/model/policy/tooling/loglevel handlers.

use msgcode_core::{ChatCursor, DefaultRunner, RouteStatus, SoulResolution, WorkspaceConfig};
use msgcode_storage::{RouteStore, RouteStoreError};
use std::path::PathBuf;

pub const RECOGNIZED_COMMANDS: &[&str] = &[
    "bind", "where", "unbind", "chatlist", "help", "cursor", "reset-cursor", "owner", "owner-only",
    "pi", "soul", "policy", "tooling", "model", "mode", "loglevel", "reload", "start", "stop",
    "status", "snapshot", "esc", "clear",
];

/// The subset of recognized commands the Session Orchestrator (C14) handles.
pub const ROUTE_COMMANDS: &[&str] = &["start", "stop", "status", "snapshot", "esc", "clear"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub command: String,
    pub args: Vec<String>,
}

/// `isRouteCommand(text)`.
pub fn is_route_command(text: &str) -> bool {
    let Some(parsed) = parse_command(text) else { return false };
    ROUTE_COMMANDS.contains(&parsed.command.as_str())
}

/// Parses a leading `/command arg1 arg2...` line; `None` if it doesn't
/// start with `/` or the command isn't recognized.
pub fn parse_command(text: &str) -> Option<ParsedCommand> {
    let trimmed = text.trim();
    let rest = trimmed.strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let command = parts.next()?.to_string();
    if !RECOGNIZED_COMMANDS.contains(&command.as_str()) {
        return None;
    }
    let args = parts.map(str::to_string).collect();
    Some(ParsedCommand { command, args })
}

/// `parseRouteCommand`: same shape, but only meaningful for route commands.
pub fn parse_route_command(text: &str) -> Option<ParsedCommand> {
    parse_command(text).filter(|p| ROUTE_COMMANDS.contains(&p.command.as_str()))
}

#[derive(Debug, Clone)]
pub struct HandlerResult {
    pub success: bool,
    pub message: String,
    pub response: Option<String>,
}

impl HandlerResult {
    fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), response: None }
    }
    fn ok_with_response(message: impl Into<String>, response: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), response: Some(response.into()) }
    }
    fn err(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), response: None }
    }
}

/// `/bind <relative-path>`: resolves under `WORKSPACE_ROOT`, rejects `..`
/// and absolute paths, creates the directory, persists the route.
pub fn handle_bind(store: &mut RouteStore, chat_guid: &str, rel_path: &str, bot_type: &str) -> HandlerResult {
    match store.create_route(chat_guid, rel_path, bot_type) {
        Ok(entry) => {
            HandlerResult::ok(format!("绑定成功: bound to {}", entry.workspace_path.display()))
        }
        Err(RouteStoreError::PathUnsafe(msg)) => HandlerResult::err(format!("PATH_UNSAFE: {msg}")),
        Err(e) => HandlerResult::err(e.to_string()),
    }
}

/// `/where`: reports the active binding for the chat, or `未绑定`.
pub fn handle_where(store: &RouteStore, chat_guid: &str) -> HandlerResult {
    match store.get_by_chat_id(chat_guid) {
        Some(entry) => HandlerResult::ok_with_response(
            "bound",
            format!("当前绑定: {}", entry.workspace_path.display()),
        ),
        None => HandlerResult::ok_with_response("not bound", "未绑定"),
    }
}

/// Curated minimum command list (kept in sync with docs by an external check).
pub fn handle_help() -> HandlerResult {
    HandlerResult::ok_with_response(
        "help",
        "/bind <path>, /where, /unbind, /chatlist, /start, /stop, /status, /snapshot, /esc, /clear, /model <provider>, /mode agent|tmux, /policy on|off, /tooling allow <tool>, /cursor, /reset-cursor, /owner <handle>, /owner-only on|off, /pi on|off, /soul, /loglevel <level>, /reload",
    )
}

/// `/unbind`: archives the route rather than deleting it, so `/where`
/// history and thread transcripts stay attributable.
pub fn handle_unbind(store: &mut RouteStore, chat_guid: &str) -> HandlerResult {
    if store.update_route_status(chat_guid, RouteStatus::Archived) {
        HandlerResult::ok("unbound")
    } else {
        HandlerResult::ok_with_response("not bound", "未绑定")
    }
}

/// `/chatlist`: lists every active route's label.
pub fn handle_chatlist(store: &RouteStore) -> HandlerResult {
    let labels: Vec<&str> = store.get_active_routes().iter().map(|r| r.label.as_str()).collect();
    if labels.is_empty() {
        HandlerResult::ok_with_response("no active routes", "(no active routes)")
    } else {
        HandlerResult::ok_with_response("active routes", labels.join(", "))
    }
}

/// `/cursor`: reports the chat's resume pointer.
pub fn handle_cursor(cursor: &ChatCursor) -> HandlerResult {
    HandlerResult::ok_with_response(
        "cursor",
        format!(
            "rowid={} lastMessageId={} count={}",
            cursor.last_seen_rowid, cursor.last_message_id, cursor.message_count
        ),
    )
}

/// `/reset-cursor`: discards resume state for the chat, starting a fresh
/// cursor at rowid 0 (next poll re-delivers from the transport's earliest
/// retained history, per spec §4.3).
pub fn handle_reset_cursor(chat_guid: &str) -> (HandlerResult, ChatCursor) {
    (HandlerResult::ok("cursor reset"), ChatCursor::new(chat_guid))
}

/// `/owner <handle>`: sets the single per-process owner allow-list entry.
pub fn handle_owner(settings: &mut Settings, handle: &str) -> HandlerResult {
    settings.owner = Some(handle.to_string());
    HandlerResult::ok(format!("owner set to {handle}"))
}

/// `/owner-only on|off`: restricts control commands to the configured owner.
pub fn handle_owner_only(settings: &mut Settings, arg: &str) -> HandlerResult {
    match arg {
        "on" => {
            settings.owner_only = true;
            HandlerResult::ok("owner-only enabled")
        }
        "off" => {
            settings.owner_only = false;
            HandlerResult::ok("owner-only disabled")
        }
        other => HandlerResult::err(format!("expected on|off, got {other}")),
    }
}

/// `/pi on|off`: toggles `pi.enabled`, which exposes the 4 primitive
/// file/bash tools directly to the LLM (spec §3).
pub fn handle_pi(config: &mut WorkspaceConfig, arg: &str) -> HandlerResult {
    match arg {
        "on" => {
            config.set_pi_enabled(true);
            HandlerResult::ok("pi tools enabled")
        }
        "off" => {
            config.set_pi_enabled(false);
            HandlerResult::ok("pi tools disabled")
        }
        other => HandlerResult::err(format!("expected on|off, got {other}")),
    }
}

/// `/soul`: reports which soul (if any) is currently injected.
pub fn handle_soul(soul: &SoulResolution) -> HandlerResult {
    if soul.is_active() {
        HandlerResult::ok_with_response("soul active", format!("{:?} ({} chars)", soul.source, soul.chars))
    } else {
        HandlerResult::ok_with_response("no soul", "no active soul")
    }
}

/// `/mode agent|tmux`: sets `runtime.kind` directly, distinct from
/// `/model` which also picks the agent provider / tmux client.
pub fn handle_mode(config: &mut WorkspaceConfig, mode: &str) -> HandlerResult {
    match mode {
        "agent" | "tmux" => {
            config.set_runtime_kind(mode);
            HandlerResult::ok(format!("mode set to {mode}"))
        }
        other => HandlerResult::err(format!("expected agent|tmux, got {other}")),
    }
}

/// `/reload`: signals the caller to re-read `config.json` from disk,
/// discarding any in-memory edits made this process.
pub fn handle_reload() -> HandlerResult {
    HandlerResult::ok("workspace config reloaded")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProvider {
    Codex,
    ClaudeCode,
    Lmstudio,
    Openai,
}

impl ModelProvider {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "codex" => Some(Self::Codex),
            "claude-code" => Some(Self::ClaudeCode),
            "lmstudio" => Some(Self::Lmstudio),
            "openai" => Some(Self::Openai),
            _ => None,
        }
    }
}

/// `/model <provider>`: maps to the workspace config triple (spec §4.15).
pub fn handle_model(config: &mut WorkspaceConfig, provider: &str) -> HandlerResult {
    let Some(provider) = ModelProvider::parse(provider) else {
        return HandlerResult::err(format!("unknown provider: {provider}"));
    };
    let runner = match provider {
        ModelProvider::Codex => DefaultRunner::Codex,
        ModelProvider::ClaudeCode => DefaultRunner::ClaudeCode,
        ModelProvider::Lmstudio => DefaultRunner::Lmstudio,
        ModelProvider::Openai => DefaultRunner::Openai,
    };
    config.set_default_runner(runner);
    HandlerResult::ok(format!("model set to {}", config.get_default_runner()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevelSource {
    Env,
    Persisted,
    Default,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Settings {
    pub log_level: String,
    pub owner: Option<String>,
    pub owner_only: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self { log_level: "info".to_string(), owner: None, owner_only: false }
    }
}

pub fn settings_path(config_dir: &std::path::Path) -> PathBuf {
    config_dir.join("settings.json")
}

/// Loads `settings.json` from the process-global config directory, falling
/// back to defaults if absent or unreadable (spec §6 process-global layout).
pub fn load_settings(config_dir: &std::path::Path) -> Settings {
    msgcode_storage::atomic::read_json(&settings_path(config_dir))
        .ok()
        .flatten()
        .unwrap_or_default()
}

pub fn save_settings(
    config_dir: &std::path::Path,
    settings: &Settings,
) -> Result<(), msgcode_storage::AtomicStoreError> {
    msgcode_storage::atomic::write_json(&settings_path(config_dir), settings)
}

/// `/loglevel <level>`: persists to `settings.json`; `LOG_LEVEL` env var
/// overrides the persisted value and is reported with source `env`.
pub fn resolve_log_level(persisted: &Settings, env_override: Option<&str>) -> (String, LogLevelSource) {
    if let Some(level) = env_override {
        return (level.to_string(), LogLevelSource::Env);
    }
    (persisted.log_level.clone(), LogLevelSource::Persisted)
}

pub fn handle_loglevel(settings: &mut Settings, level: &str) -> HandlerResult {
    settings.log_level = level.to_string();
    HandlerResult::ok(format!("log level set to {level}"))
}

/// `/policy on|off`: toggles `policy.mode` between `egress-allowed`/`local-only`.
pub fn handle_policy(config: &mut WorkspaceConfig, arg: &str) -> HandlerResult {
    match arg {
        "on" => {
            config.set_policy_mode("egress-allowed");
            HandlerResult::ok("policy egress allowed")
        }
        "off" => {
            config.set_policy_mode("local-only");
            HandlerResult::ok("policy local-only")
        }
        other => HandlerResult::err(format!("expected on|off, got {other}")),
    }
}

/// `/tooling allow <tool>`: appends to the allow-list, persists through caller.
pub fn handle_tooling_allow(config: &mut WorkspaceConfig, tool: &str) -> HandlerResult {
    config.tooling_allow_insert(tool);
    HandlerResult::ok(format!("{tool} added to tooling allow-list"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_command_recognizes_bind_with_args() {
        let parsed = parse_command("/bind my/project").unwrap();
        assert_eq!(parsed.command, "bind");
        assert_eq!(parsed.args, vec!["my/project".to_string()]);
    }

    #[test]
    fn parse_command_rejects_unknown_command() {
        assert!(parse_command("/frobnicate").is_none());
    }

    #[test]
    fn parse_command_requires_leading_slash() {
        assert!(parse_command("bind my/project").is_none());
    }

    #[test]
    fn is_route_command_matches_only_the_orchestrator_subset() {
        assert!(is_route_command("/start"));
        assert!(is_route_command("/clear"));
        assert!(!is_route_command("/bind foo"));
    }

    fn store(dir: &TempDir) -> RouteStore {
        let workspace_root = dir.path().join("workspaces");
        std::fs::create_dir_all(&workspace_root).unwrap();
        RouteStore::load(&dir.path().join("routes.json"), &workspace_root).unwrap()
    }

    #[test]
    fn handle_where_reports_unbound_when_no_route() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let result = handle_where(&store, "guid-1");
        assert_eq!(result.response.as_deref(), Some("未绑定"));
    }

    #[test]
    fn handle_bind_then_where_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let bind = handle_bind(&mut store, "guid-1", "proj", "agent");
        assert!(bind.success);
        let where_result = handle_where(&store, "guid-1");
        assert!(where_result.response.unwrap().ends_with("proj"));
    }

    #[test]
    fn handle_bind_rejects_path_escape() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let bind = handle_bind(&mut store, "guid-1", "../escape", "agent");
        assert!(!bind.success);
        assert!(bind.message.contains("PATH_UNSAFE"));
    }

    #[test]
    fn handle_model_codex_sets_tmux_triple() {
        let mut config = WorkspaceConfig::default();
        let result = handle_model(&mut config, "codex");
        assert!(result.success);
        assert_eq!(config.runtime_kind(), "tmux");
        assert_eq!(config.tmux_client(), "codex");
    }

    #[test]
    fn handle_model_rejects_unknown_provider() {
        let mut config = WorkspaceConfig::default();
        let result = handle_model(&mut config, "mystery");
        assert!(!result.success);
    }

    #[test]
    fn env_log_level_overrides_persisted_with_env_source() {
        let settings = Settings { log_level: "warn".to_string(), ..Default::default() };
        let (level, source) = resolve_log_level(&settings, Some("debug"));
        assert_eq!(level, "debug");
        assert_eq!(source, LogLevelSource::Env);
    }

    #[test]
    fn persisted_log_level_used_when_no_env_override() {
        let settings = Settings { log_level: "warn".to_string(), ..Default::default() };
        let (level, source) = resolve_log_level(&settings, None);
        assert_eq!(level, "warn");
        assert_eq!(source, LogLevelSource::Persisted);
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.owner = Some("alice".to_string());
        settings.log_level = "debug".to_string();
        save_settings(dir.path(), &settings).unwrap();

        let reloaded = load_settings(dir.path());
        assert_eq!(reloaded.owner, Some("alice".to_string()));
        assert_eq!(reloaded.log_level, "debug");
    }

    #[test]
    fn missing_settings_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings(dir.path());
        assert_eq!(settings.log_level, "info");
        assert!(settings.owner.is_none());
    }

    #[test]
    fn handle_policy_toggles_mode() {
        let mut config = WorkspaceConfig::default();
        handle_policy(&mut config, "on");
        assert_eq!(config.policy_mode(), "egress-allowed");
        handle_policy(&mut config, "off");
        assert_eq!(config.policy_mode(), "local-only");
    }

    #[test]
    fn handle_tooling_allow_adds_tool() {
        let mut config = WorkspaceConfig::default();
        handle_tooling_allow(&mut config, "bash");
        assert!(config.tooling_allow().contains(&"bash".to_string()));
    }

    #[test]
    fn handle_unbind_archives_rather_than_deletes() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        store.create_route("guid-1", "proj", "agent").unwrap();
        let result = handle_unbind(&mut store, "guid-1");
        assert!(result.success);
        assert!(store.get_by_chat_id("guid-1").is_some());
        assert!(store.get_active_routes().is_empty());
    }

    #[test]
    fn handle_unbind_reports_not_bound() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        let result = handle_unbind(&mut store, "guid-1");
        assert_eq!(result.response.as_deref(), Some("未绑定"));
    }

    #[test]
    fn handle_chatlist_lists_active_routes_only() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        store.create_route("guid-1", "proj-a", "agent").unwrap();
        store.create_route("guid-2", "proj-b", "agent").unwrap();
        handle_unbind(&mut store, "guid-2");
        let result = handle_chatlist(&store);
        assert!(result.response.as_deref().unwrap().contains("proj-a"));
        assert!(!result.response.as_deref().unwrap().contains("proj-b"));
    }

    #[test]
    fn handle_cursor_reports_current_position() {
        let mut cursor = ChatCursor::new("any;+;c1");
        cursor.advance(9, "m9");
        let result = handle_cursor(&cursor);
        assert!(result.response.unwrap().contains("rowid=9"));
    }

    #[test]
    fn handle_reset_cursor_returns_fresh_zeroed_cursor() {
        let (result, cursor) = handle_reset_cursor("any;+;c1");
        assert!(result.success);
        assert_eq!(cursor.last_seen_rowid, 0);
    }

    #[test]
    fn handle_owner_then_owner_only_round_trips() {
        let mut settings = Settings::default();
        handle_owner(&mut settings, "alice@example.com");
        assert_eq!(settings.owner.as_deref(), Some("alice@example.com"));
        handle_owner_only(&mut settings, "on");
        assert!(settings.owner_only);
        handle_owner_only(&mut settings, "off");
        assert!(!settings.owner_only);
    }

    #[test]
    fn handle_pi_toggles_config_key() {
        let mut config = WorkspaceConfig::default();
        assert!(!config.pi_enabled());
        handle_pi(&mut config, "on");
        assert!(config.pi_enabled());
        handle_pi(&mut config, "off");
        assert!(!config.pi_enabled());
    }

    #[test]
    fn handle_soul_reports_inactive_when_none() {
        let result = handle_soul(&SoulResolution::none());
        assert_eq!(result.response.as_deref(), Some("no active soul"));
    }

    #[test]
    fn handle_mode_sets_runtime_kind_only() {
        let mut config = WorkspaceConfig::default();
        handle_mode(&mut config, "tmux");
        assert_eq!(config.runtime_kind(), "tmux");
        assert_eq!(config.agent_provider(), "lmstudio", "mode does not touch agent.provider");
    }

    #[test]
    fn handle_mode_rejects_unknown_value() {
        let mut config = WorkspaceConfig::default();
        let result = handle_mode(&mut config, "bogus");
        assert!(!result.success);
    }
}
