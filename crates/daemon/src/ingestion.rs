// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingestion Pipeline (C16, spec §4.16): the per-message entry point that
//! turns a raw `InboundMessage` into a persisted reply. Messages for the
//! same chat are serialized by a per-chat async lock; different chats
//! proceed concurrently.

use msgcode_adapters::{ProviderAdapter, ToolExecutor, ToolSpec, Transport};
use msgcode_core::{ChatCursor, InboundMessage, ToolPolicy, WindowMessage, WorkspaceConfig};
use msgcode_engine::{
    capabilities_for, clear_session_artifacts, handle_bind, handle_chatlist, handle_cursor,
    handle_help, handle_loglevel, handle_mode, handle_model, handle_owner, handle_owner_only,
    handle_pi, handle_policy, handle_reload, handle_reset_cursor, handle_soul,
    handle_tooling_allow, handle_unbind, handle_where, load_settings, parse_command,
    resolve_runner, run_routed_chat, save_settings, HandlerResult, Settings, SteeringQueues,
    ToolBus, ToolLoopInput, MAX_WINDOW_MESSAGES,
};
use msgcode_storage::{
    append_window, extract_summary, format_summary_markdown, load_summary, load_window,
    resolve_soul, save_summary, should_generate_summary, trim_window_with_result, ThreadMeta,
    ThreadStore,
};
use parking_lot::Mutex as SyncMutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

use crate::ratelimit::TokenBucket;

const SUMMARY_TRIGGER_THRESHOLD: usize = 20;
const ROUTE_VERBS: &[&str] = &["start", "stop", "status", "snapshot", "esc", "clear"];

/// Context shared across every chat served by this daemon instance.
pub struct Ingestor {
    config_dir: PathBuf,
    whitelist: Option<HashSet<String>>,
    routes: AsyncMutex<msgcode_storage::RouteStore>,
    state: AsyncMutex<msgcode_storage::StateStore>,
    settings: AsyncMutex<Settings>,
    steering: SteeringQueues,
    tool_bus: ToolBus,
    provider: Arc<dyn ProviderAdapter>,
    transport: Arc<dyn Transport>,
    rate_limiters: SyncMutex<HashMap<String, TokenBucket>>,
    bursting: SyncMutex<HashSet<String>>,
    warned_unknown_sender: SyncMutex<HashSet<String>>,
    warned_no_route: SyncMutex<HashSet<String>>,
    thread_stores: SyncMutex<HashMap<PathBuf, Arc<ThreadStore>>>,
    chat_locks: SyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Ingestor {
    pub fn new(
        config_dir: PathBuf,
        whitelist: Option<HashSet<String>>,
        routes: msgcode_storage::RouteStore,
        state: msgcode_storage::StateStore,
        provider: Arc<dyn ProviderAdapter>,
        transport: Arc<dyn Transport>,
        tool_executor: Arc<dyn ToolExecutor>,
    ) -> Self {
        let settings = load_settings(&config_dir);
        Self {
            config_dir,
            whitelist,
            routes: AsyncMutex::new(routes),
            state: AsyncMutex::new(state),
            settings: AsyncMutex::new(settings),
            steering: SteeringQueues::new(),
            tool_bus: ToolBus::new(tool_executor),
            provider,
            transport,
            rate_limiters: SyncMutex::new(HashMap::new()),
            bursting: SyncMutex::new(HashSet::new()),
            warned_unknown_sender: SyncMutex::new(HashSet::new()),
            warned_no_route: SyncMutex::new(HashSet::new()),
            thread_stores: SyncMutex::new(HashMap::new()),
            chat_locks: SyncMutex::new(HashMap::new()),
        }
    }

    fn chat_lock(&self, chat_id: &str) -> Arc<AsyncMutex<()>> {
        self.chat_locks
            .lock()
            .entry(chat_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn thread_store_for(&self, workspace: &Path) -> Arc<ThreadStore> {
        self.thread_stores
            .lock()
            .entry(workspace.to_path_buf())
            .or_insert_with(|| Arc::new(ThreadStore::new(workspace)))
            .clone()
    }

    /// Step 2: per-chat token-bucket rate limit (3/s). Returns `Some(notice)`
    /// the first time a chat starts bursting, `Some("")` on subsequent
    /// drops within the same burst (caller should stay silent), `None`
    /// when the message may proceed.
    fn rate_limit_check(&self, chat_id: &str) -> Option<&'static str> {
        let mut limiters = self.rate_limiters.lock();
        let bucket = limiters.entry(chat_id.to_string()).or_insert_with(|| TokenBucket::new(3.0, 3.0));
        if bucket.try_consume() {
            self.bursting.lock().remove(chat_id);
            None
        } else if self.bursting.lock().insert(chat_id.to_string()) {
            Some("发送过于频繁，请稍后再试")
        } else {
            Some("")
        }
    }

    /// Processes one inbound message end to end (spec §4.16's 7-step
    /// dispatch: drop own messages, rate limit, whitelist, route lookup,
    /// cursor advance, command-vs-chat dispatch, reply delivery).
    pub async fn handle_inbound(self: &Arc<Self>, msg: InboundMessage) {
        if msg.is_from_me {
            return;
        }

        let lock = self.chat_lock(&msg.chat_id);
        let _guard = lock.lock().await;

        match self.rate_limit_check(&msg.chat_id) {
            Some(notice) if !notice.is_empty() => {
                self.transport.send(&msg.chat_id, notice).await.ok();
                return;
            }
            Some(_) => return,
            None => {}
        }

        if let Some(whitelist) = &self.whitelist {
            if !whitelist.contains(&msg.sender) {
                if self.warned_unknown_sender.lock().insert(msg.chat_id.clone()) {
                    tracing::warn!(chat_id = %msg.chat_id, sender = %msg.sender, "message from sender outside whitelist");
                }
                return;
            }
        }

        let route = {
            let routes = self.routes.lock().await;
            routes.get_by_chat_id(&msg.chat_id).cloned()
        };
        let Some(route) = route else {
            if self.warned_no_route.lock().insert(msg.chat_id.clone()) {
                tracing::warn!(chat_id = %msg.chat_id, "no route bound for chat, dropping silently");
            }
            return;
        };

        {
            let mut state = self.state.lock().await;
            let rowid = msg.date.timestamp_millis();
            state.update_last_seen(&msg.chat_id, rowid, &msg.id);
            if let Err(e) = state.save() {
                tracing::warn!(chat_id = %msg.chat_id, error = %e, "failed to persist state store");
            }
        }

        let reply = if msg.is_command() {
            self.dispatch_command(&msg, &route.workspace_path).await
        } else {
            self.dispatch_chat(&msg, &route.workspace_path).await
        };

        if let Some(text) = reply {
            if let Err(e) = self.transport.send(&msg.chat_id, &text).await {
                tracing::warn!(chat_id = %msg.chat_id, error = %e, "reply delivery failed");
            }
        }
    }

    async fn dispatch_command(&self, msg: &InboundMessage, workspace: &Path) -> Option<String> {
        let Some(parsed) = parse_command(&msg.text) else {
            return Some("unrecognized command".to_string());
        };
        let arg0 = parsed.args.first().cloned().unwrap_or_default();

        let mut config = msgcode_storage::load_workspace_config(workspace).unwrap_or_default();

        if ROUTE_VERBS.contains(&parsed.command.as_str()) {
            return self.dispatch_session_verb(&parsed.command, msg, workspace, &config).await;
        }

        let result = match parsed.command.as_str() {
            "bind" => {
                let mut routes = self.routes.lock().await;
                let bot_type = parsed.args.get(1).map(String::as_str).unwrap_or("default");
                let r = handle_bind(&mut routes, &msg.chat_id, &arg0, bot_type);
                routes.save().ok();
                r
            }
            "where" => {
                let routes = self.routes.lock().await;
                handle_where(&routes, &msg.chat_id)
            }
            "unbind" => {
                let mut routes = self.routes.lock().await;
                let r = handle_unbind(&mut routes, &msg.chat_id);
                routes.save().ok();
                r
            }
            "chatlist" => {
                let routes = self.routes.lock().await;
                handle_chatlist(&routes)
            }
            "help" => handle_help(),
            "cursor" => {
                let state = self.state.lock().await;
                let cursor = state.get_chat_state(&msg.chat_id).cloned().unwrap_or_else(|| ChatCursor::new(&msg.chat_id));
                handle_cursor(&cursor)
            }
            "reset-cursor" => {
                let mut state = self.state.lock().await;
                state.reset_chat_state(&msg.chat_id);
                state.save().ok();
                handle_reset_cursor(&msg.chat_id).0
            }
            "owner" => {
                let mut settings = self.settings.lock().await;
                let r = handle_owner(&mut settings, &arg0);
                save_settings(&self.config_dir, &settings).ok();
                r
            }
            "owner-only" => {
                let mut settings = self.settings.lock().await;
                let r = handle_owner_only(&mut settings, &arg0);
                save_settings(&self.config_dir, &settings).ok();
                r
            }
            "pi" => {
                let r = handle_pi(&mut config, &arg0);
                msgcode_storage::save_workspace_config(workspace, &config).ok();
                r
            }
            "soul" => {
                let soul = resolve_soul(workspace, &self.config_dir);
                handle_soul(&soul)
            }
            "policy" => {
                let r = handle_policy(&mut config, &arg0);
                msgcode_storage::save_workspace_config(workspace, &config).ok();
                r
            }
            "tooling" if arg0 == "allow" => {
                let tool = parsed.args.get(1).map(String::as_str).unwrap_or("");
                let r = handle_tooling_allow(&mut config, tool);
                msgcode_storage::save_workspace_config(workspace, &config).ok();
                r
            }
            "model" => {
                let r = handle_model(&mut config, &arg0);
                msgcode_storage::save_workspace_config(workspace, &config).ok();
                r
            }
            "mode" => {
                let r = handle_mode(&mut config, &arg0);
                msgcode_storage::save_workspace_config(workspace, &config).ok();
                r
            }
            "loglevel" => {
                let mut settings = self.settings.lock().await;
                let r = handle_loglevel(&mut settings, &arg0);
                save_settings(&self.config_dir, &settings).ok();
                r
            }
            "reload" => handle_reload(),
            other => HandlerResult {
                success: false,
                message: format!("unhandled command: {other}"),
                response: None,
            },
        };

        Some(result.response.unwrap_or(result.message))
    }

    async fn dispatch_session_verb(
        &self,
        verb: &str,
        msg: &InboundMessage,
        workspace: &Path,
        config: &WorkspaceConfig,
    ) -> Option<String> {
        if verb == "clear" {
            let outcome = clear_session_artifacts(workspace, &msg.chat_id);
            self.thread_store_for(workspace).reset_thread(&msg.chat_id);
            return Some(outcome.message);
        }

        let resolved = resolve_runner(config);
        Some(match verb {
            "start" | "stop" => format!("{verb}: no session needed (direct runner)"),
            "status" => "direct (no tmux)".to_string(),
            "snapshot" | "esc" => format!("{verb}: unsupported for runner {:?}", resolved.runner),
            other => format!("unhandled session verb: {other}"),
        })
    }

    async fn dispatch_chat(&self, msg: &InboundMessage, workspace: &Path) -> Option<String> {
        let config = msgcode_storage::load_workspace_config(workspace).unwrap_or_default();
        let policy = ToolPolicy::from_workspace_config(&config);
        let tools = tool_specs_for(&policy);
        let soul = resolve_soul(workspace, &self.config_dir);
        let history = load_window(workspace, &msg.chat_id).unwrap_or_default();
        let summary = load_summary(workspace, &msg.chat_id).unwrap_or_default();
        let summary_text = if summary.is_empty() { None } else { Some(format_summary_markdown(&summary)) };

        let responder_model = config.model_responder().unwrap_or_else(|| config.agent_provider());
        let executor_model = config.model_executor().unwrap_or_else(|| config.agent_provider());
        let caps = capabilities_for(&config.agent_provider());

        let input = ToolLoopInput {
            model: executor_model,
            current_user: msg.text.clone(),
            tools,
            chat_id: msg.chat_id.clone(),
            workspace_path: workspace,
            soul,
            summary: summary_text,
            history: history.clone(),
            max_tokens: caps.reserved_output_tokens,
            temperature: 0.0,
        };

        let outcome = run_routed_chat(
            &msg.text,
            !policy.allow.is_empty(),
            input,
            &responder_model,
            self.provider.as_ref(),
            &self.tool_bus,
            &self.steering,
            &policy,
            caps,
        )
        .await;

        let user_msg = WindowMessage::user(msg.text.clone());
        append_window(workspace, &msg.chat_id, &user_msg).ok();
        for m in &outcome.appended {
            append_window(workspace, &msg.chat_id, m).ok();
        }

        let mut full_history = history;
        full_history.push(user_msg);
        full_history.extend(outcome.appended.iter().cloned());
        let trim = trim_window_with_result(&full_history, MAX_WINDOW_MESSAGES);
        if should_generate_summary(full_history.len(), trim.kept.len(), SUMMARY_TRIGGER_THRESHOLD, false) {
            let extracted = extract_summary(&trim.trimmed, &full_history);
            save_summary(workspace, &msg.chat_id, &extracted).ok();
        }

        let meta = ThreadMeta {
            workspace_label: workspace.display().to_string(),
            runtime_kind: config.runtime_kind(),
            agent_provider: config.agent_provider(),
            tmux_client: config.tmux_client(),
        };
        self.thread_store_for(workspace)
            .append_turn(&msg.chat_id, workspace, &meta, &msg.text, &outcome.final_text)
            .ok();

        if let Some(code) = outcome.error_code {
            tracing::warn!(chat_id = %msg.chat_id, error_code = code, "turn ended with error");
        }

        Some(outcome.final_text)
    }
}

/// Builds the `ToolSpec` list the provider sees, limited to tools the
/// active policy allows (spec §4.8 known-tools list).
fn tool_specs_for(policy: &ToolPolicy) -> Vec<ToolSpec> {
    const KNOWN: &[&str] = &["read_file", "write_file", "edit_file", "bash", "tts", "asr", "vision", "mem", "browser", "desktop"];
    KNOWN
        .iter()
        .filter(|name| policy.allow.contains(**name))
        .map(|name| ToolSpec {
            name: name.to_string(),
            description: format!("{name} tool"),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgcode_adapters::{FakeProvider, FakeTransport, LocalToolExecutor};
    use tempfile::TempDir;

    fn ingestor(config_dir: &Path, workspace_root: &Path) -> Arc<Ingestor> {
        let routes = msgcode_storage::RouteStore::load(&config_dir.join("routes.json"), workspace_root).unwrap();
        let state = msgcode_storage::StateStore::load(&config_dir.join("state.json")).unwrap();
        Arc::new(Ingestor::new(
            config_dir.to_path_buf(),
            None,
            routes,
            state,
            Arc::new(FakeProvider::default()),
            Arc::new(FakeTransport::default()),
            Arc::new(LocalToolExecutor),
        ))
    }

    #[tokio::test]
    async fn unbound_chat_drops_silently() {
        let dir = TempDir::new().unwrap();
        let workspace_root = dir.path().join("workspaces");
        std::fs::create_dir_all(&workspace_root).unwrap();
        let ingestor = ingestor(dir.path(), &workspace_root);

        let msg = InboundMessage {
            id: "1".into(),
            chat_id: "any;+;c1".into(),
            text: "hello".into(),
            sender: "alice".into(),
            handle: "alice@example.com".into(),
            is_from_me: false,
            attachments: vec![],
            date: chrono::Utc::now(),
        };
        ingestor.handle_inbound(msg).await;
        assert!(ingestor.warned_no_route.lock().contains("any;+;c1"));
    }

    #[tokio::test]
    async fn own_messages_are_dropped_before_any_processing() {
        let dir = TempDir::new().unwrap();
        let workspace_root = dir.path().join("workspaces");
        std::fs::create_dir_all(&workspace_root).unwrap();
        let ingestor = ingestor(dir.path(), &workspace_root);

        let msg = InboundMessage {
            id: "1".into(),
            chat_id: "any;+;c1".into(),
            text: "hello".into(),
            sender: "me".into(),
            handle: "me@example.com".into(),
            is_from_me: true,
            attachments: vec![],
            date: chrono::Utc::now(),
        };
        ingestor.handle_inbound(msg).await;
        assert!(!ingestor.warned_no_route.lock().contains("any;+;c1"));
    }

    #[tokio::test]
    async fn bind_then_chat_persists_window_and_replies() {
        let dir = TempDir::new().unwrap();
        let workspace_root = dir.path().join("workspaces");
        std::fs::create_dir_all(&workspace_root).unwrap();
        let ingestor = ingestor(dir.path(), &workspace_root);

        {
            let mut routes = ingestor.routes.lock().await;
            routes.create_route("any;+;c1", "proj", "agent").unwrap();
        }

        let msg = InboundMessage {
            id: "1".into(),
            chat_id: "any;+;c1".into(),
            text: "hi there".into(),
            sender: "alice".into(),
            handle: "alice@example.com".into(),
            is_from_me: false,
            attachments: vec![],
            date: chrono::Utc::now(),
        };
        ingestor.handle_inbound(msg).await;

        let workspace = workspace_root.join("proj");
        let window = load_window(&workspace, "any;+;c1").unwrap();
        assert!(!window.is_empty());
    }
}
