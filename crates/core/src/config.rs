// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `WorkspaceConfig`: the flat string-keyed workspace config map (spec §3, §4.7).

use serde_json::{Map, Value};

/// Keys this system recognizes, with their defaults. Unknown keys are
/// preserved on load/save but never interpreted (spec §9).
pub const DEFAULT_WORKSPACE_CONFIG: &[(&str, &str)] = &[
    ("runtime.kind", "agent"),
    ("agent.provider", "lmstudio"),
    ("tmux.client", "none"),
    ("policy.mode", "local-only"),
    ("tooling.mode", "explicit"),
    ("pi.enabled", "false"),
];

/// The legacy `runner.default` string values and the modern triple they expand to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultRunner {
    Codex,
    ClaudeCode,
    Lmstudio,
    Llama,
    Claude,
    Openai,
}

impl DefaultRunner {
    pub fn as_str(self) -> &'static str {
        match self {
            DefaultRunner::Codex => "codex",
            DefaultRunner::ClaudeCode => "claude-code",
            DefaultRunner::Lmstudio => "lmstudio",
            DefaultRunner::Llama => "llama",
            DefaultRunner::Claude => "claude",
            DefaultRunner::Openai => "openai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "codex" => Some(DefaultRunner::Codex),
            "claude-code" => Some(DefaultRunner::ClaudeCode),
            "lmstudio" => Some(DefaultRunner::Lmstudio),
            "llama" => Some(DefaultRunner::Llama),
            "claude" => Some(DefaultRunner::Claude),
            "openai" => Some(DefaultRunner::Openai),
            _ => None,
        }
    }

    /// The `(runtime.kind, agent.provider, tmux.client)` triple this legacy
    /// value expands to (spec §4.7's aliasing table).
    pub fn triple(self) -> (&'static str, &'static str, &'static str) {
        match self {
            DefaultRunner::Codex => ("tmux", "none", "codex"),
            DefaultRunner::ClaudeCode => ("tmux", "none", "claude-code"),
            DefaultRunner::Lmstudio | DefaultRunner::Llama | DefaultRunner::Claude => {
                ("agent", "lmstudio", "none")
            }
            DefaultRunner::Openai => ("agent", "openai", "none"),
        }
    }
}

/// A workspace's typed configuration, backed by a flat JSON object so
/// unrecognized keys round-trip untouched.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    map: Map<String, Value>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        let mut map = Map::new();
        for (k, v) in DEFAULT_WORKSPACE_CONFIG {
            map.insert((*k).to_string(), Value::String((*v).to_string()));
        }
        Self { map }
    }
}

impl WorkspaceConfig {
    /// Load from a parsed JSON object: merge over defaults, then apply
    /// legacy aliasing (only when the modern key is absent).
    pub fn from_json(loaded: Value) -> Self {
        let mut cfg = Self::default();
        if let Value::Object(obj) = loaded {
            for (k, v) in obj {
                cfg.map.insert(k, v);
            }
        }
        cfg.apply_legacy_aliasing();
        cfg
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.map.clone())
    }

    fn apply_legacy_aliasing(&mut self) {
        let legacy = self.map.get("runner.default").and_then(Value::as_str).map(str::to_string);
        let Some(legacy) = legacy else { return };
        let Some(runner) = DefaultRunner::parse(&legacy) else { return };
        let (kind, provider, client) = runner.triple();
        if !self.map.contains_key("runtime.kind") {
            self.map.insert("runtime.kind".into(), Value::String(kind.into()));
        }
        if !self.map.contains_key("agent.provider") {
            self.map.insert("agent.provider".into(), Value::String(provider.into()));
        }
        if !self.map.contains_key("tmux.client") {
            self.map.insert("tmux.client".into(), Value::String(client.into()));
        }
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(Value::as_str)
    }

    pub fn runtime_kind(&self) -> String {
        self.get_str("runtime.kind").unwrap_or("agent").to_string()
    }

    pub fn agent_provider(&self) -> String {
        self.get_str("agent.provider").unwrap_or("lmstudio").to_string()
    }

    pub fn tmux_client(&self) -> String {
        self.get_str("tmux.client").unwrap_or("none").to_string()
    }

    pub fn policy_mode(&self) -> String {
        self.get_str("policy.mode").unwrap_or("local-only").to_string()
    }

    pub fn tooling_mode(&self) -> String {
        self.get_str("tooling.mode").unwrap_or("explicit").to_string()
    }

    pub fn tooling_allow(&self) -> Vec<String> {
        self.map
            .get("tooling.allow")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_else(|| vec!["tts".into(), "asr".into(), "vision".into()])
    }

    pub fn tooling_require_confirm(&self) -> Vec<String> {
        self.map
            .get("tooling.require_confirm")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    }

    pub fn pi_enabled(&self) -> bool {
        self.map.get("pi.enabled").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn model_executor(&self) -> Option<String> {
        self.get_str("model.executor").map(str::to_string)
    }

    pub fn model_responder(&self) -> Option<String> {
        self.get_str("model.responder").map(str::to_string)
    }

    /// Invariant check: `runtime.kind=tmux` requires `policy.mode=egress-allowed`.
    pub fn tmux_requires_egress_ok(&self) -> bool {
        self.runtime_kind() != "tmux" || self.policy_mode() == "egress-allowed"
    }

    pub fn set_runtime_kind(&mut self, kind: &str) {
        self.map.insert("runtime.kind".into(), Value::String(kind.into()));
    }

    pub fn set_agent_provider(&mut self, provider: &str) {
        self.map.insert("agent.provider".into(), Value::String(provider.into()));
    }

    pub fn set_tmux_client(&mut self, client: &str) {
        self.map.insert("tmux.client".into(), Value::String(client.into()));
    }

    pub fn set_policy_mode(&mut self, mode: &str) {
        self.map.insert("policy.mode".into(), Value::String(mode.into()));
    }

    pub fn set_pi_enabled(&mut self, enabled: bool) {
        self.map.insert("pi.enabled".into(), Value::Bool(enabled));
    }

    /// Appends `tool` to the persisted `tooling.allow` list if not already present.
    pub fn tooling_allow_insert(&mut self, tool: &str) {
        let mut allow = self.tooling_allow();
        if !allow.iter().any(|t| t == tool) {
            allow.push(tool.to_string());
        }
        self.map.insert(
            "tooling.allow".into(),
            Value::Array(allow.into_iter().map(Value::String).collect()),
        );
    }

    /// Writers always set the modern triple; legacy keys are never
    /// re-emitted (spec §4.7).
    pub fn set_default_runner(&mut self, runner: DefaultRunner) {
        let (kind, provider, client) = runner.triple();
        self.set_runtime_kind(kind);
        self.set_agent_provider(provider);
        self.set_tmux_client(client);
    }

    /// Reverse mapping: the legacy string that would have produced the
    /// current triple, preserving the originally-set legacy string when it
    /// still matches (spec §4.7 `getDefaultRunner`).
    pub fn get_default_runner(&self) -> String {
        if let Some(legacy) = self.get_str("runner.default") {
            if let Some(runner) = DefaultRunner::parse(legacy) {
                if runner.triple() == (self.runtime_kind().as_str(), self.agent_provider().as_str(), self.tmux_client().as_str()) {
                    return legacy.to_string();
                }
            }
        }
        match (self.runtime_kind().as_str(), self.agent_provider().as_str(), self.tmux_client().as_str()) {
            ("tmux", _, "codex") => "codex".into(),
            ("tmux", _, "claude-code") => "claude-code".into(),
            ("agent", "openai", _) => "openai".into(),
            _ => "lmstudio".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_explicit_agent_lmstudio() {
        let cfg = WorkspaceConfig::default();
        assert_eq!(cfg.runtime_kind(), "agent");
        assert_eq!(cfg.agent_provider(), "lmstudio");
        assert_eq!(cfg.tooling_mode(), "explicit");
    }

    #[test]
    fn legacy_runner_default_aliases_on_read_only() {
        let cfg = WorkspaceConfig::from_json(serde_json::json!({"runner.default": "codex"}));
        assert_eq!(cfg.runtime_kind(), "tmux");
        assert_eq!(cfg.tmux_client(), "codex");
        assert_eq!(cfg.agent_provider(), "none");
    }

    #[test]
    fn legacy_key_does_not_override_explicit_modern_key() {
        let cfg = WorkspaceConfig::from_json(serde_json::json!({
            "runner.default": "codex",
            "runtime.kind": "agent",
        }));
        assert_eq!(cfg.runtime_kind(), "agent", "explicit modern key wins over legacy");
    }

    #[test]
    fn writers_never_reemit_legacy_key() {
        let mut cfg = WorkspaceConfig::default();
        cfg.set_default_runner(DefaultRunner::Openai);
        let json = cfg.to_json();
        assert!(json.get("runner.default").is_none());
        assert_eq!(json.get("agent.provider").unwrap(), "openai");
    }

    #[test]
    fn get_default_runner_preserves_legacy_alias_string() {
        let cfg = WorkspaceConfig::from_json(serde_json::json!({"runner.default": "llama"}));
        assert_eq!(cfg.get_default_runner(), "llama");
    }

    #[test]
    fn get_default_runner_computes_canonical_when_no_legacy_present() {
        let mut cfg = WorkspaceConfig::default();
        cfg.set_default_runner(DefaultRunner::ClaudeCode);
        assert_eq!(cfg.get_default_runner(), "claude-code");
    }

    #[test]
    fn tmux_without_egress_allowed_violates_invariant() {
        let mut cfg = WorkspaceConfig::default();
        cfg.set_runtime_kind("tmux");
        assert!(!cfg.tmux_requires_egress_ok());
        cfg.map.insert("policy.mode".into(), Value::String("egress-allowed".into()));
        assert!(cfg.tmux_requires_egress_ok());
    }
}
