// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider Adapter (C12): OpenAI-compatible request build & response parse
//! (spec §4.12). Uses `reqwest`, imported here because the example pack's
//! LLM-client repos (`austinjan-km`, `querymt-querymt`) reach for it for
//! exactly this job; the teacher daemon has no HTTP client of its own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<msgcode_core::WindowMessage>,
    pub tools: Vec<ToolSpec>,
    pub tool_choice: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Build the JSON request body. `tools` is included only if non-empty; when
/// non-empty, `tool_choice` defaults to `"auto"` unless explicitly set.
pub fn build_chat_completion_request(req: &ChatCompletionRequest) -> String {
    let mut body = json!({
        "model": req.model,
        "messages": req.messages.iter().map(window_message_to_json).collect::<Vec<_>>(),
    });
    let obj = body.as_object_mut().expect("object literal");

    if !req.tools.is_empty() {
        obj.insert(
            "tools".into(),
            json!(req
                .tools
                .iter()
                .map(|t| json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                }))
                .collect::<Vec<_>>()),
        );
        obj.insert(
            "tool_choice".into(),
            json!(req.tool_choice.clone().unwrap_or_else(|| "auto".to_string())),
        );
    }
    if let Some(temp) = req.temperature {
        obj.insert("temperature".into(), json!(temp));
    }
    if let Some(max_tokens) = req.max_tokens {
        obj.insert("max_tokens".into(), json!(max_tokens));
    }
    body.to_string()
}

fn window_message_to_json(msg: &msgcode_core::WindowMessage) -> Value {
    let mut obj = json!({ "role": role_str(msg.role) });
    let map = obj.as_object_mut().expect("object literal");
    if let Some(content) = &msg.content {
        map.insert("content".into(), json!(content));
    }
    if !msg.tool_calls.is_empty() {
        map.insert(
            "tool_calls".into(),
            json!(msg
                .tool_calls
                .iter()
                .map(|tc| json!({
                    "id": tc.id,
                    "type": "function",
                    "function": { "name": tc.name, "arguments": tc.arguments },
                }))
                .collect::<Vec<_>>()),
        );
    }
    if let Some(id) = &msg.tool_call_id {
        map.insert("tool_call_id".into(), json!(id));
    }
    if let Some(name) = &msg.name {
        map.insert("name".into(), json!(name));
    }
    obj
}

fn role_str(role: msgcode_core::Role) -> &'static str {
    match role {
        msgcode_core::Role::System => "system",
        msgcode_core::Role::User => "user",
        msgcode_core::Role::Assistant => "assistant",
        msgcode_core::Role::Tool => "tool",
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<NormalizedToolCall>,
    pub finish_reason: Option<String>,
    pub error: Option<String>,
}

/// Drop tool-call entries with a missing or non-string `id`/`name`.
pub fn normalize_tool_calls(raw: &Value) -> Vec<NormalizedToolCall> {
    let Some(arr) = raw.as_array() else { return vec![] };
    arr.iter()
        .filter_map(|entry| {
            let id = entry.get("id")?.as_str()?.to_string();
            let function = entry.get("function")?;
            let name = function.get("name")?.as_str()?.to_string();
            let arguments = function
                .get("arguments")
                .and_then(Value::as_str)
                .unwrap_or("{}")
                .to_string();
            Some(NormalizedToolCall { id, name, arguments })
        })
        .collect()
}

pub fn parse_chat_completion_response(raw: &str) -> ParsedResponse {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => {
            return ParsedResponse {
                error: Some("Invalid JSON response".to_string()),
                ..Default::default()
            }
        }
    };

    if let Some(message) = value.get("error").and_then(|e| e.get("message")).and_then(Value::as_str) {
        return ParsedResponse {
            error: Some(message.to_string()),
            ..Default::default()
        };
    }

    let Some(choice) = value.get("choices").and_then(|c| c.as_array()).and_then(|a| a.first()) else {
        return ParsedResponse {
            error: Some("Invalid response format".to_string()),
            ..Default::default()
        };
    };

    let message = choice.get("message").cloned().unwrap_or(Value::Null);
    let content = message.get("content").and_then(Value::as_str).map(str::to_string);
    let tool_calls = message
        .get("tool_calls")
        .map(normalize_tool_calls)
        .unwrap_or_default();
    let finish_reason = choice.get("finish_reason").and_then(Value::as_str).map(str::to_string);

    ParsedResponse {
        content,
        tool_calls,
        finish_reason,
        error: None,
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request error: {0}")]
    Request(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
}

/// Abstraction over "call a chat-completions endpoint", so the tool loop
/// can be tested against a fake provider without a network.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn complete(&self, body: String) -> Result<(String, u16), ProviderError>;
}

/// OpenAI-compatible HTTP provider, hitting `POST /v1/chat/completions`
/// with a fallback to `/api/v1/chat` (spec §6 wire protocol).
pub struct HttpProviderAdapter {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpProviderAdapter {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ProviderAdapter for HttpProviderAdapter {
    async fn complete(&self, body: String) -> Result<(String, u16), ProviderError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .body(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| ProviderError::Request(e.to_string()))?;
        Ok((text, status))
    }
}

/// In-memory fake provider for tests: returns a queued response per call,
/// recording every request body it was sent.
#[derive(Default)]
pub struct FakeProvider {
    pub responses: parking_lot::Mutex<std::collections::VecDeque<(String, u16)>>,
    pub requests: parking_lot::Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn push_response(&self, body: impl Into<String>, status: u16) {
        self.responses.lock().push_back((body.into(), status));
    }
}

#[async_trait]
impl ProviderAdapter for FakeProvider {
    async fn complete(&self, body: String) -> Result<(String, u16), ProviderError> {
        self.requests.lock().push(body);
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| ProviderError::Request("no queued fake response".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgcode_core::WindowMessage;

    #[test]
    fn omits_tools_key_when_empty() {
        let req = ChatCompletionRequest {
            model: "m".into(),
            messages: vec![WindowMessage::user("hi")],
            tools: vec![],
            tool_choice: None,
            temperature: None,
            max_tokens: None,
        };
        let body = build_chat_completion_request(&req);
        assert!(!body.contains("tools"));
        assert!(!body.contains("tool_choice"));
    }

    #[test]
    fn auto_sets_tool_choice_when_tools_present() {
        let req = ChatCompletionRequest {
            model: "m".into(),
            messages: vec![],
            tools: vec![ToolSpec { name: "read_file".into(), description: "".into(), parameters: json!({}) }],
            tool_choice: None,
            temperature: None,
            max_tokens: None,
        };
        let body = build_chat_completion_request(&req);
        assert!(body.contains("\"tool_choice\":\"auto\""));
    }

    #[test]
    fn explicit_tool_choice_is_not_overridden() {
        let req = ChatCompletionRequest {
            model: "m".into(),
            messages: vec![],
            tools: vec![ToolSpec { name: "read_file".into(), description: "".into(), parameters: json!({}) }],
            tool_choice: Some("none".into()),
            temperature: None,
            max_tokens: None,
        };
        let body = build_chat_completion_request(&req);
        assert!(body.contains("\"tool_choice\":\"none\""));
    }

    #[test]
    fn temperature_zero_is_kept() {
        let req = ChatCompletionRequest {
            model: "m".into(),
            messages: vec![],
            tools: vec![],
            tool_choice: None,
            temperature: Some(0.0),
            max_tokens: None,
        };
        let body = build_chat_completion_request(&req);
        assert!(body.contains("\"temperature\":0.0"));
    }

    #[test]
    fn parse_invalid_json_reports_error() {
        let parsed = parse_chat_completion_response("not json");
        assert_eq!(parsed.error.as_deref(), Some("Invalid JSON response"));
    }

    #[test]
    fn parse_surfaces_top_level_error_message() {
        let raw = json!({"error": {"message": "model overloaded"}}).to_string();
        let parsed = parse_chat_completion_response(&raw);
        assert_eq!(parsed.error.as_deref(), Some("model overloaded"));
    }

    #[test]
    fn parse_missing_choices_is_invalid_format() {
        let parsed = parse_chat_completion_response("{}");
        assert_eq!(parsed.error.as_deref(), Some("Invalid response format"));
    }

    #[test]
    fn parse_extracts_content_and_tool_calls() {
        let raw = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{"id": "call_1", "function": {"name": "read_file", "arguments": "{}"}}]
                },
                "finish_reason": "tool_calls"
            }]
        })
        .to_string();
        let parsed = parse_chat_completion_response(&raw);
        assert_eq!(parsed.tool_calls.len(), 1);
        assert_eq!(parsed.tool_calls[0].name, "read_file");
        assert_eq!(parsed.finish_reason.as_deref(), Some("tool_calls"));
    }

    #[test]
    fn normalize_tool_calls_drops_entries_missing_id_or_name() {
        let raw = json!([
            {"id": "call_1", "function": {"name": "ok", "arguments": "{}"}},
            {"function": {"name": "missing_id", "arguments": "{}"}},
            {"id": "call_3", "function": {"arguments": "{}"}},
            {"id": 5, "function": {"name": "non_string_id", "arguments": "{}"}},
        ]);
        let calls = normalize_tool_calls(&raw);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "ok");
    }
}
