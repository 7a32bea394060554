// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool Loop Engine (C13, spec §4.13): the model↔tool round state machine.
//! This is the heart of the daemon — everything else assembles inputs for
//! this or dispatches its output.

use crate::budget::{self, ModelCapabilities, SectionRatios};
use crate::classifier::{classify_route, get_temperature_for_route, route_requires_tools};
use crate::steering::SteeringQueues;
use crate::tool_bus::ToolBus;
use msgcode_adapters::{
    build_chat_completion_request, parse_chat_completion_response, ChatCompletionRequest,
    ProviderAdapter, ProviderError, ToolSpec,
};
use msgcode_core::{Route, SoulResolution, SoulSource, ToolSource, WindowMessage};
use std::path::Path;
use std::sync::Arc;

pub const MAX_WINDOW_MESSAGES: usize = 20;
pub const MAX_TOOLS_PER_ROUND: usize = 3;
pub const MAX_TOOL_ROUNDS: usize = 6;

const CRASH_MARKERS: &[&str] = &["model crashed", "worker exited unexpectedly", "llama runtime crashed"];

pub struct ToolLoopInput<'a> {
    pub model: String,
    pub current_user: String,
    pub tools: Vec<ToolSpec>,
    pub chat_id: String,
    pub workspace_path: &'a Path,
    pub soul: SoulResolution,
    pub summary: Option<String>,
    pub history: Vec<WindowMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct ToolLoopOutcome {
    pub final_text: String,
    pub rounds_used: usize,
    pub appended: Vec<WindowMessage>,
    pub error_code: Option<&'static str>,
}

fn soul_system_block(soul: &SoulResolution) -> Option<String> {
    if soul.source == SoulSource::None {
        return None;
    }
    Some(format!(
        "[灵魂身份]\n{}\n[/灵魂身份]\ndo not attempt to read the soul file",
        soul.content
    ))
}

fn assemble_context(
    soul: &SoulResolution,
    summary: Option<&str>,
    history: &[WindowMessage],
    current_user: &str,
    caps: ModelCapabilities,
    minimal: bool,
) -> Vec<WindowMessage> {
    let system = soul_system_block(soul);

    if minimal {
        let mut out = Vec::new();
        if let Some(s) = &system {
            out.push(WindowMessage::system(s.clone()));
        }
        out.push(WindowMessage::user(current_user));
        return out;
    }

    let built = msgcode_storage::build_window_context_with_summary(
        system.as_deref(),
        summary,
        history,
        current_user,
        MAX_WINDOW_MESSAGES,
    );

    let input_budget = budget::compute_input_budget(caps);
    let allocation = budget::allocate_sections(input_budget, SectionRatios::default());
    let recent_budget = allocation.recent + allocation.summary;
    budget::trim_messages_by_budget(&built, recent_budget.max(allocation.current), caps.chars_per_token, MAX_WINDOW_MESSAGES)
}

fn is_crash_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    CRASH_MARKERS.iter().any(|m| lower.contains(m))
}

struct RoundCall {
    content: Option<String>,
    tool_calls: Vec<msgcode_adapters::NormalizedToolCall>,
    error: Option<String>,
    http_status: u16,
}

async fn call_provider(
    provider: &dyn ProviderAdapter,
    model: &str,
    messages: &[WindowMessage],
    tools: &[ToolSpec],
    temperature: f32,
    max_tokens: u32,
) -> RoundCall {
    let request = ChatCompletionRequest {
        model: model.to_string(),
        messages: messages.to_vec(),
        tools: tools.to_vec(),
        tool_choice: if tools.is_empty() { None } else { Some("auto".to_string()) },
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
    };
    let body = build_chat_completion_request(&request);
    match provider.complete(body).await {
        Ok((raw, status)) => {
            let parsed = parse_chat_completion_response(&raw);
            RoundCall {
                content: parsed.content,
                tool_calls: parsed.tool_calls,
                error: parsed.error,
                http_status: status,
            }
        }
        Err(ProviderError::Request(msg)) => RoundCall { content: None, tool_calls: vec![], error: Some(msg), http_status: 0 },
        Err(ProviderError::Http { status, body }) => RoundCall { content: None, tool_calls: vec![], error: Some(body), http_status: status },
    }
}

/// `runToolLoop`: drives model<->tool rounds until termination.
#[allow(clippy::too_many_arguments)]
pub async fn run_tool_loop(
    input: ToolLoopInput<'_>,
    provider: &dyn ProviderAdapter,
    tool_bus: &ToolBus,
    steering: &SteeringQueues,
    policy: &msgcode_core::ToolPolicy,
    caps: ModelCapabilities,
) -> ToolLoopOutcome {
    let mut history = input.history;
    let mut current_user = input.current_user;
    let mut appended: Vec<WindowMessage> = Vec::new();
    let mut rounds_used = 0usize;
    let mut had_404_retry = false;
    let mut max_tokens = input.max_tokens;

    loop {
        rounds_used += 1;
        if rounds_used > MAX_TOOL_ROUNDS {
            return ToolLoopOutcome {
                final_text: best_effort_text(&appended),
                rounds_used: rounds_used - 1,
                appended,
                error_code: None,
            };
        }

        let context = assemble_context(&input.soul, input.summary.as_deref(), &history, &current_user, caps, false);
        let mut round = call_provider(provider, &input.model, &context, &input.tools, input.temperature, max_tokens).await;

        if let Some(err) = &round.error {
            if round.http_status == 404 && !had_404_retry {
                had_404_retry = true;
                let minimal = assemble_context(&input.soul, None, &[], &current_user, caps, true);
                round = call_provider(provider, &input.model, &minimal, &input.tools, input.temperature, max_tokens).await;
                if round.error.is_some() {
                    return ToolLoopOutcome {
                        final_text: "MLX 服务不可达…".to_string(),
                        rounds_used,
                        appended,
                        error_code: Some("MODEL_404"),
                    };
                }
            } else if is_crash_message(err) && max_tokens > 0 {
                let reduced = ((max_tokens as f64) * 0.4) as u32;
                max_tokens = reduced.max(1);
                let retry = call_provider(provider, &input.model, &context, &input.tools, input.temperature, max_tokens).await;
                if retry.error.is_some() {
                    return ToolLoopOutcome {
                        final_text: "MODEL_CRASHED".to_string(),
                        rounds_used,
                        appended,
                        error_code: Some("MODEL_CRASHED"),
                    };
                }
                round = retry;
            } else {
                return ToolLoopOutcome {
                    final_text: err.clone(),
                    rounds_used,
                    appended,
                    error_code: Some("MODEL_ERROR"),
                };
            }
        }

        if round.tool_calls.is_empty() {
            if let Some(text) = &round.content {
                let embedded = crate::text_tool_parser::parse_embedded_tool_calls(text, &policy.allow);
                if !embedded.is_empty() {
                    round.tool_calls = embedded;
                }
            }
        }

        if round.tool_calls.is_empty() {
            let mut text = round.content.unwrap_or_default();
            if crate::text_tool_parser::looks_like_fake_shell_execution(&text) {
                tracing::warn!(chat_id = %input.chat_id, "discarding fabricated shell-execution output");
                text = format!("[未验证：未实际执行工具]\n{text}");
            }
            let assistant_msg = WindowMessage::assistant(text.clone());
            appended.push(assistant_msg);

            match steering.consume_one_follow_up(&input.chat_id) {
                Some(follow_up) => {
                    history.extend(appended.drain(..));
                    current_user = follow_up;
                    continue;
                }
                None => {
                    return ToolLoopOutcome { final_text: text, rounds_used, appended, error_code: None };
                }
            }
        }

        let mut assistant_tool_calls = Vec::new();
        let mut tool_results = Vec::new();
        for (k, call) in round.tool_calls.iter().take(MAX_TOOLS_PER_ROUND).enumerate() {
            if k > 0 && steering.has_steer(&input.chat_id) {
                break;
            }
            let args: serde_json::Value = serde_json::from_str(&call.arguments).unwrap_or(serde_json::json!({}));
            let result = tool_bus
                .execute_tool(policy, input.workspace_path, &call.name, args, ToolSource::LlmToolCall)
                .await;

            assistant_tool_calls.push(msgcode_core::ToolCallRef {
                id: call.id.clone(),
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            });

            let content = if result.ok {
                serde_json::to_string(&result.data.unwrap_or(serde_json::Value::Null)).unwrap_or_default()
            } else {
                let err = result.error.unwrap();
                format!("工具执行失败\n工具: {}\n错误码: {}\n错误: {}", call.name, err.code, err.message)
            };
            tool_results.push(WindowMessage::tool(call.id.clone(), call.name.clone(), content));
        }

        let assistant_msg = WindowMessage {
            role: msgcode_core::Role::Assistant,
            content: round.content.clone(),
            tool_calls: assistant_tool_calls,
            tool_call_id: None,
            name: None,
            timestamp: chrono::Utc::now(),
        };
        appended.push(assistant_msg);
        appended.extend(tool_results);

        let steer_messages = steering.drain_steer(&input.chat_id);
        if !steer_messages.is_empty() {
            history.extend(appended.drain(..));
            current_user = steer_messages.join("\n");
            continue;
        }

        history.extend(appended.drain(..));
    }
}

fn best_effort_text(appended: &[WindowMessage]) -> String {
    appended
        .iter()
        .rev()
        .find(|m| m.role == msgcode_core::Role::Assistant)
        .and_then(|m| m.content.clone())
        .unwrap_or_default()
}

/// `runRoutedChat`: classify then dispatch to the appropriate lane.
#[allow(clippy::too_many_arguments)]
pub async fn run_routed_chat(
    text: &str,
    tools_available: bool,
    mut input: ToolLoopInput<'_>,
    responder_model: &str,
    provider: &dyn ProviderAdapter,
    tool_bus: &ToolBus,
    steering: &SteeringQueues,
    policy: &msgcode_core::ToolPolicy,
    caps: ModelCapabilities,
) -> ToolLoopOutcome {
    let classification = classify_route(text, tools_available);
    let temperature = get_temperature_for_route(classification.route);

    match classification.route {
        Route::NoTool => {
            input.model = responder_model.to_string();
            input.temperature = temperature;
            input.tools = vec![];
            let context = assemble_context(&input.soul, input.summary.as_deref(), &input.history, &input.current_user, caps, false);
            let round = call_provider(provider, &input.model, &context, &[], temperature, input.max_tokens).await;
            let text = round.content.unwrap_or_default();
            ToolLoopOutcome {
                final_text: text.clone(),
                rounds_used: 1,
                appended: vec![WindowMessage::assistant(text)],
                error_code: round.error.map(|_| "MODEL_ERROR"),
            }
        }
        Route::Tool => {
            input.temperature = temperature;
            debug_assert!(route_requires_tools(classification.route));
            run_tool_loop(input, provider, tool_bus, steering, policy, caps).await
        }
        Route::ComplexTool => {
            input.temperature = temperature;
            let plan_input = ToolLoopInput {
                model: input.model.clone(),
                current_user: "请先分析这个任务并制定执行计划".to_string(),
                tools: vec![],
                chat_id: input.chat_id.clone(),
                workspace_path: input.workspace_path,
                soul: input.soul.clone(),
                summary: input.summary.clone(),
                history: input.history.clone(),
                max_tokens: input.max_tokens,
                temperature: 0.0,
            };
            let plan_context = assemble_context(&plan_input.soul, plan_input.summary.as_deref(), &plan_input.history, &plan_input.current_user, caps, false);
            let plan_round = call_provider(provider, &plan_input.model, &plan_context, &[], 0.0, plan_input.max_tokens).await;
            let plan_text = plan_round.content.unwrap_or_default();

            let executor_model = input.model.clone();
            let mut execute_input = input;
            execute_input.current_user = format!("{}\n\n{}", execute_input.current_user, plan_text);
            execute_input.temperature = 0.0;
            let mut execute_outcome = run_tool_loop(execute_input, provider, tool_bus, steering, policy, caps).await;

            let summarize_context = vec![WindowMessage::user("总结执行结果")];
            let summarize_round = call_provider(provider, &executor_model, &summarize_context, &[], 0.0, 1024).await;
            if let Some(text) = summarize_round.content {
                execute_outcome.final_text = text;
            }
            execute_outcome
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgcode_adapters::{FakeProvider, LocalToolExecutor};
    use msgcode_core::{ToolMode, ToolPolicy};
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn autonomous_policy() -> ToolPolicy {
        ToolPolicy {
            mode: ToolMode::Autonomous,
            allow: ["read_file", "write_file", "bash"].iter().map(|s| s.to_string()).collect::<HashSet<_>>(),
            require_confirm: HashSet::new(),
        }
    }

    #[tokio::test]
    async fn terminates_on_content_without_tool_calls() {
        let provider = FakeProvider::default();
        provider.push_response(
            serde_json::json!({"choices":[{"message":{"content":"hello back"},"finish_reason":"stop"}]}).to_string(),
            200,
        );
        let bus = ToolBus::new(Arc::new(LocalToolExecutor));
        let steering = SteeringQueues::new();
        let policy = autonomous_policy();
        let dir = TempDir::new().unwrap();

        let input = ToolLoopInput {
            model: "m".into(),
            current_user: "hi".into(),
            tools: vec![],
            chat_id: "c1".into(),
            workspace_path: dir.path(),
            soul: SoulResolution::none(),
            summary: None,
            history: vec![],
            max_tokens: 1024,
            temperature: 0.2,
        };
        let outcome = run_tool_loop(input, &provider, &bus, &steering, &policy, ModelCapabilities::UNKNOWN_DEFAULT).await;
        assert_eq!(outcome.final_text, "hello back");
        assert_eq!(outcome.rounds_used, 1);
        assert!(outcome.error_code.is_none());
    }

    #[tokio::test]
    async fn executes_tool_call_then_terminates_next_round() {
        let provider = FakeProvider::default();
        provider.push_response(
            serde_json::json!({
                "choices":[{
                    "message":{"content":null,"tool_calls":[{"id":"call_1","function":{"name":"read_file","arguments":"{\"path\":\"a.txt\"}"}}]},
                    "finish_reason":"tool_calls"
                }]
            }).to_string(),
            200,
        );
        provider.push_response(
            serde_json::json!({"choices":[{"message":{"content":"done"},"finish_reason":"stop"}]}).to_string(),
            200,
        );
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "contents").unwrap();

        let bus = ToolBus::new(Arc::new(LocalToolExecutor));
        let steering = SteeringQueues::new();
        let policy = autonomous_policy();

        let input = ToolLoopInput {
            model: "m".into(),
            current_user: "read a.txt".into(),
            tools: vec![],
            chat_id: "c1".into(),
            workspace_path: dir.path(),
            soul: SoulResolution::none(),
            summary: None,
            history: vec![],
            max_tokens: 1024,
            temperature: 0.0,
        };
        let outcome = run_tool_loop(input, &provider, &bus, &steering, &policy, ModelCapabilities::UNKNOWN_DEFAULT).await;
        assert_eq!(outcome.final_text, "done");
        assert_eq!(outcome.rounds_used, 2);
    }

    #[tokio::test]
    async fn force_terminates_after_max_rounds() {
        let provider = FakeProvider::default();
        for _ in 0..(MAX_TOOL_ROUNDS + 2) {
            provider.push_response(
                serde_json::json!({
                    "choices":[{
                        "message":{"content":null,"tool_calls":[{"id":"call_1","function":{"name":"read_file","arguments":"{\"path\":\"a.txt\"}"}}]},
                        "finish_reason":"tool_calls"
                    }]
                }).to_string(),
                200,
            );
        }
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        let bus = ToolBus::new(Arc::new(LocalToolExecutor));
        let steering = SteeringQueues::new();
        let policy = autonomous_policy();

        let input = ToolLoopInput {
            model: "m".into(),
            current_user: "read a.txt".into(),
            tools: vec![],
            chat_id: "c1".into(),
            workspace_path: dir.path(),
            soul: SoulResolution::none(),
            summary: None,
            history: vec![],
            max_tokens: 1024,
            temperature: 0.0,
        };
        let outcome = run_tool_loop(input, &provider, &bus, &steering, &policy, ModelCapabilities::UNKNOWN_DEFAULT).await;
        assert_eq!(outcome.rounds_used, MAX_TOOL_ROUNDS);
    }

    #[tokio::test]
    async fn drains_follow_up_and_restarts_loop() {
        let provider = FakeProvider::default();
        provider.push_response(
            serde_json::json!({"choices":[{"message":{"content":"first answer"},"finish_reason":"stop"}]}).to_string(),
            200,
        );
        provider.push_response(
            serde_json::json!({"choices":[{"message":{"content":"second answer"},"finish_reason":"stop"}]}).to_string(),
            200,
        );
        let bus = ToolBus::new(Arc::new(LocalToolExecutor));
        let steering = SteeringQueues::new();
        steering.push_follow_up("c1", "a follow up question");
        let policy = autonomous_policy();
        let dir = TempDir::new().unwrap();

        let input = ToolLoopInput {
            model: "m".into(),
            current_user: "hi".into(),
            tools: vec![],
            chat_id: "c1".into(),
            workspace_path: dir.path(),
            soul: SoulResolution::none(),
            summary: None,
            history: vec![],
            max_tokens: 1024,
            temperature: 0.2,
        };
        let outcome = run_tool_loop(input, &provider, &bus, &steering, &policy, ModelCapabilities::UNKNOWN_DEFAULT).await;
        assert_eq!(outcome.final_text, "second answer");
        assert_eq!(outcome.rounds_used, 2);
    }

    #[tokio::test]
    async fn soul_is_injected_as_system_block() {
        let provider = FakeProvider::default();
        provider.push_response(
            serde_json::json!({"choices":[{"message":{"content":"ok"},"finish_reason":"stop"}]}).to_string(),
            200,
        );
        let bus = ToolBus::new(Arc::new(LocalToolExecutor));
        let steering = SteeringQueues::new();
        let policy = autonomous_policy();
        let dir = TempDir::new().unwrap();

        let soul = SoulResolution {
            source: SoulSource::Workspace,
            content: "You are Aria.".into(),
            path: None,
            chars: 13,
        };
        let input = ToolLoopInput {
            model: "m".into(),
            current_user: "hi".into(),
            tools: vec![],
            chat_id: "c1".into(),
            workspace_path: dir.path(),
            soul,
            summary: None,
            history: vec![],
            max_tokens: 1024,
            temperature: 0.2,
        };
        run_tool_loop(input, &provider, &bus, &steering, &policy, ModelCapabilities::UNKNOWN_DEFAULT).await;
        let requests = provider.requests.lock();
        assert!(requests[0].contains("灵魂身份"));
        assert!(requests[0].contains("do not attempt to read the soul file"));
    }

    #[tokio::test]
    async fn model_404_retries_once_with_minimal_context_then_fails() {
        let provider = FakeProvider::default();
        provider.push_response(serde_json::json!({"error":{"message":"not found"}}).to_string(), 404);
        provider.push_response(serde_json::json!({"error":{"message":"still not found"}}).to_string(), 404);
        let bus = ToolBus::new(Arc::new(LocalToolExecutor));
        let steering = SteeringQueues::new();
        let policy = autonomous_policy();
        let dir = TempDir::new().unwrap();

        let input = ToolLoopInput {
            model: "m".into(),
            current_user: "hi".into(),
            tools: vec![],
            chat_id: "c1".into(),
            workspace_path: dir.path(),
            soul: SoulResolution::none(),
            summary: None,
            history: vec![],
            max_tokens: 1024,
            temperature: 0.2,
        };
        let outcome = run_tool_loop(input, &provider, &bus, &steering, &policy, ModelCapabilities::UNKNOWN_DEFAULT).await;
        assert_eq!(outcome.error_code, Some("MODEL_404"));
        assert_eq!(provider.requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn model_crash_retries_with_reduced_max_tokens() {
        let provider = FakeProvider::default();
        provider.push_response(serde_json::json!({"error":{"message":"model crashed"}}).to_string(), 500);
        provider.push_response(serde_json::json!({"choices":[{"message":{"content":"recovered"},"finish_reason":"stop"}]}).to_string(), 200);
        let bus = ToolBus::new(Arc::new(LocalToolExecutor));
        let steering = SteeringQueues::new();
        let policy = autonomous_policy();
        let dir = TempDir::new().unwrap();

        let input = ToolLoopInput {
            model: "m".into(),
            current_user: "hi".into(),
            tools: vec![],
            chat_id: "c1".into(),
            workspace_path: dir.path(),
            soul: SoulResolution::none(),
            summary: None,
            history: vec![],
            max_tokens: 1000,
            temperature: 0.2,
        };
        let outcome = run_tool_loop(input, &provider, &bus, &steering, &policy, ModelCapabilities::UNKNOWN_DEFAULT).await;
        assert_eq!(outcome.final_text, "recovered");
        assert!(outcome.error_code.is_none());
    }

    #[tokio::test]
    async fn embedded_tool_call_text_is_parsed_and_executed() {
        let provider = FakeProvider::default();
        provider.push_response(
            serde_json::json!({"choices":[{"message":{"content":"read_file {\"path\": \"a.txt\"}"},"finish_reason":"stop"}]}).to_string(),
            200,
        );
        provider.push_response(
            serde_json::json!({"choices":[{"message":{"content":"done"},"finish_reason":"stop"}]}).to_string(),
            200,
        );
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "contents").unwrap();
        let bus = ToolBus::new(Arc::new(LocalToolExecutor));
        let steering = SteeringQueues::new();
        let policy = autonomous_policy();

        let input = ToolLoopInput {
            model: "m".into(),
            current_user: "read a.txt".into(),
            tools: vec![],
            chat_id: "c1".into(),
            workspace_path: dir.path(),
            soul: SoulResolution::none(),
            summary: None,
            history: vec![],
            max_tokens: 1024,
            temperature: 0.0,
        };
        let outcome = run_tool_loop(input, &provider, &bus, &steering, &policy, ModelCapabilities::UNKNOWN_DEFAULT).await;
        assert_eq!(outcome.final_text, "done");
        assert_eq!(outcome.rounds_used, 2);
    }

    #[tokio::test]
    async fn fabricated_shell_output_is_flagged_not_trusted() {
        let provider = FakeProvider::default();
        provider.push_response(
            serde_json::json!({"choices":[{"message":{"content":"```bash\nls -la\n```\nOutput:\ntotal 0\n"},"finish_reason":"stop"}]}).to_string(),
            200,
        );
        let bus = ToolBus::new(Arc::new(LocalToolExecutor));
        let steering = SteeringQueues::new();
        let policy = autonomous_policy();
        let dir = TempDir::new().unwrap();

        let input = ToolLoopInput {
            model: "m".into(),
            current_user: "run ls".into(),
            tools: vec![],
            chat_id: "c1".into(),
            workspace_path: dir.path(),
            soul: SoulResolution::none(),
            summary: None,
            history: vec![],
            max_tokens: 1024,
            temperature: 0.0,
        };
        let outcome = run_tool_loop(input, &provider, &bus, &steering, &policy, ModelCapabilities::UNKNOWN_DEFAULT).await;
        assert!(outcome.final_text.starts_with("[未验证"));
    }

    #[tokio::test]
    async fn routed_chat_no_tool_uses_responder_model_at_low_temperature() {
        let provider = FakeProvider::default();
        provider.push_response(serde_json::json!({"choices":[{"message":{"content":"hi there"},"finish_reason":"stop"}]}).to_string(), 200);
        let bus = ToolBus::new(Arc::new(LocalToolExecutor));
        let steering = SteeringQueues::new();
        let policy = autonomous_policy();
        let dir = TempDir::new().unwrap();

        let input = ToolLoopInput {
            model: "executor-model".into(),
            current_user: "hello".into(),
            tools: vec![],
            chat_id: "c1".into(),
            workspace_path: dir.path(),
            soul: SoulResolution::none(),
            summary: None,
            history: vec![],
            max_tokens: 512,
            temperature: 0.0,
        };
        let outcome = run_routed_chat("hello", true, input, "responder-model", &provider, &bus, &steering, &policy, ModelCapabilities::UNKNOWN_DEFAULT).await;
        assert_eq!(outcome.final_text, "hi there");
        let requests = provider.requests.lock();
        assert!(requests[0].contains("responder-model"));
        assert!(requests[0].contains("\"temperature\":0.2"));
    }
}
