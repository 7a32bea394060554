// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool Bus & Telemetry (C8, spec §4.8): the single policy-gated entry
//! point for executing named capabilities, with a bounded ring-buffer of
//! recorded events.

use chrono::Utc;
use msgcode_adapters::{ToolExecError, ToolExecutor};
use msgcode_core::{ErrorKind, ToolEvent, ToolMode, ToolPolicy, ToolSource};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Bounded ring buffer capacity (spec §4.8): "caps at 200 events".
pub const RING_BUFFER_CAPACITY: usize = 200;

#[derive(Debug, Clone)]
pub struct ToolBusErrorPayload {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ToolBusResult {
    pub ok: bool,
    pub tool: String,
    pub data: Option<Value>,
    pub error: Option<ToolBusErrorPayload>,
}

impl ToolBusResult {
    fn ok(tool: &str, data: Value) -> Self {
        Self { ok: true, tool: tool.to_string(), data: Some(data), error: None }
    }

    fn denied(tool: &str, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            tool: tool.to_string(),
            data: None,
            error: Some(ToolBusErrorPayload { code: kind.code(), message: message.into() }),
        }
    }
}

/// `canExecuteTool`: the policy gate, evaluated before every call
/// (spec §4.8, rules 1-4 in order).
pub fn can_execute_tool(policy: &ToolPolicy, tool: &str, source: ToolSource) -> Result<(), ToolBusErrorPayload> {
    if source == ToolSource::LlmToolCall && policy.mode == ToolMode::Explicit {
        return Err(ToolBusErrorPayload {
            code: ErrorKind::ToolNotAllowed.code(),
            message: "llm tool-call disabled in explicit mode".to_string(),
        });
    }
    if source == ToolSource::MediaPipeline && tool != "asr" && tool != "vision" {
        return Err(ToolBusErrorPayload {
            code: ErrorKind::ToolNotAllowed.code(),
            message: "not allowed from media-pipeline".to_string(),
        });
    }
    if !policy.allow.contains(tool) {
        return Err(ToolBusErrorPayload {
            code: ErrorKind::ToolNotAllowed.code(),
            message: format!("tool not allowed: {tool}"),
        });
    }
    Ok(())
}

#[derive(Debug, Default, Clone)]
pub struct ToolStats {
    pub total_calls: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub success_rate: f64,
    pub avg_duration_ms: f64,
    pub by_tool: HashMap<String, u64>,
    pub by_source: HashMap<String, u64>,
    pub top_error_codes: Vec<(String, u64)>,
}

/// Fixed-size circular buffer of `ToolEvent`s behind a short-held lock
/// (spec §9 "ring-buffer telemetry").
struct RingBuffer {
    events: Vec<ToolEvent>,
}

impl RingBuffer {
    fn new() -> Self {
        Self { events: Vec::with_capacity(RING_BUFFER_CAPACITY) }
    }

    fn push(&mut self, event: ToolEvent) {
        if self.events.len() >= RING_BUFFER_CAPACITY {
            self.events.remove(0);
        }
        self.events.push(event);
    }

    fn snapshot(&self) -> Vec<ToolEvent> {
        self.events.clone()
    }
}

pub struct ToolBus {
    executor: Arc<dyn ToolExecutor>,
    ring: Mutex<RingBuffer>,
}

impl ToolBus {
    pub fn new(executor: Arc<dyn ToolExecutor>) -> Self {
        Self { executor, ring: Mutex::new(RingBuffer::new()) }
    }

    /// `executeTool`: gate, execute, record, and return the bus-shaped result.
    pub async fn execute_tool(
        &self,
        policy: &ToolPolicy,
        workspace: &Path,
        tool: &str,
        args: Value,
        source: ToolSource,
    ) -> ToolBusResult {
        let request_id = uuid::Uuid::new_v4().to_string();
        let started = std::time::Instant::now();

        if let Err(denied) = can_execute_tool(policy, tool, source) {
            self.record(ToolEvent {
                request_id,
                workspace_path: workspace.to_path_buf(),
                tool: tool.to_string(),
                source,
                duration_ms: started.elapsed().as_millis() as u64,
                ok: false,
                error_code: Some(denied.code.to_string()),
                artifact_paths: vec![],
                timestamp: Utc::now(),
            });
            return ToolBusResult {
                ok: false,
                tool: tool.to_string(),
                data: None,
                error: Some(denied),
            };
        }

        let result = self.executor.execute(workspace, tool, args).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(data) => {
                self.record(ToolEvent {
                    request_id,
                    workspace_path: workspace.to_path_buf(),
                    tool: tool.to_string(),
                    source,
                    duration_ms,
                    ok: true,
                    error_code: None,
                    artifact_paths: vec![],
                    timestamp: Utc::now(),
                });
                ToolBusResult::ok(tool, data)
            }
            Err(err) => {
                let (code, message) = exec_error_to_code(&err);
                self.record(ToolEvent {
                    request_id,
                    workspace_path: workspace.to_path_buf(),
                    tool: tool.to_string(),
                    source,
                    duration_ms,
                    ok: false,
                    error_code: Some(code.to_string()),
                    artifact_paths: vec![],
                    timestamp: Utc::now(),
                });
                ToolBusResult::denied(tool, code_to_kind(code), message)
            }
        }
    }

    fn record(&self, event: ToolEvent) {
        self.ring.lock().push(event);
    }

    /// `getToolStats`: aggregate events with `timestamp >= now - window_ms`.
    pub fn get_tool_stats(&self, window_ms: i64) -> ToolStats {
        let now = Utc::now();
        let events: Vec<ToolEvent> = self
            .ring
            .lock()
            .snapshot()
            .into_iter()
            .filter(|e| (now - e.timestamp).num_milliseconds() <= window_ms)
            .collect();

        let mut stats = ToolStats::default();
        stats.total_calls = events.len() as u64;
        let mut duration_sum = 0u64;
        let mut error_codes: HashMap<String, u64> = HashMap::new();
        for event in &events {
            *stats.by_tool.entry(event.tool.clone()).or_insert(0) += 1;
            *stats.by_source.entry(event.source.to_string()).or_insert(0) += 1;
            duration_sum += event.duration_ms;
            if event.ok {
                stats.success_count += 1;
            } else {
                stats.failure_count += 1;
                if let Some(code) = &event.error_code {
                    *error_codes.entry(code.clone()).or_insert(0) += 1;
                }
            }
        }
        if stats.total_calls > 0 {
            stats.success_rate = stats.success_count as f64 / stats.total_calls as f64;
            stats.avg_duration_ms = duration_sum as f64 / stats.total_calls as f64;
        }
        let mut top: Vec<(String, u64)> = error_codes.into_iter().collect();
        top.sort_by(|a, b| b.1.cmp(&a.1));
        stats.top_error_codes = top;
        stats
    }
}

fn exec_error_to_code(err: &ToolExecError) -> (&'static str, String) {
    match err {
        ToolExecError::InvalidArgs(msg) => (ErrorKind::InvalidArgs.code(), msg.clone()),
        ToolExecError::Timeout(_) => (ErrorKind::ToolTimeout.code(), err.to_string()),
        ToolExecError::Failed(msg) => (ErrorKind::ToolExecFailed.code(), msg.clone()),
        ToolExecError::UnknownTool(_) => (ErrorKind::ToolNotAllowed.code(), err.to_string()),
    }
}

fn code_to_kind(code: &str) -> ErrorKind {
    match code {
        "TOOL_TIMEOUT" => ErrorKind::ToolTimeout,
        "INVALID_ARGS" => ErrorKind::InvalidArgs,
        _ => ErrorKind::ToolExecFailed,
    }
}
