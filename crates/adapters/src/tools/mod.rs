// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool implementations backing the Tool Bus (C8, spec §4.8).
//!
//! The policy gate and telemetry ring live in `msgcode-engine`; this module
//! only implements the actual effect of each known tool name.

mod edit;

use async_trait::async_trait;
use msgcode_storage::{append_desktop_record, DesktopSessionRecord, MemoryStore};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::subprocess::{run_with_timeout, BASH_TOOL_TIMEOUT};

pub use edit::{apply_edits, Edit, EditError};

#[derive(Debug, Error)]
pub enum ToolExecError {
    #[error("{0}")]
    Failed(String),
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

/// Executes one of the known tool names against a workspace. Separate from
/// the policy gate (which decides *whether* to call this).
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, workspace: &Path, tool: &str, args: Value) -> Result<Value, ToolExecError>;
}

pub struct LocalToolExecutor;

#[async_trait]
impl ToolExecutor for LocalToolExecutor {
    async fn execute(&self, workspace: &Path, tool: &str, args: Value) -> Result<Value, ToolExecError> {
        match tool {
            "read_file" => read_file(workspace, &args),
            "write_file" => write_file(workspace, &args),
            "edit_file" => edit_file(workspace, &args),
            "bash" => bash(&args).await,
            "mem" => mem(workspace, &args),
            "desktop" => desktop(workspace, &args),
            "tts" | "asr" | "vision" | "browser" => {
                Err(ToolExecError::Failed(format!("{tool} backend not configured in this deployment")))
            }
            other => Err(ToolExecError::UnknownTool(other.to_string())),
        }
    }
}

fn resolve_path(workspace: &Path, rel: &str) -> Result<PathBuf, ToolExecError> {
    let rel_path = Path::new(rel);
    if rel_path.is_absolute() {
        return Ok(rel_path.to_path_buf());
    }
    Ok(workspace.join(rel_path))
}

fn read_file(workspace: &Path, args: &Value) -> Result<Value, ToolExecError> {
    let path = args
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolExecError::InvalidArgs("missing path".into()))?;
    let full = resolve_path(workspace, path)?;
    let content = std::fs::read_to_string(&full).map_err(|e| ToolExecError::Failed(e.to_string()))?;
    Ok(json!({ "path": path, "content": content }))
}

fn write_file(workspace: &Path, args: &Value) -> Result<Value, ToolExecError> {
    let path = args
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolExecError::InvalidArgs("missing path".into()))?;
    let content = args
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolExecError::InvalidArgs("missing content".into()))?;
    let full = resolve_path(workspace, path)?;
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ToolExecError::Failed(e.to_string()))?;
    }
    std::fs::write(&full, content).map_err(|e| ToolExecError::Failed(e.to_string()))?;
    Ok(json!({ "path": path, "bytesWritten": content.len() }))
}

fn edit_file(workspace: &Path, args: &Value) -> Result<Value, ToolExecError> {
    let path = args
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| ToolExecError::InvalidArgs("missing path".into()))?;
    let edits_raw = args
        .get("edits")
        .and_then(Value::as_array)
        .ok_or_else(|| ToolExecError::InvalidArgs("missing edits".into()))?;
    let edits: Vec<Edit> = edits_raw
        .iter()
        .map(|e| {
            Ok(Edit {
                old_text: e
                    .get("oldText")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ToolExecError::InvalidArgs("edit missing oldText".into()))?
                    .to_string(),
                new_text: e.get("newText").and_then(Value::as_str).unwrap_or("").to_string(),
            })
        })
        .collect::<Result<_, ToolExecError>>()?;

    let full = resolve_path(workspace, path)?;
    let original = std::fs::read_to_string(&full).map_err(|e| ToolExecError::Failed(e.to_string()))?;
    let (updated, applied) = apply_edits(&original, &edits).map_err(|e| ToolExecError::Failed(e.to_string()))?;
    std::fs::write(&full, &updated).map_err(|e| ToolExecError::Failed(e.to_string()))?;
    Ok(json!({ "path": path, "editsApplied": applied }))
}

async fn bash(args: &Value) -> Result<Value, ToolExecError> {
    let command = args.get("command").and_then(Value::as_str).unwrap_or("");
    if command.trim().is_empty() {
        return Err(ToolExecError::Failed("command is empty".into()));
    }
    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c").arg(command);
    let output = run_with_timeout(cmd, BASH_TOOL_TIMEOUT, "bash")
        .await
        .map_err(ToolExecError::Failed)?;
    Ok(json!({
        "exitCode": output.status.code().unwrap_or(-1),
        "stdout": String::from_utf8_lossy(&output.stdout),
        "stderr": String::from_utf8_lossy(&output.stderr),
    }))
}

fn mem(workspace: &Path, args: &Value) -> Result<Value, ToolExecError> {
    let op = args.get("op").and_then(Value::as_str).unwrap_or("get");
    let mut store = MemoryStore::load(workspace).map_err(|e| ToolExecError::Failed(e.to_string()))?;
    match op {
        "get" => {
            let key = args.get("key").and_then(Value::as_str).ok_or_else(|| ToolExecError::InvalidArgs("missing key".into()))?;
            Ok(json!({ "key": key, "value": store.get(key) }))
        }
        "set" => {
            let key = args.get("key").and_then(Value::as_str).ok_or_else(|| ToolExecError::InvalidArgs("missing key".into()))?;
            let value = args.get("value").and_then(Value::as_str).unwrap_or("");
            store.set(key, value).map_err(|e| ToolExecError::Failed(e.to_string()))?;
            Ok(json!({ "key": key, "stored": true }))
        }
        "list" => Ok(json!({ "entries": store.list().into_iter().map(|(k, v)| json!({"key": k, "value": v})).collect::<Vec<_>>() })),
        "delete" => {
            let key = args.get("key").and_then(Value::as_str).ok_or_else(|| ToolExecError::InvalidArgs("missing key".into()))?;
            let removed = store.delete(key).map_err(|e| ToolExecError::Failed(e.to_string()))?;
            Ok(json!({ "key": key, "removed": removed }))
        }
        other => Err(ToolExecError::InvalidArgs(format!("unknown mem op: {other}"))),
    }
}

fn desktop(workspace: &Path, args: &Value) -> Result<Value, ToolExecError> {
    let summary = args.get("summary").and_then(Value::as_str).unwrap_or("desktop action").to_string();
    let record = DesktopSessionRecord {
        timestamp: chrono::Utc::now(),
        tool: "desktop".into(),
        workspace_path: workspace.to_path_buf(),
        ok: true,
        summary: summary.clone(),
    };
    append_desktop_record(workspace, &record).map_err(|e| ToolExecError::Failed(e.to_string()))?;
    Ok(json!({ "recorded": true, "summary": summary }))
}
