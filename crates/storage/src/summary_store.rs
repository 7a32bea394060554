// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Summary Store (C5): rolling extract/summary persisted as Markdown (spec §4.5).

use msgcode_core::{Role, Summary, WindowMessage};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummaryStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn summary_path(workspace: &Path, chat_id: &str) -> PathBuf {
    workspace.join(".msgcode").join("summaries").join(format!("{chat_id}.md"))
}

const MAX_TOOL_FACT_LEAVES: usize = 5;

/// Extract a `Summary` from the messages being dropped by a trim,
/// using `full_history` only for the `goal` (earliest user message).
pub fn extract_summary(dropped: &[WindowMessage], full_history: &[WindowMessage]) -> Summary {
    let mut summary = Summary::default();

    if let Some(first_user) = full_history.iter().find(|m| m.role == Role::User) {
        if let Some(content) = &first_user.content {
            let first_line = content.lines().next().unwrap_or("");
            summary.goal.push(truncate(first_line, 120));
        }
    }

    for msg in dropped {
        let Some(content) = &msg.content else { continue };
        match msg.role {
            Role::User => {
                if contains_any(content, &["must", "do not", "don't", "only", "必须", "只能", "不要"]) {
                    summary.constraints.push(truncate(content, 200));
                }
                if content.trim_end().ends_with('?') || content.contains('\u{ff1f}') {
                    summary.open_items.push(truncate(content, 200));
                }
            }
            Role::Assistant => {
                if contains_any(content, &["i decide", "change to", "i'll choose", "决定", "改为", "选择"]) {
                    summary.decisions.push(truncate(content, 200));
                }
            }
            Role::Tool => {
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(content) {
                    if value.get("success").and_then(|v| v.as_bool()) == Some(true) {
                        if let Some(data) = value.get("data") {
                            flatten_leaves(data, String::new(), &mut summary.tool_facts);
                            summary.tool_facts.truncate(summary.tool_facts.len().min(MAX_TOOL_FACT_LEAVES));
                        }
                    }
                }
            }
            Role::System => {}
        }
    }

    summary
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    needles.iter().any(|n| lower.contains(&n.to_lowercase()))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

fn flatten_leaves(value: &serde_json::Value, prefix: String, out: &mut Vec<String>) {
    if out.len() >= MAX_TOOL_FACT_LEAVES {
        return;
    }
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                if out.len() >= MAX_TOOL_FACT_LEAVES {
                    return;
                }
                let key = if prefix.is_empty() { k.clone() } else { format!("{prefix}.{k}") };
                flatten_leaves(v, key, out);
            }
        }
        other => out.push(format!("{prefix}: {other}")),
    }
}

/// `shouldGenerateSummary`: true when a trim actually occurred and
/// `originalCount >= triggerThreshold` (default 20), or when forced.
pub fn should_generate_summary(
    original_count: usize,
    kept_count: usize,
    trigger_threshold: usize,
    force_regenerate: bool,
) -> bool {
    if force_regenerate {
        return true;
    }
    let trimmed = kept_count < original_count;
    trimmed && original_count >= trigger_threshold
}

pub fn format_summary_markdown(summary: &Summary) -> String {
    let mut out = String::from("# Chat Summary\n\n");
    write_section(&mut out, "Goal", &summary.goal);
    write_section(&mut out, "Constraints", &summary.constraints);
    write_section(&mut out, "Decisions", &summary.decisions);
    write_section(&mut out, "Open Items", &summary.open_items);
    write_section(&mut out, "Tool Facts", &summary.tool_facts);
    out
}

fn write_section(out: &mut String, title: &str, items: &[String]) {
    out.push_str(&format!("## {title}\n"));
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
    out.push('\n');
}

/// Lenient inverse of `format_summary_markdown`: tolerates missing sections.
pub fn parse_summary_markdown(markdown: &str) -> Summary {
    let mut summary = Summary::default();
    let mut current: Option<&mut Vec<String>> = None;
    for line in markdown.lines() {
        let trimmed = line.trim();
        if let Some(title) = trimmed.strip_prefix("## ") {
            current = match title {
                "Goal" => Some(&mut summary.goal),
                "Constraints" => Some(&mut summary.constraints),
                "Decisions" => Some(&mut summary.decisions),
                "Open Items" => Some(&mut summary.open_items),
                "Tool Facts" => Some(&mut summary.tool_facts),
                _ => None,
            };
            continue;
        }
        if let Some(item) = trimmed.strip_prefix("- ") {
            if let Some(bucket) = current.as_deref_mut() {
                bucket.push(item.to_string());
            }
        }
    }
    summary
}

pub fn load_summary(workspace: &Path, chat_id: &str) -> Result<Summary, SummaryStoreError> {
    let path = summary_path(workspace, chat_id);
    if !path.exists() {
        return Ok(Summary::default());
    }
    let markdown = fs::read_to_string(path)?;
    Ok(parse_summary_markdown(&markdown))
}

pub fn save_summary(workspace: &Path, chat_id: &str, summary: &Summary) -> Result<(), SummaryStoreError> {
    let path = summary_path(workspace, chat_id);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format_summary_markdown(summary))?;
    Ok(())
}

pub fn clear_summary(workspace: &Path, chat_id: &str) -> Result<(), SummaryStoreError> {
    let path = summary_path(workspace, chat_id);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, "")?;
    Ok(())
}
