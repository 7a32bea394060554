// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort tool-call text parsers (C13, spec §4.13): when a provider
//! answers with a tool call embedded in plain text instead of the
//! structured `tool_calls` field, try a handful of known shapes before
//! giving up. Tried in the order JSON-array -> inline-JSON -> `name(args=…)`
//! -> XML-ish, taking the first that yields at least one call whose name is
//! in the active allowlist.

use msgcode_adapters::NormalizedToolCall;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;

fn inline_json_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)([A-Za-z_][A-Za-z0-9_]*)\s*(\{.*?\})").unwrap())
}

fn call_paren_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)([A-Za-z_][A-Za-z0-9_]*)\s*\(\s*args\s*=\s*(\{.*?\})\s*\)").unwrap())
}

fn xml_ish_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<tool_call>\s*<name>([^<]+)</name>\s*<arguments>(.*?)</arguments>\s*</tool_call>").unwrap()
    })
}

fn make_call(name: &str, arguments_raw: &str, allowlist: &HashSet<String>) -> Option<NormalizedToolCall> {
    if !allowlist.contains(name) {
        return None;
    }
    // Validate it actually parses as JSON; store it compact so downstream
    // tool-bus argument handling sees normal `{...}` text.
    let parsed: Value = serde_json::from_str(arguments_raw).ok()?;
    Some(NormalizedToolCall {
        id: format!("embedded-{name}"),
        name: name.to_string(),
        arguments: parsed.to_string(),
    })
}

/// Tries the JSON-array-wrapped form: a top-level (or fenced) JSON array of
/// `{"name": ..., "arguments": {...}}` objects, same shape the provider
/// would have sent in `tool_calls` had it used the structured field.
fn try_json_array(text: &str, allowlist: &HashSet<String>) -> Vec<NormalizedToolCall> {
    let trimmed = text.trim().trim_start_matches("```json").trim_start_matches("```").trim_end_matches("```").trim();
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else { return vec![] };
    let Some(arr) = value.as_array() else { return vec![] };
    arr.iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?;
            let args = entry.get("arguments").cloned().unwrap_or(Value::Object(Default::default()));
            make_call(name, &args.to_string(), allowlist)
        })
        .collect()
}

/// Tries the `name {json}` inline form.
fn try_inline_json(text: &str, allowlist: &HashSet<String>) -> Vec<NormalizedToolCall> {
    inline_json_re()
        .captures_iter(text)
        .filter_map(|cap| make_call(&cap[1], &cap[2], allowlist))
        .collect()
}

/// Tries the `name(args={json})` call-like form.
fn try_call_paren(text: &str, allowlist: &HashSet<String>) -> Vec<NormalizedToolCall> {
    call_paren_re()
        .captures_iter(text)
        .filter_map(|cap| make_call(&cap[1], &cap[2], allowlist))
        .collect()
}

/// Tries the `<tool_call><name>...</name><arguments>...</arguments></tool_call>` form.
fn try_xml_ish(text: &str, allowlist: &HashSet<String>) -> Vec<NormalizedToolCall> {
    xml_ish_re()
        .captures_iter(text)
        .filter_map(|cap| make_call(cap[1].trim(), cap[2].trim(), allowlist))
        .collect()
}

/// Tries each shape in spec order, returning the first non-empty result.
pub fn parse_embedded_tool_calls(text: &str, allowlist: &HashSet<String>) -> Vec<NormalizedToolCall> {
    let array = try_json_array(text, allowlist);
    if !array.is_empty() {
        return array;
    }
    let inline = try_inline_json(text, allowlist);
    if !inline.is_empty() {
        return inline;
    }
    let paren = try_call_paren(text, allowlist);
    if !paren.is_empty() {
        return paren;
    }
    try_xml_ish(text, allowlist)
}

fn shell_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:bash|sh|shell|zsh)\n(.*?)```").unwrap())
}

const FABRICATED_OUTPUT_MARKERS: &[&str] = &["output:", "stdout:", "result:", "终端输出", "运行结果"];

/// Heuristic for "fake shell execution" prose: a shell-tagged code fence
/// immediately followed by text that reads like the command's output, even
/// though no `bash` tool call actually ran. Surfacing that text as if it
/// were a real result would mislead the user into trusting fabricated data.
pub fn looks_like_fake_shell_execution(text: &str) -> bool {
    let Some(mat) = shell_fence_re().find(text) else { return false };
    let after = &text[mat.end()..];
    let window: String = after.chars().take(200).collect();
    let lower = window.to_lowercase();
    if FABRICATED_OUTPUT_MARKERS.iter().any(|m| lower.contains(m)) {
        return true;
    }
    // A second fenced block immediately following, with no tool call in
    // between, reads as "ran it, here's the output" theater.
    window.trim_start().starts_with("```")
}
