// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context Budgeter (C10, spec §4.10): token estimation and tiered,
//! priority-aware trimming of the assembled context window.

use msgcode_core::{Role, WindowMessage};
use msgcode_storage::prune_window;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct ModelCapabilities {
    pub context_window_tokens: u32,
    pub reserved_output_tokens: u32,
    pub chars_per_token: u32,
}

impl ModelCapabilities {
    pub const UNKNOWN_DEFAULT: ModelCapabilities = ModelCapabilities {
        context_window_tokens: 4096,
        reserved_output_tokens: 1024,
        chars_per_token: 2,
    };

    pub const LOCAL_LLM: ModelCapabilities = ModelCapabilities {
        context_window_tokens: 16384,
        reserved_output_tokens: 2048,
        chars_per_token: 2,
    };
}

/// Simple registry keyed by provider target name; `"local"` gets
/// `ModelCapabilities::LOCAL_LLM`, anything else falls back to unknown.
pub fn capabilities_for(provider_target: &str) -> ModelCapabilities {
    match provider_target {
        "local" | "lmstudio" => ModelCapabilities::LOCAL_LLM,
        _ => ModelCapabilities::UNKNOWN_DEFAULT,
    }
}

pub fn compute_input_budget(caps: ModelCapabilities) -> u32 {
    caps.context_window_tokens.saturating_sub(caps.reserved_output_tokens)
}

#[derive(Debug, Clone, Copy)]
pub struct SectionRatios {
    pub system: f64,
    pub summary: f64,
    pub recent: f64,
    pub current: f64,
}

impl Default for SectionRatios {
    fn default() -> Self {
        Self { system: 0.10, summary: 0.20, recent: 0.50, current: 0.20 }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SectionAllocation {
    pub system: u32,
    pub summary: u32,
    pub recent: u32,
    pub current: u32,
}

pub fn allocate_sections(input_budget: u32, ratios: SectionRatios) -> SectionAllocation {
    SectionAllocation {
        system: (input_budget as f64 * ratios.system).floor() as u32,
        summary: (input_budget as f64 * ratios.summary).floor() as u32,
        recent: (input_budget as f64 * ratios.recent).floor() as u32,
        current: (input_budget as f64 * ratios.current).floor() as u32,
    }
}

const PER_MESSAGE_OVERHEAD: u32 = 4;

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

pub fn estimate_message_tokens(msg: &WindowMessage, chars_per_token: u32) -> u32 {
    let role_len = role_str(msg.role).len() as u32;
    let content_len = msg.content.as_deref().map(str::len).unwrap_or(0) as u32;
    let tool_args_len: u32 = msg.tool_calls.iter().map(|tc| tc.arguments.len() as u32).sum();
    let chars = role_len + content_len + tool_args_len;
    chars.div_ceil(chars_per_token.max(1)) + PER_MESSAGE_OVERHEAD
}

pub fn estimate_total_tokens(messages: &[WindowMessage], chars_per_token: u32) -> u32 {
    messages.iter().map(|m| estimate_message_tokens(m, chars_per_token)).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Priority {
    P1LatestUser,
    P2Tool,
    P3LatestAssistant,
    P4OlderUser,
    P5OlderAssistant,
}

fn priority_of(index: usize, msg: &WindowMessage, latest_user_idx: Option<usize>, latest_assistant_idx: Option<usize>) -> Priority {
    match msg.role {
        Role::Tool => Priority::P2Tool,
        Role::User if Some(index) == latest_user_idx => Priority::P1LatestUser,
        Role::Assistant if Some(index) == latest_assistant_idx => Priority::P3LatestAssistant,
        Role::User => Priority::P4OlderUser,
        Role::Assistant => Priority::P5OlderAssistant,
        Role::System => Priority::P1LatestUser,
    }
}

/// Drops messages from the front, highest-priority-retained-first, until
/// the remainder fits `budget` tokens. Kept messages preserve original order.
pub fn trim_by_budget(messages: &[WindowMessage], budget: u32, chars_per_token: u32) -> Vec<WindowMessage> {
    if estimate_total_tokens(messages, chars_per_token) <= budget {
        return messages.to_vec();
    }

    let latest_user_idx = messages.iter().rposition(|m| m.role == Role::User);
    let latest_assistant_idx = messages.iter().rposition(|m| m.role == Role::Assistant);

    let mut indexed: Vec<(usize, Priority)> = messages
        .iter()
        .enumerate()
        .map(|(i, m)| (i, priority_of(i, m, latest_user_idx, latest_assistant_idx)))
        .collect();
    indexed.sort_by_key(|(_, p)| *p);

    let mut kept_indices: std::collections::BTreeSet<usize> = std::collections::BTreeSet::new();
    let mut total = 0u32;
    for (i, _) in indexed {
        let cost = estimate_message_tokens(&messages[i], chars_per_token);
        if total + cost > budget && !kept_indices.is_empty() {
            continue;
        }
        kept_indices.insert(i);
        total += cost;
    }

    kept_indices.into_iter().map(|i| messages[i].clone()).collect()
}

/// Token-based trim with a fallback to `prune_window` when the messages
/// carry no usable role information at all (fully empty budget-eligible set).
pub fn trim_messages_by_budget(
    messages: &[WindowMessage],
    budget: u32,
    chars_per_token: u32,
    fallback_count: usize,
) -> Vec<WindowMessage> {
    if messages.is_empty() || chars_per_token == 0 {
        return prune_window(messages, fallback_count);
    }
    trim_by_budget(messages, budget, chars_per_token)
}

#[derive(Debug, Clone)]
pub struct BudgetSummary {
    pub estimated_total: u32,
    pub estimated_by_section: HashMap<String, u32>,
    pub allocation: SectionAllocation,
    pub within_budget: bool,
}

pub fn get_budget_summary(
    messages: &[WindowMessage],
    allocation: SectionAllocation,
    chars_per_token: u32,
) -> BudgetSummary {
    let mut by_section = HashMap::new();
    let system_tokens: u32 = messages.iter().filter(|m| m.role == Role::System).map(|m| estimate_message_tokens(m, chars_per_token)).sum();
    let tool_tokens: u32 = messages.iter().filter(|m| m.role == Role::Tool).map(|m| estimate_message_tokens(m, chars_per_token)).sum();
    let other_tokens: u32 = messages
        .iter()
        .filter(|m| m.role != Role::System && m.role != Role::Tool)
        .map(|m| estimate_message_tokens(m, chars_per_token))
        .sum();
    by_section.insert("system".to_string(), system_tokens);
    by_section.insert("tool".to_string(), tool_tokens);
    by_section.insert("recent".to_string(), other_tokens);

    let total = estimate_total_tokens(messages, chars_per_token);
    let budget_total = allocation.system + allocation.summary + allocation.recent + allocation.current;
    BudgetSummary {
        estimated_total: total,
        estimated_by_section: by_section,
        allocation,
        within_budget: total <= budget_total,
    }
}
