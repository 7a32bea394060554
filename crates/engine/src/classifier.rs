// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Route Classifier (C11, spec §4.11): the three-way no-tool/tool/complex-tool
//! lane decision, evaluated as five ordered rules — first match wins.

use msgcode_core::{Confidence, Route, RouteClassification};

const MULTI_STEP_MARKERS: &[&str] = &["then", "之后", "然后", "后", "分析", "设计", "规划", "架构", "方案"];
const FILE_COMMAND_MARKERS: &[&str] = &["read ", "write ", "edit ", "npm ", "git ", "pwd", "ls ", "ls\n"];
const CODE_VERBS: &[&str] = &["refactor", "implement", "debug", "compile", "build "];
const CHAT_MARKERS: &[&str] =
    &["hello", "hi", "hey", "thanks", "thank you", "what is", "是什么", "你好", "您好"];

const LONG_TEXT_THRESHOLD: usize = 200;

fn looks_like_file_path(text: &str) -> bool {
    text.split_whitespace().any(|word| {
        (word.contains('/') || word.contains('\\')) && word.contains('.')
    })
}

fn contains_any(text_lower: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text_lower.contains(m))
}

/// `classifyRoute(text, toolsAvailable=true)`.
pub fn classify_route(text: &str, tools_available: bool) -> RouteClassification {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();

    // Rule 1
    if trimmed.is_empty() || !tools_available {
        return RouteClassification {
            route: Route::NoTool,
            confidence: Confidence::High,
            reason: "empty text or tools unavailable".to_string(),
        };
    }

    // Rule 2
    if contains_any(&lower, MULTI_STEP_MARKERS) {
        return RouteClassification {
            route: Route::ComplexTool,
            confidence: Confidence::Medium,
            reason: "multi-step markers detected".to_string(),
        };
    }

    // Rule 3
    if contains_any(&lower, FILE_COMMAND_MARKERS)
        || contains_any(&lower, CODE_VERBS)
        || looks_like_file_path(trimmed)
        || trimmed.chars().count() > LONG_TEXT_THRESHOLD
    {
        return RouteClassification {
            route: Route::Tool,
            confidence: Confidence::High,
            reason: "file/command markers or long text".to_string(),
        };
    }

    // Rule 4
    if contains_any(&lower, CHAT_MARKERS) {
        return RouteClassification {
            route: Route::NoTool,
            confidence: Confidence::High,
            reason: "chat markers detected".to_string(),
        };
    }

    // Rule 5
    RouteClassification {
        route: Route::NoTool,
        confidence: Confidence::Medium,
        reason: "default".to_string(),
    }
}

pub fn route_requires_tools(route: Route) -> bool {
    route != Route::NoTool
}

pub fn get_temperature_for_route(route: Route) -> f32 {
    match route {
        Route::Tool | Route::ComplexTool => 0.0,
        Route::NoTool => 0.2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_no_tool_high() {
        let c = classify_route("", true);
        assert_eq!(c.route, Route::NoTool);
        assert_eq!(c.confidence, Confidence::High);
    }

    #[test]
    fn tools_unavailable_forces_no_tool() {
        let c = classify_route("please read main.rs", false);
        assert_eq!(c.route, Route::NoTool);
    }

    #[test]
    fn multi_step_marker_wins_over_file_marker() {
        let c = classify_route("read main.rs then 分析 the output", true);
        assert_eq!(c.route, Route::ComplexTool);
    }

    #[test]
    fn file_marker_is_tool_route() {
        let c = classify_route("please read src/lib.rs", true);
        assert_eq!(c.route, Route::Tool);
    }

    #[test]
    fn long_text_without_markers_is_tool_route() {
        let long = "a".repeat(201);
        let c = classify_route(&long, true);
        assert_eq!(c.route, Route::Tool);
    }

    #[test]
    fn greeting_is_no_tool() {
        let c = classify_route("hello there", true);
        assert_eq!(c.route, Route::NoTool);
        assert_eq!(c.confidence, Confidence::High);
    }

    #[test]
    fn plain_statement_defaults_to_no_tool_medium() {
        let c = classify_route("I like rust programming", true);
        assert_eq!(c.route, Route::NoTool);
        assert_eq!(c.confidence, Confidence::Medium);
    }

    #[test]
    fn route_requires_tools_matches_spec() {
        assert!(!route_requires_tools(Route::NoTool));
        assert!(route_requires_tools(Route::Tool));
        assert!(route_requires_tools(Route::ComplexTool));
    }

    #[test]
    fn temperature_is_zero_for_tool_routes() {
        assert_eq!(get_temperature_for_route(Route::Tool), 0.0);
        assert_eq!(get_temperature_for_route(Route::ComplexTool), 0.0);
        assert_eq!(get_temperature_for_route(Route::NoTool), 0.2);
    }
}
