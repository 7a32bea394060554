// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Summary`: the compressed representation of trimmed-away history (spec §3, §4.5).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub goal: Vec<String>,
    pub constraints: Vec<String>,
    pub decisions: Vec<String>,
    pub open_items: Vec<String>,
    pub tool_facts: Vec<String>,
}

impl Summary {
    pub fn is_empty(&self) -> bool {
        self.goal.is_empty()
            && self.constraints.is_empty()
            && self.decisions.is_empty()
            && self.open_items.is_empty()
            && self.tool_facts.is_empty()
    }
}
