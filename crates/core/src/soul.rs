// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `SoulResolution`: the resolved persona text injected into the tool loop
//! system prompt (spec §9 "SOUL precedence").

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoulSource {
    /// Workspace-scoped `SOUL.md` — highest precedence.
    Workspace,
    /// Active global soul under `souls/active.json`.
    Global,
    /// No soul file resolved.
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoulResolution {
    pub source: SoulSource,
    pub content: String,
    pub path: Option<PathBuf>,
    pub chars: usize,
}

impl SoulResolution {
    pub fn none() -> Self {
        Self {
            source: SoulSource::None,
            content: String::new(),
            path: None,
            chars: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.source != SoulSource::None
    }
}
