// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `edit_file` patch semantics (spec §4.8): each `oldText` must occur
//! verbatim in the current file content; the edit replaces only the first
//! occurrence, applied in order.

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Edit {
    pub old_text: String,
    pub new_text: String,
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("oldText not found")]
    NotFound,
}

/// Apply each edit in order against `content`, returning the result and the
/// number of edits applied. The first edit whose `oldText` is missing
/// aborts the whole operation.
pub fn apply_edits(content: &str, edits: &[Edit]) -> Result<(String, usize), EditError> {
    let mut current = content.to_string();
    let mut applied = 0;
    for edit in edits {
        let Some(pos) = current.find(&edit.old_text) else {
            return Err(EditError::NotFound);
        };
        current.replace_range(pos..pos + edit.old_text.len(), &edit.new_text);
        applied += 1;
    }
    Ok((current, applied))
}
