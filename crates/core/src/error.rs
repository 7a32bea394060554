// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kind taxonomy shared across msgcode crates (spec §7).
//!
//! Each concern (storage, tool bus, command router, ...) owns its own
//! `thiserror` enum; those enums convert into `CoreError` at the
//! boundary where callers need a single stable error-kind string
//! (e.g. the tool bus response, CLI envelope error).

use thiserror::Error;

/// The closed set of error kinds named in spec §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    LockTaken,
    RouteNotFound,
    WorkspaceNotBound,
    PathUnsafe,
    VersionMismatch,
    CorruptState,
    ToolNotAllowed,
    ToolExecFailed,
    ToolTimeout,
    ModelError,
    ModelCrashed,
    Model404,
    PolicyEgressBlocked,
    RateLimited,
    SizeExceeded,
    SendFailed,
    InvalidArgs,
}

impl ErrorKind {
    /// The stable uppercase-snake code used in tool/CLI error payloads.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::LockTaken => "LOCK_TAKEN",
            ErrorKind::RouteNotFound => "ROUTE_NOT_FOUND",
            ErrorKind::WorkspaceNotBound => "WORKSPACE_NOT_BOUND",
            ErrorKind::PathUnsafe => "PATH_UNSAFE",
            ErrorKind::VersionMismatch => "VERSION_MISMATCH",
            ErrorKind::CorruptState => "CORRUPT_STATE",
            ErrorKind::ToolNotAllowed => "TOOL_NOT_ALLOWED",
            ErrorKind::ToolExecFailed => "TOOL_EXEC_FAILED",
            ErrorKind::ToolTimeout => "TOOL_TIMEOUT",
            ErrorKind::ModelError => "MODEL_ERROR",
            ErrorKind::ModelCrashed => "MODEL_CRASHED",
            ErrorKind::Model404 => "MODEL_404",
            ErrorKind::PolicyEgressBlocked => "POLICY_EGRESS_BLOCKED",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::SizeExceeded => "SIZE_EXCEEDED",
            ErrorKind::SendFailed => "SEND_FAILED",
            ErrorKind::InvalidArgs => "INVALID_ARGS",
        }
    }
}

/// A generic, kind-tagged error usable anywhere a boundary needs to
/// surface one of the closed error kinds with a human message.
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub kind: ErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_spec_strings() {
        assert_eq!(ErrorKind::ToolNotAllowed.code(), "TOOL_NOT_ALLOWED");
        assert_eq!(ErrorKind::Model404.code(), "MODEL_404");
    }
}
