// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Envelope`: the fixed-shape JSON output of every `--json` CLI command (spec §6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Pass,
    Warning,
    Error,
}

impl EnvelopeStatus {
    /// Exit code mapping: 0 pass, 1 error, 2 warning (spec §6).
    pub fn exit_code(self) -> i32 {
        match self {
            EnvelopeStatus::Pass => 0,
            EnvelopeStatus::Error => 1,
            EnvelopeStatus::Warning => 2,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvelopeSummary {
    pub warnings: u32,
    pub errors: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub schema_version: u32,
    pub command: String,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub status: EnvelopeStatus,
    pub exit_code: i32,
    pub summary: EnvelopeSummary,
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(command: impl Into<String>, started_at: DateTime<Utc>, data: T) -> Self {
        let command = command.into();
        Self {
            schema_version: 2,
            command,
            request_id: crate::ids::new_request_id(),
            timestamp: started_at,
            duration_ms: (Utc::now() - started_at).num_milliseconds().max(0) as u64,
            status: EnvelopeStatus::Pass,
            exit_code: 0,
            summary: EnvelopeSummary::default(),
            data,
            warnings: vec![],
            errors: vec![],
        }
    }

    pub fn with_warning(mut self, message: impl Into<String>) -> Self {
        self.warnings.push(message.into());
        self.summary.warnings += 1;
        if self.status == EnvelopeStatus::Pass {
            self.status = EnvelopeStatus::Warning;
        }
        self.exit_code = self.status.exit_code();
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.errors.push(message.into());
        self.summary.errors += 1;
        self.status = EnvelopeStatus::Error;
        self.exit_code = self.status.exit_code();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_spec() {
        assert_eq!(EnvelopeStatus::Pass.exit_code(), 0);
        assert_eq!(EnvelopeStatus::Error.exit_code(), 1);
        assert_eq!(EnvelopeStatus::Warning.exit_code(), 2);
    }

    #[test]
    fn error_overrides_warning_status() {
        let env = Envelope::new("probe", Utc::now(), serde_json::json!({}))
            .with_warning("tmux missing")
            .with_error("routes file unreadable");
        assert_eq!(env.status, EnvelopeStatus::Error);
        assert_eq!(env.exit_code, 1);
        assert_eq!(env.summary.warnings, 1);
        assert_eq!(env.summary.errors, 1);
    }

    #[test]
    fn schema_version_is_2() {
        let env = Envelope::new("system info", Utc::now(), serde_json::json!({}));
        assert_eq!(env.schema_version, 2);
    }
}
