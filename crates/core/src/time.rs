// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timestamp helpers. The daemon always records UTC, RFC 3339 timestamps.

use chrono::{DateTime, Utc};

/// Current UTC time. Centralized so tests can reason about it and so no
/// module reaches for `SystemTime::now()` directly (matches the teacher's
/// `Clock` abstraction, simplified here since no component needs a fake
/// clock for deterministic event ordering — only wall-clock timestamps).
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse an RFC 3339 timestamp, returning `None` on failure so callers can
/// decide whether to repair (Route/State store) or drop (Session Window).
pub fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
