// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `msgcode help-docs --json` — emit the command contracts (spec §6).

use chrono::Utc;
use msgcode_core::Envelope;
use serde::Serialize;

#[derive(Serialize)]
struct CommandDoc {
    name: &'static str,
    summary: &'static str,
    args: &'static [&'static str],
}

const COMMANDS: &[CommandDoc] = &[
    CommandDoc { name: "daemon", summary: "start the long-lived worker", args: &[] },
    CommandDoc { name: "probe", summary: "run health probes", args: &[] },
    CommandDoc {
        name: "file send",
        summary: "send a file to a chat",
        args: &["--path <p>", "--to <chat-guid>", "--caption", "--mime"],
    },
    CommandDoc { name: "web search", summary: "search the web", args: &["--q <query>"] },
    CommandDoc { name: "web fetch", summary: "fetch a URL", args: &["--url <url>"] },
    CommandDoc { name: "system info", summary: "print process/environment info", args: &[] },
    CommandDoc { name: "help-docs", summary: "emit this document", args: &["--json"] },
];

pub fn run() -> i32 {
    let started_at = Utc::now();
    let envelope = Envelope::new("help-docs", started_at, serde_json::to_value(COMMANDS).unwrap_or_default());
    println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default());
    envelope.exit_code
}
