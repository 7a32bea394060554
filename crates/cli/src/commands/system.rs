// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `msgcode system info` — process/environment snapshot (spec §6).

use crate::output::{run_json_or_text, OutputFormat};
use msgcode_daemon::env;
use serde::Serialize;

#[derive(Serialize)]
struct SystemInfo {
    version: String,
    os: String,
    arch: String,
    config_dir: String,
    workspace_root: String,
    transport_cli: String,
}

pub async fn run(format: OutputFormat) -> i32 {
    run_json_or_text(
        "system info",
        format,
        || async {
            Ok(SystemInfo {
                version: env!("CARGO_PKG_VERSION").to_string(),
                os: std::env::consts::OS.to_string(),
                arch: std::env::consts::ARCH.to_string(),
                config_dir: env::config_dir().display().to_string(),
                workspace_root: env::workspace_root().display().to_string(),
                transport_cli: msgcode_daemon::inbound_poll::transport_cli_bin(),
            })
        },
        |info: &SystemInfo| {
            println!("msgcode {}", info.version);
            println!("os: {} ({})", info.os, info.arch);
            println!("config_dir: {}", info.config_dir);
            println!("workspace_root: {}", info.workspace_root);
            println!("transport_cli: {}", info.transport_cli);
        },
    )
    .await
}
