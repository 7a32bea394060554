// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `msgcode daemon` — start the long-lived worker (spec §6).

use anyhow::{anyhow, Result};
use msgcode_daemon::env;
use std::path::PathBuf;
use std::process::Command;

/// Finds the `msgcoded` binary, preferring one built alongside this one
/// (debug or release), falling back to `PATH`.
fn find_daemon_binary() -> Result<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("msgcoded");
            if sibling.exists() {
                return Ok(sibling);
            }
        }
    }
    Ok(PathBuf::from("msgcoded"))
}

/// Runs `msgcoded` in the foreground, inheriting this process's stdio, and
/// exits with its status. The daemon itself owns the singleton lock (C1),
/// so a second invocation simply prints the "already running" message and
/// exits 1 — there is no client/server split to check here first.
pub fn run() -> Result<i32> {
    std::fs::create_dir_all(env::config_dir())?;
    let bin = find_daemon_binary()?;
    let status = Command::new(&bin)
        .status()
        .map_err(|e| anyhow!("failed to launch {}: {e}", bin.display()))?;
    Ok(status.code().unwrap_or(1))
}
