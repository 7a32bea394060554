// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for tmux commands.
pub const TMUX_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for the `bash` tool.
pub const BASH_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Run a subprocess command with a timeout. The child is killed on timeout
/// via `tokio::process::Child`'s drop behavior.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("{description} failed: {io_err}")),
        Err(_elapsed) => Err(format!("{description} timed out after {}s", timeout.as_secs())),
    }
}
