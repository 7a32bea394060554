// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polls the external transport CLI for new inbound messages. The transport
//! itself is an external collaborator (spec §4.17); this module only knows
//! how to shell out to its `rpc recv` subcommand and parse the result.

use msgcode_adapters::subprocess::run_with_timeout;
use msgcode_core::InboundMessage;
use std::time::Duration;
use tokio::process::Command;

const POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// `MSGCODE_TRANSPORT_CLI` overrides the transport binary name, same
/// variable the health probes read.
pub fn transport_cli_bin() -> String {
    std::env::var("MSGCODE_TRANSPORT_CLI").unwrap_or_else(|_| "msgcode-transport".to_string())
}

/// Calls `{bin} rpc recv`, which prints a JSON array of pending inbound
/// messages to stdout and drains them from the transport's own queue. A
/// non-zero exit or malformed JSON is logged and treated as an empty batch
/// so one bad poll never wedges the loop.
pub async fn poll_once(bin: &str) -> Vec<InboundMessage> {
    let mut cmd = Command::new(bin);
    cmd.args(["rpc", "recv"]);
    let output = match run_with_timeout(cmd, POLL_TIMEOUT, "transport rpc recv").await {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(error = %e, "inbound poll failed");
            return Vec::new();
        }
    };
    if !output.status.success() {
        tracing::warn!(
            status = %output.status,
            stderr = %String::from_utf8_lossy(&output.stderr),
            "transport rpc recv exited non-zero"
        );
        return Vec::new();
    }
    match serde_json::from_slice::<Vec<InboundMessage>>(&output.stdout) {
        Ok(messages) => messages,
        Err(e) => {
            tracing::warn!(error = %e, "inbound poll returned malformed JSON");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unresolvable_binary_yields_empty_batch() {
        let messages = poll_once("msgcode-transport-does-not-exist").await;
        assert!(messages.is_empty());
    }
}
