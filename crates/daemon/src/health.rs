// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health Probes (C19, spec §4.19): seven fixed-order checks a human or a
//! supervisor runs before trusting the daemon to actually work.

use msgcode_adapters::subprocess::run_with_timeout;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize)]
pub struct Probe {
    pub name: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
}

impl Probe {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, ok: true, details: Some(details.into()), fix_hint: None }
    }

    fn fail(name: &'static str, details: impl Into<String>, fix_hint: impl Into<String>) -> Self {
        Self { name, ok: false, details: Some(details.into()), fix_hint: Some(fix_hint.into()) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub probes: Vec<Probe>,
    pub all_ok: bool,
}

fn transport_cli_bin() -> String {
    std::env::var("MSGCODE_TRANSPORT_CLI").unwrap_or_else(|_| "msgcode-transport".to_string())
}

async fn probe_transport_version() -> Probe {
    let bin = transport_cli_bin();
    let mut cmd = Command::new(&bin);
    cmd.arg("--version");
    match run_with_timeout(cmd, PROBE_TIMEOUT, "transport CLI version").await {
        Ok(output) if output.status.success() => {
            Probe::pass("transport-cli-version", String::from_utf8_lossy(&output.stdout).trim().to_string())
        }
        Ok(output) => Probe::fail(
            "transport-cli-version",
            format!("{bin} --version exited {}", output.status),
            format!("check that {bin} is installed and on PATH"),
        ),
        Err(e) => Probe::fail("transport-cli-version", e, format!("install {bin} and ensure it is on PATH")),
    }
}

async fn probe_transport_rpc_help() -> Probe {
    let bin = transport_cli_bin();
    let mut cmd = Command::new(&bin);
    cmd.args(["rpc", "help"]);
    match run_with_timeout(cmd, PROBE_TIMEOUT, "transport RPC help").await {
        Ok(output) if output.status.success() => Probe::pass("transport-rpc-help", "rpc help responded"),
        Ok(output) => Probe::fail(
            "transport-rpc-help",
            format!("{bin} rpc help exited {}", output.status),
            format!("confirm {bin} supports the rpc help subcommand"),
        ),
        Err(e) => Probe::fail("transport-rpc-help", e, format!("install {bin} and ensure it is on PATH")),
    }
}

fn probe_routes_file_readable(routes_path: &Path) -> Probe {
    match std::fs::read_to_string(routes_path) {
        Ok(_) => Probe::pass("routes-file-readable", routes_path.display().to_string()),
        Err(e) => Probe::fail(
            "routes-file-readable",
            format!("{}: {e}", routes_path.display()),
            "run `msgcode daemon` once to materialize routes.json, or check file permissions",
        ),
    }
}

fn probe_routes_file_json_valid(routes_path: &Path) -> Probe {
    let Ok(contents) = std::fs::read_to_string(routes_path) else {
        return Probe::fail(
            "routes-file-json-valid",
            "could not read routes file",
            "fix the routes-file-readable probe first",
        );
    };
    match serde_json::from_str::<serde_json::Value>(&contents) {
        Ok(_) => Probe::pass("routes-file-json-valid", "valid JSON"),
        Err(e) => Probe::fail(
            "routes-file-json-valid",
            e.to_string(),
            "routes.json is corrupt; restore from backup or delete to start fresh",
        ),
    }
}

fn probe_workspace_root_writable(workspace_root: &Path) -> Probe {
    let probe_path = workspace_root.join(".msgcode-health-probe");
    match std::fs::write(&probe_path, b"ok") {
        Ok(()) => {
            std::fs::remove_file(&probe_path).ok();
            Probe::pass("workspace-root-writable", workspace_root.display().to_string())
        }
        Err(e) => Probe::fail(
            "workspace-root-writable",
            format!("{}: {e}", workspace_root.display()),
            "ensure WORKSPACE_ROOT points at a directory this process can write to",
        ),
    }
}

async fn probe_tmux_present() -> Probe {
    let mut cmd = Command::new("tmux");
    cmd.arg("-V");
    match run_with_timeout(cmd, PROBE_TIMEOUT, "tmux -V").await {
        Ok(output) if output.status.success() => {
            Probe::pass("tmux-present", String::from_utf8_lossy(&output.stdout).trim().to_string())
        }
        _ => Probe::fail("tmux-present", "tmux not found or failed to run", "install tmux and ensure it is on PATH"),
    }
}

async fn probe_claude_cli_present() -> Probe {
    let mut cmd = Command::new("claude");
    cmd.arg("--version");
    match run_with_timeout(cmd, PROBE_TIMEOUT, "claude --version").await {
        Ok(output) if output.status.success() => {
            Probe::pass("claude-cli-present", String::from_utf8_lossy(&output.stdout).trim().to_string())
        }
        _ => Probe::fail(
            "claude-cli-present",
            "claude not found or failed to run",
            "install the claude-code CLI and ensure it is on PATH",
        ),
    }
}

/// Runs all seven probes in the fixed spec order.
pub async fn run_probes(routes_path: &Path, workspace_root: &Path) -> HealthReport {
    let probes = vec![
        probe_transport_version().await,
        probe_transport_rpc_help().await,
        probe_routes_file_readable(routes_path),
        probe_routes_file_json_valid(routes_path),
        probe_workspace_root_writable(workspace_root),
        probe_tmux_present().await,
        probe_claude_cli_present().await,
    ];
    let all_ok = probes.iter().all(|p| p.ok);
    HealthReport { probes, all_ok }
}
