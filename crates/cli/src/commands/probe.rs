// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `msgcode probe` — run the seven health probes (C19) and report (spec §6).

use crate::output::OutputFormat;
use chrono::Utc;
use msgcode_core::Envelope;
use msgcode_daemon::env;
use msgcode_daemon::health::run_probes;

pub async fn run(format: OutputFormat) -> i32 {
    let started_at = Utc::now();
    let config_dir = env::config_dir();
    let workspace_root = env::workspace_root();
    let report = run_probes(&env::routes_file_path(&config_dir), &workspace_root).await;

    match format {
        OutputFormat::Text => {
            for probe in &report.probes {
                let status = if probe.ok { "ok" } else { "FAIL" };
                println!("[{status}] {}", probe.name);
                if let Some(details) = &probe.details {
                    println!("        {details}");
                }
                if let Some(hint) = &probe.fix_hint {
                    println!("        fix: {hint}");
                }
            }
        }
        OutputFormat::Json => {
            let mut envelope = Envelope::new("probe", started_at, serde_json::to_value(&report).unwrap_or_default());
            if !report.all_ok {
                let failed: Vec<&str> = report.probes.iter().filter(|p| !p.ok).map(|p| p.name).collect();
                envelope = envelope.with_error(format!("probes failed: {}", failed.join(", ")));
            }
            println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default());
            return envelope.exit_code;
        }
    }

    if report.all_ok {
        0
    } else {
        1
    }
}
