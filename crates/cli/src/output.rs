// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared `--json` / text output split (spec §6 Envelope).

use chrono::Utc;
use clap::ValueEnum;
use msgcode_core::Envelope;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Runs `body`, wraps its outcome in an `Envelope`, and prints either the
/// envelope's JSON or `render` of the inner data — then exits with the
/// envelope's status code via the returned `i32`.
pub async fn run_json_or_text<T, F, Fut, R>(
    command: &str,
    format: OutputFormat,
    body: F,
    render: R,
) -> i32
where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<T>>,
    R: FnOnce(&T),
{
    let started_at = Utc::now();
    match body().await {
        Ok(data) => {
            let envelope = Envelope::new(command, started_at, serde_json::to_value(&data).unwrap_or_default());
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default()),
                OutputFormat::Text => render(&data),
            }
            envelope.exit_code
        }
        Err(e) => {
            let envelope =
                Envelope::new(command, started_at, serde_json::Value::Null).with_error(e.to_string());
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default()),
                OutputFormat::Text => eprintln!("Error: {e}"),
            }
            envelope.exit_code
        }
    }
}
