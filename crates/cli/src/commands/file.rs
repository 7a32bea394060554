// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `msgcode file send` — push a local file to a chat over the transport
//! RPC (spec §6, C17).

use crate::output::{run_json_or_text, OutputFormat};
use anyhow::anyhow;
use clap::{Args, Subcommand};
use msgcode_adapters::{CliTransport, Transport};
use msgcode_daemon::inbound_poll::transport_cli_bin;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args)]
pub struct FileArgs {
    #[command(subcommand)]
    pub command: FileCommand,
}

#[derive(Subcommand)]
pub enum FileCommand {
    /// Send a file to a chat
    Send {
        #[arg(long)]
        path: PathBuf,
        #[arg(long = "to")]
        to: String,
        #[arg(long)]
        caption: Option<String>,
        #[arg(long)]
        mime: Option<String>,
    },
}

#[derive(Serialize)]
struct FileSendResult {
    chat_guid: String,
    path: String,
}

pub async fn run(args: FileArgs, format: OutputFormat) -> i32 {
    let FileCommand::Send { path, to, caption, mime } = args.command;
    run_json_or_text(
        "file send",
        format,
        || async move {
            let transport = CliTransport::new(transport_cli_bin());
            let result = transport
                .file_send(&to, &path, caption.as_deref(), mime.as_deref())
                .await
                .map_err(|e| anyhow!("{e}"))?;
            if !result.ok {
                return Err(anyhow!(result.error_message.unwrap_or_else(|| "send failed".to_string())));
            }
            Ok(FileSendResult { chat_guid: to.clone(), path: path.display().to_string() })
        },
        |r: &FileSendResult| println!("sent {} to {}", r.path, r.chat_guid),
    )
    .await
}
