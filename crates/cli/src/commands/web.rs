// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `msgcode web search|fetch` — ad-hoc web access exposed as CLI verbs
//! (spec §6). These are thin `reqwest` calls, not the `web_search`/`fetch`
//! tool-bus entries (C8); the CLI surface is a standalone convenience.

use crate::output::{run_json_or_text, OutputFormat};
use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::time::Duration;

const WEB_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Args)]
pub struct WebArgs {
    #[command(subcommand)]
    pub command: WebCommand,
}

#[derive(Subcommand)]
pub enum WebCommand {
    /// Search the web via the configured search endpoint
    Search {
        #[arg(long = "q")]
        query: String,
    },
    /// Fetch a URL
    Fetch {
        #[arg(long)]
        url: String,
    },
}

#[derive(Serialize)]
struct SearchResult {
    query: String,
    status: u16,
    body: String,
}

#[derive(Serialize)]
struct FetchResult {
    url: String,
    status: u16,
    body: String,
}

/// `MSGCODE_SEARCH_URL` is a search endpoint accepting `?q=<query>` and
/// returning text/JSON results; there is no bundled default provider.
fn search_base_url() -> Result<String> {
    std::env::var("MSGCODE_SEARCH_URL")
        .map_err(|_| anyhow!("MSGCODE_SEARCH_URL is not set; no default web search provider is bundled"))
}

const MAX_BODY_CHARS: usize = 4000;

fn truncate_body(body: String) -> String {
    if body.chars().count() <= MAX_BODY_CHARS {
        body
    } else {
        body.chars().take(MAX_BODY_CHARS).collect::<String>() + "… (truncated)"
    }
}

pub async fn search(query: String, format: OutputFormat) -> i32 {
    run_json_or_text(
        "web search",
        format,
        || async move {
            let base = search_base_url()?;
            let client = reqwest::Client::builder().timeout(WEB_TIMEOUT).build()?;
            let resp = client.get(&base).query(&[("q", &query)]).send().await?;
            let status = resp.status().as_u16();
            let body = truncate_body(resp.text().await.unwrap_or_default());
            Ok(SearchResult { query, status, body })
        },
        |r: &SearchResult| {
            println!("{} ({})", r.query, r.status);
            println!("{}", r.body);
        },
    )
    .await
}

pub async fn fetch(url: String, format: OutputFormat) -> i32 {
    run_json_or_text(
        "web fetch",
        format,
        || async move {
            let client = reqwest::Client::builder().timeout(WEB_TIMEOUT).build()?;
            let resp = client.get(&url).send().await?;
            let status = resp.status().as_u16();
            let body = truncate_body(resp.text().await.unwrap_or_default());
            Ok(FetchResult { url, status, body })
        },
        |r: &FetchResult| {
            println!("{} ({})", r.url, r.status);
            println!("{}", r.body);
        },
    )
    .await
}
