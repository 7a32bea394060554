// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `msgcoded`: the long-running daemon binary. Acquires the singleton lock
//! (C1), loads the route/cursor stores (C2/C3), and polls the transport for
//! inbound messages, handing each to the ingestion pipeline (C16).

use msgcode_adapters::{CliTransport, HttpProviderAdapter, LocalToolExecutor};
use msgcode_daemon::{env, inbound_poll, AcquireOutcome, Ingestor, SingletonLock};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DAEMON_NAME: &str = "msgcoded";

fn print_help() {
    println!(
        "msgcoded {VERSION}\n\n\
         Usage: msgcoded [--version|-V] [--help|-h]\n\n\
         Environment:\n\
         \x20 MSGCODE_CONFIG_DIR      config/state root (default ~/.config/msgcode)\n\
         \x20 WORKSPACE_ROOT          root for relative bind paths\n\
         \x20 MSGCODE_TRANSPORT_CLI   transport RPC binary name (default msgcode-transport)\n\
         \x20 MSGCODE_PROVIDER_URL    OpenAI-compatible base URL (default http://127.0.0.1:1234)\n\
         \x20 MSGCODE_POLL_INTERVAL_MS  inbound poll interval in ms (default 1000)\n\
         \x20 LOG_LEVEL               overrides the persisted log level"
    );
}

fn setup_logging(config_dir: &std::path::Path) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = config_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, format!("{DAEMON_NAME}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = env::log_level_override()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();

    Ok(guard)
}

fn write_startup_marker(config_dir: &std::path::Path) -> std::io::Result<()> {
    let run_dir = config_dir.join("run");
    std::fs::create_dir_all(&run_dir)?;
    std::fs::write(
        run_dir.join(format!("{DAEMON_NAME}.started")),
        format!("{{\"pid\":{},\"version\":\"{VERSION}\"}}", std::process::id()),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("--version") | Some("-V") | Some("-v") => {
            println!("msgcoded {VERSION}");
            return Ok(());
        }
        Some("--help") | Some("-h") | Some("help") => {
            print_help();
            return Ok(());
        }
        Some(other) => {
            eprintln!("msgcoded: unrecognized argument '{other}'");
            eprintln!("Try 'msgcoded --help' for usage.");
            std::process::exit(1);
        }
        None => {}
    }

    let config_dir = env::config_dir();
    std::fs::create_dir_all(&config_dir)?;

    // Written before the tracing subscriber is installed, so a CLI probe
    // can see the daemon is starting even if logging setup itself fails.
    write_startup_marker(&config_dir)?;
    let _log_guard = setup_logging(&config_dir)?;

    let lock = match SingletonLock::acquire(&config_dir, DAEMON_NAME)? {
        AcquireOutcome::Acquired(lock) => lock,
        AcquireOutcome::AlreadyRunning { pid } => {
            eprintln!("msgcoded: already running (pid {pid})");
            std::process::exit(1);
        }
    };

    tracing::info!(version = VERSION, pid = std::process::id(), "msgcoded starting");

    let workspace_root = env::workspace_root();
    std::fs::create_dir_all(&workspace_root)?;
    let routes = msgcode_storage::RouteStore::load(&env::routes_file_path(&config_dir), &workspace_root)?;
    let state = msgcode_storage::StateStore::load(&env::state_file_path(&config_dir))?;

    let provider = Arc::new(HttpProviderAdapter::new(env::provider_base_url(), Duration::from_secs(120)));
    let transport = Arc::new(CliTransport::new(inbound_poll::transport_cli_bin()));

    let ingestor = Arc::new(Ingestor::new(
        config_dir.clone(),
        None,
        routes,
        state,
        provider,
        transport,
        Arc::new(LocalToolExecutor),
    ));

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let poll_interval = env::poll_interval();
    let transport_bin = inbound_poll::transport_cli_bin();

    println!("READY");
    tracing::info!("msgcoded ready, polling for inbound messages");

    let mut in_flight = Vec::new();
    loop {
        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {
                let messages = inbound_poll::poll_once(&transport_bin).await;
                for msg in messages {
                    let ingestor = ingestor.clone();
                    in_flight.retain(|h: &tokio::task::JoinHandle<()>| !h.is_finished());
                    in_flight.push(tokio::spawn(async move {
                        ingestor.handle_inbound(msg).await;
                    }));
                }
            }
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                tracing::info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    // Stop accepting new work and drain what's in flight, bounded so a
    // wedged tool call never blocks shutdown forever.
    let drain = async {
        for handle in in_flight {
            handle.await.ok();
        }
    };
    if tokio::time::timeout(Duration::from_secs(30), drain).await.is_err() {
        tracing::warn!("in-flight messages did not drain within 30s, shutting down anyway");
    }

    lock.release();
    tracing::info!("msgcoded stopped");
    Ok(())
}
