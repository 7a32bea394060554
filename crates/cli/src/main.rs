// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! msgcode - workspace-scoped conversational agent CLI

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::{file, web};
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "msgcode", version, about = "msgcode - workspace-scoped conversational agent daemon")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the long-lived worker
    Daemon,
    /// Run health probes
    Probe,
    /// Send a file to a chat
    File(file::FileArgs),
    /// Ad-hoc web access
    Web(web::WebArgs),
    /// Process/environment info
    System {
        #[command(subcommand)]
        command: SystemCommand,
    },
    /// Emit command contracts
    HelpDocs,
}

#[derive(Subcommand)]
enum SystemCommand {
    Info,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let format = cli.output;

    let exit_code = match cli.command {
        Commands::Daemon => match commands::daemon::run() {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {e}");
                1
            }
        },
        Commands::Probe => commands::probe::run(format).await,
        Commands::File(args) => file::run(args, format).await,
        Commands::Web(args) => match args.command {
            web::WebCommand::Search { query } => web::search(query, format).await,
            web::WebCommand::Fetch { url } => web::fetch(url, format).await,
        },
        Commands::System { command: SystemCommand::Info } => commands::system::run(format).await,
        Commands::HelpDocs => commands::help_docs::run(),
    };

    std::process::exit(exit_code);
}
