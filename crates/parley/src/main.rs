//! Parley - A2A task server and client
//!
//! Main entry point for the Parley CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod echo;

use commands::{cancel, card, get, send, serve};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Parley - A2A task server and client
#[derive(Parser)]
#[command(name = "parley")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Server URL (default: http://127.0.0.1:41241)
    #[arg(long, global = true, env = "PARLEY_SERVER_URL")]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a task server with the built-in echo agent
    Serve(serve::ServeArgs),

    /// Send a message to a task
    Send(send::SendArgs),

    /// Show a task
    Get(get::GetArgs),

    /// Cancel a task
    Cancel(cancel::CancelArgs),

    /// Show the server's agent card
    Card(card::CardArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "parley=debug,parley_server=debug,parley_store=debug,parley_client=debug,parley_config=debug,info"
    } else {
        "parley=info,parley_server=info,parley_store=info,parley_client=info,warn"
    };

    let log_dir = parley_config::xdg_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "parley.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "parley=trace,parley_server=trace,parley_store=trace,parley_client=trace,parley_config=trace,info",
                )),
        )
        .init();

    let server_url = cli
        .server
        .unwrap_or_else(|| commands::DEFAULT_SERVER_URL.to_string());

    let ctx = commands::Context {
        server_url,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Serve(args) => serve::run(args, &ctx).await,
        Commands::Send(args) => send::run(args, &ctx).await,
        Commands::Get(args) => get::run(args, &ctx).await,
        Commands::Cancel(args) => cancel::run(args, &ctx).await,
        Commands::Card(args) => card::run(args, &ctx).await,
    }
}
