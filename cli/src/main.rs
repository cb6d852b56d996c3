// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # L9 Memory CLI
//!
//! The `l9mem` binary hosts the tiered memory substrate.
//!
//! ## Architecture
//!
//! This CLI follows a **CLI-first** design with daemon capabilities:
//!
//! - **Daemon mode**: `l9mem --daemon` (or `l9mem daemon start`) runs the
//!   HTTP service plus the supervised lifecycle sweeper
//! - **Client mode**: every other command delegates to a running daemon
//!   over its HTTP API
//!
//! ## Commands
//!
//! - `l9mem daemon start|status` - Manage the daemon lifecycle
//! - `l9mem save|search|stats|show` - Memory operations
//! - `l9mem admin cleanup|compound|decay` - Administrative passes

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod daemon;

use commands::{AdminCommand, DaemonCommand};

/// L9 memory substrate - tiered memories for platform agents
#[derive(Parser)]
#[command(name = "l9mem")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Run as the memory daemon (HTTP service + sweeper)
    #[arg(long, global = true)]
    daemon: bool,

    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "L9_MEMORY_CONFIG",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// HTTP API port
    #[arg(long, global = true, env = "L9_MEMORY_PORT", default_value = "8600")]
    port: u16,

    /// HTTP API host
    #[arg(long, global = true, env = "L9_MEMORY_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "L9_MEMORY_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage daemon lifecycle
    #[command(name = "daemon")]
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },

    /// Save a memory
    #[command(name = "save")]
    Save(commands::SaveArgs),

    /// Semantic search across tiers
    #[command(name = "search")]
    Search(commands::SearchArgs),

    /// Per-tier counts and averages
    #[command(name = "stats")]
    Stats(commands::StatsArgs),

    /// Show one memory by tier and id
    #[command(name = "show")]
    Show(commands::ShowArgs),

    /// Administrative passes (cleanup, compound, decay)
    #[command(name = "admin")]
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    // Handle daemon mode (foreground service)
    if cli.daemon {
        return daemon::start_daemon(cli.config, &cli.host, cli.port).await;
    }

    match cli.command {
        Some(Commands::Daemon { command }) => {
            commands::daemon::handle_command(command, cli.config, &cli.host, cli.port).await
        }
        Some(Commands::Save(args)) => commands::memory::save(args, &cli.host, cli.port).await,
        Some(Commands::Search(args)) => commands::memory::search(args, &cli.host, cli.port).await,
        Some(Commands::Stats(args)) => commands::memory::stats(args, &cli.host, cli.port).await,
        Some(Commands::Show(args)) => commands::memory::show(args, &cli.host, cli.port).await,
        Some(Commands::Admin { command }) => {
            commands::admin::handle_command(command, &cli.host, cli.port).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }
}
