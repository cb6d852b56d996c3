// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Daemon lifecycle commands
//!
//! Commands: start, status

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use crate::daemon::{start_daemon, DaemonClient};

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Run the daemon in the foreground
    Start,

    /// Check whether a daemon is reachable
    Status,
}

pub async fn handle_command(
    command: DaemonCommand,
    config_path: Option<PathBuf>,
    host: &str,
    port: u16,
) -> Result<()> {
    match command {
        DaemonCommand::Start => start_daemon(config_path, host, port).await,
        DaemonCommand::Status => {
            let client = DaemonClient::new(host, port);
            match client.health().await {
                Ok(health) => {
                    println!(
                        "{} daemon at {}:{} (uptime {}s)",
                        "Running:".green().bold(),
                        host,
                        port,
                        health["uptime_seconds"]
                    );
                    Ok(())
                }
                Err(_) => {
                    println!("{} no daemon at {}:{}", "Stopped:".red().bold(), host, port);
                    std::process::exit(1);
                }
            }
        }
    }
}
