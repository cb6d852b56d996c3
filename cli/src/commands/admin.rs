// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Administrative commands
//!
//! Commands: cleanup, compound, decay. The background-only operations,
//! exposed for operators.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use crate::daemon::DaemonClient;

#[derive(Subcommand)]
pub enum AdminCommand {
    /// Delete expired short/medium memories
    Cleanup {
        /// Count without deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Merge near-duplicate long-term memories for one user
    Compound {
        /// Owning user id
        #[arg(short, long)]
        user: String,

        /// Pairwise similarity threshold override
        #[arg(short, long)]
        threshold: Option<f64>,
    },

    /// Apply importance decay to unaccessed long-term memories
    Decay {
        /// Count without writing
        #[arg(long)]
        dry_run: bool,
    },
}

pub async fn handle_command(command: AdminCommand, host: &str, port: u16) -> Result<()> {
    let client = DaemonClient::new(host, port);

    match command {
        AdminCommand::Cleanup { dry_run } => {
            let report = client.cleanup(dry_run).await?;
            let label = if dry_run { "Would delete" } else { "Deleted" };
            println!(
                "{} {} short-term, {} medium-term expired memories",
                label.green().bold(),
                report["short_term_expired"],
                report["medium_term_expired"],
            );
        }
        AdminCommand::Compound { user, threshold } => {
            let report = client.compound(&user, threshold).await?;
            match report["status"].as_str() {
                Some("completed") => println!(
                    "{} {} cluster(s), {} memorie(s) merged",
                    "Compounded".green().bold(),
                    report["clusters_found"],
                    report["memories_merged"],
                ),
                Some(status) => println!("{} {}", "Compounding".yellow().bold(), status),
                None => println!("{:?}", report),
            }
        }
        AdminCommand::Decay { dry_run } => {
            let report = client.decay(dry_run).await?;
            match report["status"].as_str() {
                Some("completed") => println!(
                    "{} {} memorie(s), factor {:.2}/day",
                    if dry_run { "Would decay" } else { "Decayed" }
                        .green()
                        .bold(),
                    report["memories_affected"],
                    report["decay_factor"].as_f64().unwrap_or(1.0),
                ),
                Some(status) => println!("{} {}", "Decay".yellow().bold(), status),
                None => println!("{:?}", report),
            }
        }
    }
    Ok(())
}
