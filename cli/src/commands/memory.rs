// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Memory operation commands
//!
//! Commands: save, search, stats, show. All delegate to the daemon API.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::daemon::DaemonClient;

#[derive(Args)]
pub struct SaveArgs {
    /// Memory content
    #[arg(value_name = "CONTENT")]
    pub content: String,

    /// Owning user id
    #[arg(short, long)]
    pub user: String,

    /// Memory kind (preference, fact, context, error, success)
    #[arg(short, long, default_value = "fact")]
    pub kind: String,

    /// Retention tier (short, medium, long)
    #[arg(short, long, default_value = "long")]
    pub duration: String,

    /// Visibility scope for long-term memories (user, project, global)
    #[arg(long)]
    pub scope: Option<String>,

    /// Tags (repeatable, long-term only)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Initial importance (default 1.0)
    #[arg(short, long)]
    pub importance: Option<f64>,

    /// Arbitrary JSON metadata
    #[arg(short, long, value_name = "JSON")]
    pub metadata: Option<String>,
}

pub async fn save(args: SaveArgs, host: &str, port: u16) -> Result<()> {
    let metadata: Option<serde_json::Value> = args
        .metadata
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .context("--metadata must be valid JSON")?;

    let client = DaemonClient::new(host, port);
    let saved = client
        .save(serde_json::json!({
            "user_id": args.user.clone(),
            "content": args.content,
            "kind": args.kind,
            "scope": args.scope,
            "duration": args.duration,
            "tags": args.tags,
            "importance": args.importance,
            "metadata": metadata,
        }))
        .await?;

    println!(
        "{} {} memory {} for {}",
        "Saved".green().bold(),
        saved["tier"].as_str().unwrap_or("?"),
        saved["id"],
        args.user.cyan()
    );
    if let Some(expiry) = saved["expires_at"].as_str() {
        println!("  expires {}", expiry.dimmed());
    }
    Ok(())
}

#[derive(Args)]
pub struct SearchArgs {
    /// Query text
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Owning user id
    #[arg(short, long)]
    pub user: String,

    /// Tier to search (short, medium, long, all)
    #[arg(short, long, default_value = "all")]
    pub duration: String,

    /// Restrict to kinds (repeatable)
    #[arg(short, long = "kind")]
    pub kinds: Vec<String>,

    /// Restrict long-term hits to scopes (repeatable)
    #[arg(long = "scope")]
    pub scopes: Vec<String>,

    /// Maximum results
    #[arg(short = 'n', long)]
    pub top_k: Option<usize>,

    /// Similarity floor in [0, 1]
    #[arg(short, long)]
    pub threshold: Option<f64>,
}

pub async fn search(args: SearchArgs, host: &str, port: u16) -> Result<()> {
    let kinds = (!args.kinds.is_empty()).then_some(args.kinds);
    let scopes = (!args.scopes.is_empty()).then_some(args.scopes);

    let client = DaemonClient::new(host, port);
    let response = client
        .search(serde_json::json!({
            "user_id": args.user,
            "query": args.query,
            "duration": args.duration,
            "kinds": kinds,
            "scopes": scopes,
            "top_k": args.top_k,
            "threshold": args.threshold,
        }))
        .await?;

    let total = response["total"].as_u64().unwrap_or(0);
    println!(
        "{} {} result(s)  (embed {:.1}ms, search {:.1}ms)",
        "Found".green().bold(),
        total,
        response["embedding_time_ms"].as_f64().unwrap_or(0.0),
        response["search_time_ms"].as_f64().unwrap_or(0.0),
    );

    for hit in response["results"].as_array().into_iter().flatten() {
        println!(
            "  {:.3}  [{}] #{} {}",
            hit["similarity"].as_f64().unwrap_or(0.0),
            hit["tier"].as_str().unwrap_or("?").cyan(),
            hit["id"],
            hit["content"].as_str().unwrap_or(""),
        );
    }
    Ok(())
}

#[derive(Args)]
pub struct StatsArgs {
    /// Restrict to one user (global when omitted)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Tier selector (short, medium, long, all)
    #[arg(short, long, default_value = "all")]
    pub duration: String,
}

pub async fn stats(args: StatsArgs, host: &str, port: u16) -> Result<()> {
    let client = DaemonClient::new(host, port);
    let stats = client
        .stats(args.user.as_deref(), Some(&args.duration))
        .await?;

    for tier in stats["tiers"].as_array().into_iter().flatten() {
        println!(
            "  {:<8} {:>6} memories, avg importance {:.3}",
            tier["tier"].as_str().unwrap_or("?").cyan(),
            tier["count"],
            tier["avg_importance"].as_f64().unwrap_or(0.0),
        );
    }
    println!(
        "  {:<8} {:>6} memories, avg importance {:.3}",
        "total".bold(),
        stats["total_count"],
        stats["avg_importance"].as_f64().unwrap_or(0.0),
    );
    if let Some(users) = stats["unique_users"].as_u64() {
        println!("  {} unique long-term user(s)", users);
    }
    Ok(())
}

#[derive(Args)]
pub struct ShowArgs {
    /// Memory tier (short, medium, long)
    #[arg(value_name = "TIER")]
    pub tier: String,

    /// Memory id
    #[arg(value_name = "ID")]
    pub id: i64,
}

pub async fn show(args: ShowArgs, host: &str, port: u16) -> Result<()> {
    let client = DaemonClient::new(host, port);
    let record = client.show(&args.tier, args.id).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
