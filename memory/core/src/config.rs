// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Memory Substrate Configuration (ADR-120)
//!
//! One explicit [`MemoryConfig`] struct, constructed once at process start
//! and passed by `Arc` into each component constructor; no ambient global
//! lookup anywhere in the substrate.
//!
//! Discovery order mirrors the node config loader: explicit path →
//! `L9_MEMORY_CONFIG` environment variable → built-in defaults. Files are
//! YAML; every field has a default so a partial file is valid. Durations
//! are written human-readably (`"2h"`, `"7d"`).
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Configuration surface for all memory components
//! - **Related ADRs:** ADR-120: Memory Substrate Configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_ENV_VAR: &str = "L9_MEMORY_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MemoryConfig {
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    pub retention: RetentionConfig,
    pub sweeper: SweeperConfig,
    pub decay: DecayConfig,
    pub compounding: CompoundingConfig,
    pub search: SearchConfig,
}

/// Storage backend selection. In-memory for development and testing,
/// PostgreSQL (with the pgvector extension) for production.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StorageBackendKind,
    /// Connection string; required when `backend = postgres`.
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Memory,
    Postgres,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Memory,
            url: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding service (Ollama-compatible). When absent
    /// the deterministic hash client is used instead.
    pub endpoint: Option<String>,
    pub model: String,
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: "all-minilm".to_string(),
            dimension: 384,
        }
    }
}

/// Per-tier retention for the ephemeral tiers. Long-term has none.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    #[serde(with = "humantime_serde")]
    pub short: Duration,
    #[serde(with = "humantime_serde")]
    pub medium: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(2 * 60 * 60),
            medium: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    pub enabled: bool,
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub enabled: bool,
    /// Per-day attenuation; importance is multiplied by
    /// `(1 − rate)^elapsed_days` at decay time.
    pub rate_per_day: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rate_per_day: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompoundingConfig {
    pub enabled: bool,
    /// Pairwise similarity (in `1 − distance` space) at or above which two
    /// long-term memories are considered near-duplicates.
    pub threshold: f64,
    /// Clusters smaller than this are discarded without merging.
    pub min_cluster_size: usize,
}

impl Default for CompoundingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.92,
            min_cluster_size: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_top_k: usize,
    pub default_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            default_threshold: 0.7,
        }
    }
}

impl MemoryConfig {
    /// Load configuration: explicit path → `L9_MEMORY_CONFIG` → defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&env_path));
        }
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.backend == StorageBackendKind::Postgres && self.database.url.is_none() {
            anyhow::bail!("database.url is required when database.backend is 'postgres'");
        }
        if self.embedding.dimension == 0 {
            anyhow::bail!("embedding.dimension must be positive");
        }
        if !(0.0..1.0).contains(&self.decay.rate_per_day) {
            anyhow::bail!("decay.rate_per_day must be in [0, 1)");
        }
        if !(0.0..=1.0).contains(&self.compounding.threshold) {
            anyhow::bail!("compounding.threshold must be in [0, 1]");
        }
        if self.compounding.min_cluster_size < 2 {
            anyhow::bail!("compounding.min_cluster_size must be at least 2");
        }
        if self.retention.short.is_zero() || self.retention.medium.is_zero() {
            anyhow::bail!("retention durations must be non-zero");
        }
        Ok(())
    }

    /// Retention for an ephemeral tier as a chrono duration. Long-term has
    /// no retention; callers must not ask for one.
    pub fn retention_for(&self, tier: crate::domain::MemoryTier) -> Option<chrono::Duration> {
        use crate::domain::MemoryTier;
        let raw = match tier {
            MemoryTier::Short => self.retention.short,
            MemoryTier::Medium => self.retention.medium,
            MemoryTier::Long => return None,
        };
        Some(chrono::Duration::from_std(raw).unwrap_or_else(|_| chrono::Duration::days(365)))
    }
}
