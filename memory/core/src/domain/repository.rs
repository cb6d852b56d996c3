// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces (AGENTS.md §Repository Patterns)
//!
//! Persistence contracts for the memory substrate, following the DDD
//! Repository pattern: interface defined in the domain layer, implemented
//! in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `MemoryStore` | `MemoryRecord` | `InMemoryMemoryStore`, `PostgresMemoryStore` |
//! | `AuditLog` | `AuditEntry` | `InMemoryAuditLog`, `PostgresAuditLog` |
//! | `EmbeddingGateway` | — | `HashEmbeddingClient`, `OllamaEmbeddingClient` |
//!
//! Concrete implementations are selected at daemon startup from
//! `MemoryConfig`. In-memory implementations are used for development and
//! testing; PostgreSQL + pgvector for production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::audit::AuditEntry;
use crate::domain::memory::{
    ClusterMerge, MemoryKind, MemoryRecord, MemoryScope, MemoryTier, NewMemory, ScoredMemory,
    TierStats,
};

/// Similarity query against one tier table. The store applies every
/// predicate server-side: owner, non-expired (ephemeral tiers), scope
/// visibility (long-term), kind, and `similarity >= min_similarity` in the
/// `1 − distance` space.
#[derive(Debug, Clone)]
pub struct SearchFilter {
    pub user_id: String,
    pub embedding: Vec<f32>,
    /// Long-term only; ignored by ephemeral tiers.
    pub scopes: Option<Vec<MemoryScope>>,
    pub kinds: Option<Vec<MemoryKind>>,
    pub min_similarity: f64,
    pub limit: i64,
    /// Expiry cut for ephemeral tiers; rows with `expires_at <= now` never match.
    pub now: DateTime<Utc>,
}

/// Repository interface for the three tier tables.
///
/// One trait rather than one per table: the tables are structurally
/// parallel and every caller addresses them through [`MemoryTier`].
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Persist a new memory and return the stored row with its
    /// server-assigned id.
    async fn insert(&self, memory: NewMemory) -> Result<MemoryRecord, RepositoryError>;

    /// Fetch a single row by tier and id.
    async fn find_by_id(
        &self,
        tier: MemoryTier,
        id: i64,
    ) -> Result<Option<MemoryRecord>, RepositoryError>;

    /// Similarity search within one tier, ordered by similarity descending
    /// and capped at `filter.limit`.
    async fn search_similar(
        &self,
        tier: MemoryTier,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredMemory>, RepositoryError>;

    /// Bump `access_count` and refresh `last_accessed_at` on long-term rows.
    async fn mark_accessed(
        &self,
        ids: &[i64],
        accessed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// All long-term rows for one user, newest first, embeddings included
    /// (the compounding engine consumes this).
    async fn list_long_term(&self, user_id: &str) -> Result<Vec<MemoryRecord>, RepositoryError>;

    /// Apply a cluster merge: update the primary in place, hard-delete the
    /// absorbed rows. Not transactional (accepted eventual consistency).
    async fn apply_merge(&self, merge: &ClusterMerge) -> Result<(), RepositoryError>;

    /// Count (dry-run) or delete rows in an ephemeral tier whose expiry has
    /// passed. Returns the affected-row count either way.
    async fn delete_expired(
        &self,
        tier: MemoryTier,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<u64, RepositoryError>;

    /// Continuous exponential decay of long-term importance, computed
    /// server-side per row: `importance × (1 − rate)^(elapsed_days)` where
    /// `elapsed_days = (now − last_accessed_at) / 86400` seconds. Candidates
    /// are rows with `last_accessed_at < cutoff`. Dry-run counts only.
    async fn decay_unaccessed(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
        rate_per_day: f64,
        dry_run: bool,
    ) -> Result<u64, RepositoryError>;

    /// Count and mean importance for one tier, optionally restricted to a
    /// single owner.
    async fn tier_stats(
        &self,
        tier: MemoryTier,
        user_id: Option<&str>,
    ) -> Result<TierStats, RepositoryError>;

    /// Distinct owners over the long-term tier only.
    async fn count_unique_users(&self) -> Result<u64, RepositoryError>;
}

/// Append-only audit log. `append` must never mutate existing rows.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<(), RepositoryError>;

    /// Most recent entries, newest first (traceability queries and tests).
    async fn find_recent(&self, limit: usize) -> Result<Vec<AuditEntry>, RepositoryError>;
}

/// Text → fixed-length vector. The provider itself is an external
/// collaborator; this contract is all the substrate sees.
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Fixed output dimension every returned vector must match.
    fn dimension(&self) -> usize;
}

#[derive(Debug, thiserror::Error)]
#[error("Embedding request failed: {0}")]
pub struct EmbeddingError(pub String);

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
