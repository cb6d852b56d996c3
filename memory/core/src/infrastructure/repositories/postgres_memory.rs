// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Memory Store — ADR-121
//!
//! Production `MemoryStore` implementation backed by the three tier tables
//! (`short_term_memories`, `medium_term_memories`, `long_term_memories`)
//! via `sqlx` and the pgvector extension. Similarity is computed with the
//! cosine distance operator `<=>`, inverted to `1 − distance` so the
//! threshold and ordering live in the same space callers reason in.
//!
//! Multi-statement operations (cluster merges) are deliberately not
//! wrapped in a transaction; concurrent compound/search interleaving is
//! accepted eventual consistency.
//!
//! See ADR-121 (Memory Schema Design).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::memory::{
    ClusterMerge, MemoryKind, MemoryRecord, MemoryScope, MemoryTier, NewMemory, ScoredMemory,
    TierStats,
};
use crate::domain::repository::{MemoryStore, RepositoryError, SearchFilter};
use crate::infrastructure::query::SqlPredicates;

pub struct PostgresMemoryStore {
    pool: PgPool,
}

impl PostgresMemoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn long_row_to_record(row: &sqlx::postgres::PgRow) -> Result<MemoryRecord, RepositoryError> {
        let kind: String = row.get("kind");
        let scope: String = row.get("scope");
        let embedding: Vector = row.get("embedding");

        Ok(MemoryRecord {
            id: row.get("id"),
            tier: MemoryTier::Long,
            user_id: row.get("user_id"),
            content: row.get("content"),
            kind: parse_kind(&kind)?,
            scope: Some(parse_scope(&scope)?),
            importance: row.get("importance"),
            embedding: embedding.to_vec(),
            tags: row.get("tags"),
            metadata: row.get("metadata"),
            created_at: row.get("created_at"),
            updated_at: Some(row.get("updated_at")),
            expires_at: None,
            last_accessed_at: Some(row.get("last_accessed_at")),
            access_count: row.get("access_count"),
        })
    }

    fn ephemeral_row_to_record(
        tier: MemoryTier,
        row: &sqlx::postgres::PgRow,
    ) -> Result<MemoryRecord, RepositoryError> {
        let kind: String = row.get("kind");
        let embedding: Vector = row.get("embedding");

        Ok(MemoryRecord {
            id: row.get("id"),
            tier,
            user_id: row.get("user_id"),
            content: row.get("content"),
            kind: parse_kind(&kind)?,
            scope: None,
            importance: row.get("importance"),
            embedding: embedding.to_vec(),
            tags: Vec::new(),
            metadata: row.get("metadata"),
            created_at: row.get("created_at"),
            updated_at: None,
            expires_at: Some(row.get("expires_at")),
            last_accessed_at: None,
            access_count: 0,
        })
    }
}

fn parse_kind(raw: &str) -> Result<MemoryKind, RepositoryError> {
    raw.parse::<MemoryKind>()
        .map_err(|_| RepositoryError::Serialization(format!("Unknown kind in row: {}", raw)))
}

fn parse_scope(raw: &str) -> Result<MemoryScope, RepositoryError> {
    raw.parse::<MemoryScope>()
        .map_err(|_| RepositoryError::Serialization(format!("Unknown scope in row: {}", raw)))
}

#[async_trait]
impl MemoryStore for PostgresMemoryStore {
    async fn insert(&self, memory: NewMemory) -> Result<MemoryRecord, RepositoryError> {
        let embedding = Vector::from(memory.embedding.clone());

        if memory.tier.is_ephemeral() {
            let expires_at = memory.expires_at.ok_or_else(|| {
                RepositoryError::Database(format!(
                    "{} rows must carry an expiry timestamp",
                    memory.tier.table_name()
                ))
            })?;

            let sql = format!(
                r#"
                INSERT INTO {} (user_id, kind, content, embedding, importance, metadata, created_at, expires_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id
                "#,
                memory.tier.table_name()
            );

            let row = sqlx::query(&sql)
                .bind(&memory.user_id)
                .bind(memory.kind.as_str())
                .bind(&memory.content)
                .bind(embedding)
                .bind(memory.importance)
                .bind(&memory.metadata)
                .bind(memory.created_at)
                .bind(expires_at)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    RepositoryError::Database(format!("Failed to insert memory: {}", e))
                })?;

            Ok(MemoryRecord {
                id: row.get("id"),
                tier: memory.tier,
                user_id: memory.user_id,
                content: memory.content,
                kind: memory.kind,
                scope: None,
                importance: memory.importance,
                embedding: memory.embedding,
                tags: Vec::new(),
                metadata: memory.metadata,
                created_at: memory.created_at,
                updated_at: None,
                expires_at: Some(expires_at),
                last_accessed_at: None,
                access_count: 0,
            })
        } else {
            if memory.expires_at.is_some() {
                return Err(RepositoryError::Database(
                    "long_term_memories rows must not carry an expiry timestamp".to_string(),
                ));
            }
            let scope = memory.scope.unwrap_or(MemoryScope::User);

            let row = sqlx::query(
                r#"
                INSERT INTO long_term_memories
                    (user_id, scope, kind, content, embedding, importance, tags, metadata,
                     created_at, updated_at, last_accessed_at, access_count)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9, $9, 0)
                RETURNING id
                "#,
            )
            .bind(&memory.user_id)
            .bind(scope.as_str())
            .bind(memory.kind.as_str())
            .bind(&memory.content)
            .bind(embedding)
            .bind(memory.importance)
            .bind(&memory.tags)
            .bind(&memory.metadata)
            .bind(memory.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to insert memory: {}", e)))?;

            Ok(MemoryRecord {
                id: row.get("id"),
                tier: MemoryTier::Long,
                user_id: memory.user_id,
                content: memory.content,
                kind: memory.kind,
                scope: Some(scope),
                importance: memory.importance,
                embedding: memory.embedding,
                tags: memory.tags,
                metadata: memory.metadata,
                created_at: memory.created_at,
                updated_at: Some(memory.created_at),
                expires_at: None,
                last_accessed_at: Some(memory.created_at),
                access_count: 0,
            })
        }
    }

    async fn find_by_id(
        &self,
        tier: MemoryTier,
        id: i64,
    ) -> Result<Option<MemoryRecord>, RepositoryError> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", tier.table_name());
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        match row {
            Some(row) if tier.is_ephemeral() => {
                Ok(Some(Self::ephemeral_row_to_record(tier, &row)?))
            }
            Some(row) => Ok(Some(Self::long_row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn search_similar(
        &self,
        tier: MemoryTier,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredMemory>, RepositoryError> {
        // $1 is the query embedding, shared by the SELECT list and the
        // similarity floor predicate.
        let mut predicates = SqlPredicates::starting_at(2);
        predicates.push("user_id = $?");
        if tier.is_ephemeral() {
            predicates.push("expires_at > $?");
        }
        let kinds: Option<Vec<String>> = filter
            .kinds
            .as_ref()
            .map(|kinds| kinds.iter().map(|k| k.as_str().to_string()).collect());
        if kinds.is_some() {
            predicates.push("kind = ANY($?)");
        }
        let scopes: Option<Vec<String>> = match tier {
            MemoryTier::Long => filter
                .scopes
                .as_ref()
                .map(|scopes| scopes.iter().map(|s| s.as_str().to_string()).collect()),
            _ => None,
        };
        if scopes.is_some() {
            predicates.push("scope = ANY($?)");
        }
        predicates.push("1 - (embedding <=> $1) >= $?");
        let limit_index = predicates.reserve();

        let sql = format!(
            "SELECT *, 1 - (embedding <=> $1) AS similarity FROM {}{} ORDER BY similarity DESC LIMIT ${}",
            tier.table_name(),
            predicates.where_clause(),
            limit_index,
        );

        let mut query = sqlx::query(&sql)
            .bind(Vector::from(filter.embedding.clone()))
            .bind(&filter.user_id);
        if tier.is_ephemeral() {
            query = query.bind(filter.now);
        }
        if let Some(kinds) = &kinds {
            query = query.bind(kinds);
        }
        if let Some(scopes) = &scopes {
            query = query.bind(scopes);
        }
        query = query.bind(filter.min_similarity).bind(filter.limit);

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            let record = if tier.is_ephemeral() {
                Self::ephemeral_row_to_record(tier, row)?
            } else {
                Self::long_row_to_record(row)?
            };
            results.push(ScoredMemory {
                record,
                similarity: row.get("similarity"),
            });
        }
        Ok(results)
    }

    async fn mark_accessed(
        &self,
        ids: &[i64],
        accessed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        if ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            r#"
            UPDATE long_term_memories
            SET access_count = access_count + 1, last_accessed_at = $1
            WHERE id = ANY($2)
            "#,
        )
        .bind(accessed_at)
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn list_long_term(&self, user_id: &str) -> Result<Vec<MemoryRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM long_term_memories
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        rows.iter().map(Self::long_row_to_record).collect()
    }

    async fn apply_merge(&self, merge: &ClusterMerge) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE long_term_memories
            SET importance = $1, access_count = $2, tags = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(merge.importance)
        .bind(merge.access_count)
        .bind(&merge.tags)
        .bind(merge.merged_at)
        .bind(merge.primary_id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to update primary: {}", e)))?;

        sqlx::query("DELETE FROM long_term_memories WHERE id = ANY($1)")
            .bind(&merge.absorbed_ids)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                RepositoryError::Database(format!("Failed to delete absorbed rows: {}", e))
            })?;

        Ok(())
    }

    async fn delete_expired(
        &self,
        tier: MemoryTier,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<u64, RepositoryError> {
        if !tier.is_ephemeral() {
            return Ok(0);
        }

        if dry_run {
            let sql = format!(
                "SELECT COUNT(*) AS expired FROM {} WHERE expires_at <= $1",
                tier.table_name()
            );
            let row = sqlx::query(&sql)
                .bind(now)
                .fetch_one(&self.pool)
                .await
                .map_err(RepositoryError::from)?;
            let expired: i64 = row.get("expired");
            Ok(expired as u64)
        } else {
            let sql = format!("DELETE FROM {} WHERE expires_at <= $1", tier.table_name());
            let result = sqlx::query(&sql)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(RepositoryError::from)?;
            Ok(result.rows_affected())
        }
    }

    async fn decay_unaccessed(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
        rate_per_day: f64,
        dry_run: bool,
    ) -> Result<u64, RepositoryError> {
        if dry_run {
            let row = sqlx::query(
                "SELECT COUNT(*) AS candidates FROM long_term_memories WHERE last_accessed_at < $1",
            )
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
            let candidates: i64 = row.get("candidates");
            return Ok(candidates as u64);
        }

        // Per-row exponent: each row's elapsed time differs, so the decay
        // multiplier must be computed inside the statement, not in Rust.
        let result = sqlx::query(
            r#"
            UPDATE long_term_memories
            SET importance = importance
                    * power($2, extract(epoch from ($3 - last_accessed_at))::float8 / 86400.0),
                updated_at = $3
            WHERE last_accessed_at < $1
            "#,
        )
        .bind(cutoff)
        .bind(1.0 - rate_per_day)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(result.rows_affected())
    }

    async fn tier_stats(
        &self,
        tier: MemoryTier,
        user_id: Option<&str>,
    ) -> Result<TierStats, RepositoryError> {
        let mut predicates = SqlPredicates::new();
        if user_id.is_some() {
            predicates.push("user_id = $?");
        }
        let sql = format!(
            "SELECT COUNT(*) AS count, COALESCE(AVG(importance), 0.0) AS avg_importance FROM {}{}",
            tier.table_name(),
            predicates.where_clause(),
        );

        let mut query = sqlx::query(&sql);
        if let Some(user_id) = user_id {
            query = query.bind(user_id);
        }
        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        let count: i64 = row.get("count");
        Ok(TierStats {
            tier,
            count: count as u64,
            avg_importance: row.get("avg_importance"),
        })
    }

    async fn count_unique_users(&self) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(DISTINCT user_id) AS users FROM long_term_memories")
            .fetch_one(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        let users: i64 = row.get("users");
        Ok(users as u64)
    }
}
