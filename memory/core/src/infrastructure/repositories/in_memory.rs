// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory implementations of the memory store and audit log, used for
//! development and testing. Vector similarity is computed with the same
//! `1 − distance` cosine semantics as the pgvector operator so behavior is
//! interchangeable with the PostgreSQL backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::domain::audit::AuditEntry;
use crate::domain::memory::{
    ClusterMerge, MemoryRecord, MemoryTier, NewMemory, ScoredMemory, TierStats,
};
use crate::domain::repository::{AuditLog, MemoryStore, RepositoryError, SearchFilter};
use crate::domain::vector::cosine_similarity;

#[derive(Default)]
struct TierTable {
    rows: Vec<MemoryRecord>,
    next_id: i64,
}

impl TierTable {
    fn assign_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory implementation of [`MemoryStore`].
pub struct InMemoryMemoryStore {
    tables: RwLock<HashMap<MemoryTier, TierTable>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        let mut tables = HashMap::new();
        for tier in MemoryTier::all() {
            tables.insert(tier, TierTable::default());
        }
        Self {
            tables: RwLock::new(tables),
        }
    }
}

impl Default for InMemoryMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn insert(&self, memory: NewMemory) -> Result<MemoryRecord, RepositoryError> {
        if memory.tier.is_ephemeral() && memory.expires_at.is_none() {
            return Err(RepositoryError::Database(format!(
                "{} rows must carry an expiry timestamp",
                memory.tier.table_name()
            )));
        }
        if !memory.tier.is_ephemeral() && memory.expires_at.is_some() {
            return Err(RepositoryError::Database(
                "long_term_memories rows must not carry an expiry timestamp".to_string(),
            ));
        }

        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(&memory.tier)
            .expect("all tiers initialized at construction");

        let is_long = !memory.tier.is_ephemeral();
        let record = MemoryRecord {
            id: table.assign_id(),
            tier: memory.tier,
            user_id: memory.user_id,
            content: memory.content,
            kind: memory.kind,
            scope: if is_long { memory.scope } else { None },
            importance: memory.importance,
            embedding: memory.embedding,
            tags: if is_long { memory.tags } else { Vec::new() },
            metadata: memory.metadata,
            created_at: memory.created_at,
            updated_at: is_long.then_some(memory.created_at),
            expires_at: memory.expires_at,
            last_accessed_at: is_long.then_some(memory.created_at),
            access_count: 0,
        };

        table.rows.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(
        &self,
        tier: MemoryTier,
        id: i64,
    ) -> Result<Option<MemoryRecord>, RepositoryError> {
        let tables = self.tables.read().await;
        let table = tables.get(&tier).expect("tier table");
        Ok(table.rows.iter().find(|r| r.id == id).cloned())
    }

    async fn search_similar(
        &self,
        tier: MemoryTier,
        filter: &SearchFilter,
    ) -> Result<Vec<ScoredMemory>, RepositoryError> {
        let tables = self.tables.read().await;
        let table = tables.get(&tier).expect("tier table");

        let mut results: Vec<ScoredMemory> = table
            .rows
            .iter()
            .filter(|row| row.user_id == filter.user_id)
            .filter(|row| !(tier.is_ephemeral() && row.is_expired(filter.now)))
            .filter(|row| match (&filter.scopes, tier) {
                (Some(scopes), MemoryTier::Long) => {
                    row.scope.map_or(false, |scope| scopes.contains(&scope))
                }
                _ => true,
            })
            .filter(|row| {
                filter
                    .kinds
                    .as_ref()
                    .map_or(true, |kinds| kinds.contains(&row.kind))
            })
            .filter_map(|row| {
                let similarity = cosine_similarity(&filter.embedding, &row.embedding);
                (similarity >= filter.min_similarity).then(|| ScoredMemory {
                    record: row.clone(),
                    similarity,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(filter.limit.max(0) as usize);

        Ok(results)
    }

    async fn mark_accessed(
        &self,
        ids: &[i64],
        accessed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(&MemoryTier::Long).expect("tier table");
        for row in table.rows.iter_mut() {
            if ids.contains(&row.id) {
                row.access_count += 1;
                row.last_accessed_at = Some(accessed_at);
            }
        }
        Ok(())
    }

    async fn list_long_term(&self, user_id: &str) -> Result<Vec<MemoryRecord>, RepositoryError> {
        let tables = self.tables.read().await;
        let table = tables.get(&MemoryTier::Long).expect("tier table");

        let mut rows: Vec<MemoryRecord> = table
            .rows
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        // newest first; id breaks created_at ties deterministically
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn apply_merge(&self, merge: &ClusterMerge) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(&MemoryTier::Long).expect("tier table");

        let primary = table
            .rows
            .iter_mut()
            .find(|r| r.id == merge.primary_id)
            .ok_or_else(|| {
                RepositoryError::NotFound(format!("long-term memory {}", merge.primary_id))
            })?;

        primary.importance = merge.importance;
        primary.access_count = merge.access_count;
        primary.tags = merge.tags.clone();
        primary.updated_at = Some(merge.merged_at);

        table.rows.retain(|r| !merge.absorbed_ids.contains(&r.id));
        Ok(())
    }

    async fn delete_expired(
        &self,
        tier: MemoryTier,
        now: DateTime<Utc>,
        dry_run: bool,
    ) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(&tier).expect("tier table");

        let expired = table.rows.iter().filter(|r| r.is_expired(now)).count() as u64;
        if !dry_run {
            table.rows.retain(|r| !r.is_expired(now));
        }
        Ok(expired)
    }

    async fn decay_unaccessed(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
        rate_per_day: f64,
        dry_run: bool,
    ) -> Result<u64, RepositoryError> {
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(&MemoryTier::Long).expect("tier table");

        let mut affected = 0;
        for row in table.rows.iter_mut() {
            let last_accessed = match row.last_accessed_at {
                Some(at) if at < cutoff => at,
                _ => continue,
            };
            affected += 1;
            if dry_run {
                continue;
            }
            let elapsed_days = (now - last_accessed).num_seconds() as f64 / 86_400.0;
            row.importance *= (1.0 - rate_per_day).powf(elapsed_days);
            row.updated_at = Some(now);
        }
        Ok(affected)
    }

    async fn tier_stats(
        &self,
        tier: MemoryTier,
        user_id: Option<&str>,
    ) -> Result<TierStats, RepositoryError> {
        let tables = self.tables.read().await;
        let table = tables.get(&tier).expect("tier table");

        let rows: Vec<&MemoryRecord> = table
            .rows
            .iter()
            .filter(|r| user_id.map_or(true, |u| r.user_id == u))
            .collect();

        let count = rows.len() as u64;
        let avg_importance = if rows.is_empty() {
            0.0
        } else {
            rows.iter().map(|r| r.importance).sum::<f64>() / rows.len() as f64
        };

        Ok(TierStats {
            tier,
            count,
            avg_importance,
        })
    }

    async fn count_unique_users(&self) -> Result<u64, RepositoryError> {
        let tables = self.tables.read().await;
        let table = tables.get(&MemoryTier::Long).expect("tier table");
        let users: HashSet<&str> = table.rows.iter().map(|r| r.user_id.as_str()).collect();
        Ok(users.len() as u64)
    }
}

/// In-memory append-only audit log.
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, entry: AuditEntry) -> Result<(), RepositoryError> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<AuditEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::memory::{MemoryKind, MemoryScope};

    fn new_memory(tier: MemoryTier, user: &str, embedding: Vec<f32>) -> NewMemory {
        let now = Utc::now();
        NewMemory {
            tier,
            user_id: user.to_string(),
            content: "remember this".to_string(),
            kind: MemoryKind::Fact,
            scope: (!tier.is_ephemeral()).then_some(MemoryScope::User),
            importance: 1.0,
            embedding,
            tags: Vec::new(),
            metadata: serde_json::json!({}),
            created_at: now,
            expires_at: tier
                .is_ephemeral()
                .then(|| now + chrono::Duration::hours(2)),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = InMemoryMemoryStore::new();
        let first = store
            .insert(new_memory(MemoryTier::Long, "u1", vec![1.0, 0.0]))
            .await
            .unwrap();
        let second = store
            .insert(new_memory(MemoryTier::Long, "u1", vec![0.0, 1.0]))
            .await
            .unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        // ids are per tier table
        let other_tier = store
            .insert(new_memory(MemoryTier::Short, "u1", vec![1.0, 0.0]))
            .await
            .unwrap();
        assert_eq!(other_tier.id, 1);
    }

    #[tokio::test]
    async fn test_ephemeral_insert_requires_expiry() {
        let store = InMemoryMemoryStore::new();
        let mut memory = new_memory(MemoryTier::Short, "u1", vec![1.0]);
        memory.expires_at = None;
        assert!(store.insert(memory).await.is_err());
    }

    #[tokio::test]
    async fn test_long_term_insert_rejects_expiry() {
        let store = InMemoryMemoryStore::new();
        let mut memory = new_memory(MemoryTier::Long, "u1", vec![1.0]);
        memory.expires_at = Some(Utc::now());
        assert!(store.insert(memory).await.is_err());
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let store = InMemoryMemoryStore::new();
        store
            .insert(new_memory(MemoryTier::Long, "u1", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();
        store
            .insert(new_memory(MemoryTier::Long, "u1", vec![0.0, 1.0, 0.0]))
            .await
            .unwrap();

        let filter = SearchFilter {
            user_id: "u1".to_string(),
            embedding: vec![0.9, 0.1, 0.0],
            scopes: None,
            kinds: None,
            min_similarity: 0.0,
            limit: 10,
            now: Utc::now(),
        };
        let results = store
            .search_similar(MemoryTier::Long, &filter)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].similarity > results[1].similarity);
        assert_eq!(results[0].record.id, 1);
    }

    #[tokio::test]
    async fn test_search_excludes_other_users() {
        let store = InMemoryMemoryStore::new();
        store
            .insert(new_memory(MemoryTier::Long, "someone-else", vec![1.0, 0.0]))
            .await
            .unwrap();

        let filter = SearchFilter {
            user_id: "u1".to_string(),
            embedding: vec![1.0, 0.0],
            scopes: None,
            kinds: None,
            min_similarity: 0.0,
            limit: 10,
            now: Utc::now(),
        };
        let results = store
            .search_similar(MemoryTier::Long, &filter)
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_delete_expired_dry_run_is_idempotent() {
        let store = InMemoryMemoryStore::new();
        let mut memory = new_memory(MemoryTier::Short, "u1", vec![1.0]);
        memory.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
        store.insert(memory).await.unwrap();

        let now = Utc::now();
        let first = store
            .delete_expired(MemoryTier::Short, now, true)
            .await
            .unwrap();
        let second = store
            .delete_expired(MemoryTier::Short, now, true)
            .await
            .unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 1);

        let deleted = store
            .delete_expired(MemoryTier::Short, now, false)
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(store
            .find_by_id(MemoryTier::Short, 1)
            .await
            .unwrap()
            .is_none());
    }
}
