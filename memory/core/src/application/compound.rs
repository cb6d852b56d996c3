// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # CompoundingEngine — Near-Duplicate Consolidation (ADR-118)
//!
//! Detects and merges near-duplicate long-term memories to bound storage
//! growth and consolidate the importance signal.
//!
//! ## Merge arithmetic
//!
//! New importance is `min(1.0, Σ importance)`, intentionally saturating
//! rather than averaging, so repeated reinforcement of the same fact
//! increases confidence. Access counts sum, tags union, and the newest
//! cluster member survives as the primary; all other members are
//! hard-deleted.
//!
//! ## Complexity
//!
//! A single pass makes O(n²) pairwise comparisons over the user's
//! long-term memories. Embeddings are fetched once and compared in
//! process, so the quadratic cost is CPU-only rather than n² store round
//! trips; it remains the known scaling limit for large per-user counts.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Cluster detection and merging over long-term memories
//! - **Related ADRs:** ADR-118: Tiered Memory Substrate

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use crate::application::{append_audit_best_effort, EngineStatus};
use crate::config::MemoryConfig;
use crate::domain::audit::{AuditEntry, AuditOperation};
use crate::domain::error::MemoryError;
use crate::domain::memory::{ClusterMerge, MemoryRecord};
use crate::domain::repository::{AuditLog, MemoryStore};
use crate::domain::vector::cosine_similarity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompoundReport {
    pub status: EngineStatus,
    pub clusters_found: usize,
    pub memories_merged: usize,
}

impl CompoundReport {
    fn empty(status: EngineStatus) -> Self {
        Self {
            status,
            clusters_found: 0,
            memories_merged: 0,
        }
    }
}

pub struct CompoundingEngine {
    store: Arc<dyn MemoryStore>,
    audit: Arc<dyn AuditLog>,
    config: Arc<MemoryConfig>,
}

impl CompoundingEngine {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        audit: Arc<dyn AuditLog>,
        config: Arc<MemoryConfig>,
    ) -> Self {
        Self {
            store,
            audit,
            config,
        }
    }

    /// Cluster and merge one user's long-term memories. `threshold`
    /// overrides the configured pairwise similarity floor when given.
    pub async fn compound(
        &self,
        user_id: &str,
        threshold: Option<f64>,
    ) -> Result<CompoundReport, MemoryError> {
        if !self.config.compounding.enabled {
            return Ok(CompoundReport::empty(EngineStatus::Disabled));
        }

        let memories = self.store.list_long_term(user_id).await?;
        if memories.len() < 2 {
            return Ok(CompoundReport::empty(EngineStatus::Skipped));
        }

        let threshold = threshold.unwrap_or(self.config.compounding.threshold);
        let clusters = cluster_near_duplicates(
            &memories,
            threshold,
            self.config.compounding.min_cluster_size,
        );

        let now = Utc::now();
        let mut memories_merged = 0;
        for cluster in &clusters {
            let members: Vec<&MemoryRecord> = cluster.iter().map(|&i| &memories[i]).collect();
            let primary = members[0];

            let merge = ClusterMerge {
                primary_id: primary.id,
                importance: (members.iter().map(|m| m.importance).sum::<f64>()).min(1.0),
                access_count: members.iter().map(|m| m.access_count).sum(),
                tags: union_tags(members.iter().map(|m| m.tags.as_slice())),
                absorbed_ids: members[1..].iter().map(|m| m.id).collect(),
                merged_at: now,
            };
            memories_merged += merge.absorbed_ids.len();
            self.store.apply_merge(&merge).await?;
        }

        append_audit_best_effort(
            self.audit.as_ref(),
            AuditEntry::success(AuditOperation::Compound)
                .with_user(user_id)
                .with_details(serde_json::json!({
                    "clusters_found": clusters.len(),
                    "memories_merged": memories_merged,
                    "threshold": threshold,
                })),
        )
        .await;

        info!(
            user_id,
            clusters = clusters.len(),
            merged = memories_merged,
            "Compounding completed"
        );

        Ok(CompoundReport {
            status: EngineStatus::Completed,
            clusters_found: clusters.len(),
            memories_merged,
        })
    }
}

/// Greedy single-pass clustering over memories in fetch order (newest
/// first): each unprocessed memory seeds a cluster and absorbs every later
/// memory whose similarity reaches the threshold. Clusters below
/// `min_cluster_size` are discarded.
fn cluster_near_duplicates(
    memories: &[MemoryRecord],
    threshold: f64,
    min_cluster_size: usize,
) -> Vec<Vec<usize>> {
    let mut processed = vec![false; memories.len()];
    let mut clusters = Vec::new();

    for i in 0..memories.len() {
        if processed[i] {
            continue;
        }
        processed[i] = true;

        let mut cluster = vec![i];
        for j in (i + 1)..memories.len() {
            if processed[j] {
                continue;
            }
            let similarity =
                cosine_similarity(&memories[i].embedding, &memories[j].embedding);
            if similarity >= threshold {
                cluster.push(j);
                processed[j] = true;
            }
        }

        if cluster.len() >= min_cluster_size {
            clusters.push(cluster);
        }
    }

    clusters
}

fn union_tags<'a, I>(tag_lists: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut set = BTreeSet::new();
    for tags in tag_lists {
        for tag in tags {
            set.insert(tag.clone());
        }
    }
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::memory::{MemoryKind, MemoryScope, MemoryTier, NewMemory};
    use crate::infrastructure::repositories::{InMemoryAuditLog, InMemoryMemoryStore};

    fn engine(
        config: MemoryConfig,
    ) -> (
        CompoundingEngine,
        Arc<InMemoryMemoryStore>,
        Arc<InMemoryAuditLog>,
    ) {
        let store = Arc::new(InMemoryMemoryStore::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let engine = CompoundingEngine::new(store.clone(), audit.clone(), Arc::new(config));
        (engine, store, audit)
    }

    async fn plant_long(
        store: &InMemoryMemoryStore,
        embedding: Vec<f32>,
        importance: f64,
        tags: Vec<&str>,
        age_minutes: i64,
    ) -> i64 {
        let created_at = Utc::now() - chrono::Duration::minutes(age_minutes);
        store
            .insert(NewMemory {
                tier: MemoryTier::Long,
                user_id: "u1".to_string(),
                content: "near duplicate".to_string(),
                kind: MemoryKind::Fact,
                scope: Some(MemoryScope::User),
                importance,
                embedding,
                tags: tags.into_iter().map(String::from).collect(),
                metadata: serde_json::json!({}),
                created_at,
                expires_at: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_disabled_is_a_no_op() {
        let mut config = MemoryConfig::default();
        config.compounding.enabled = false;
        let (engine, store, _) = engine(config);
        plant_long(&store, vec![1.0, 0.0], 1.0, vec![], 0).await;
        plant_long(&store, vec![1.0, 0.0], 1.0, vec![], 1).await;

        let report = engine.compound("u1", None).await.unwrap();
        assert_eq!(report.status, EngineStatus::Disabled);
        assert_eq!(report.memories_merged, 0);
        assert_eq!(store.list_long_term("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fewer_than_two_memories_is_skipped() {
        let (engine, store, _) = engine(MemoryConfig::default());
        plant_long(&store, vec![1.0, 0.0], 1.0, vec![], 0).await;

        let report = engine.compound("u1", None).await.unwrap();
        assert_eq!(report.status, EngineStatus::Skipped);
    }

    #[tokio::test]
    async fn test_three_member_cluster_merges_into_newest() {
        let (engine, store, audit) = engine(MemoryConfig::default());
        // newest first member becomes the primary
        let primary_id = plant_long(
            &store,
            vec![1.0, 0.0, 0.0],
            0.5,
            vec!["rust"],
            0,
        )
        .await;
        plant_long(&store, vec![0.999, 0.01, 0.0], 0.6, vec!["memory"], 10).await;
        plant_long(&store, vec![0.998, 0.02, 0.0], 0.4, vec!["rust", "agents"], 20).await;
        // mark some accesses so the sum is visible
        store
            .mark_accessed(&[primary_id], Utc::now())
            .await
            .unwrap();

        let report = engine.compound("u1", Some(0.92)).await.unwrap();
        assert_eq!(report.status, EngineStatus::Completed);
        assert_eq!(report.clusters_found, 1);
        assert_eq!(report.memories_merged, 2);

        let survivors = store.list_long_term("u1").await.unwrap();
        assert_eq!(survivors.len(), 1);
        let merged = &survivors[0];
        assert_eq!(merged.id, primary_id);
        // importance saturates at 1.0: min(1.0, 0.5 + 0.6 + 0.4)
        assert!((merged.importance - 1.0).abs() < 1e-9);
        assert_eq!(merged.access_count, 1);
        assert_eq!(merged.tags, vec!["agents", "memory", "rust"]);

        let entries = audit.find_recent(10).await.unwrap();
        assert_eq!(entries[0].operation, AuditOperation::Compound);
        assert_eq!(entries[0].details["clusters_found"], 1);
    }

    #[tokio::test]
    async fn test_dissimilar_memories_stay_separate() {
        let (engine, store, _) = engine(MemoryConfig::default());
        plant_long(&store, vec![1.0, 0.0], 1.0, vec![], 0).await;
        plant_long(&store, vec![0.0, 1.0], 1.0, vec![], 1).await;

        let report = engine.compound("u1", None).await.unwrap();
        assert_eq!(report.status, EngineStatus::Completed);
        assert_eq!(report.clusters_found, 0);
        assert_eq!(report.memories_merged, 0);
        assert_eq!(store.list_long_term("u1").await.unwrap().len(), 2);
    }

    #[test]
    fn test_clustering_respects_minimum_size() {
        let now = Utc::now();
        let record = |embedding: Vec<f32>| MemoryRecord {
            id: 1,
            tier: MemoryTier::Long,
            user_id: "u1".to_string(),
            content: String::new(),
            kind: MemoryKind::Fact,
            scope: Some(MemoryScope::User),
            importance: 1.0,
            embedding,
            tags: Vec::new(),
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: None,
            expires_at: None,
            last_accessed_at: None,
            access_count: 0,
        };
        let memories = vec![
            record(vec![1.0, 0.0]),
            record(vec![0.0, 1.0]),
            record(vec![0.0, 0.99]),
        ];
        let clusters = cluster_near_duplicates(&memories, 0.92, 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0], vec![1, 2]);

        let clusters = cluster_near_duplicates(&memories, 0.92, 3);
        assert!(clusters.is_empty());
    }
}
