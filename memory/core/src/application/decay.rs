// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # DecayEngine — Importance Attenuation (ADR-029)
//!
//! Models forgetting: long-term memories not accessed for more than a day
//! lose importance continuously, `importance × (1 − rate)^elapsed_days`
//! with `elapsed_days` measured in fractional days from
//! `last_accessed_at`. The exponent differs per row, so the store computes
//! the multiplier server-side at write time rather than applying one
//! global factor.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Time-decay pass over long-term memories
//! - **Related ADRs:** ADR-029: Time-Decay Parameters

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::application::{append_audit_best_effort, EngineStatus};
use crate::config::MemoryConfig;
use crate::domain::audit::{AuditEntry, AuditOperation};
use crate::domain::error::MemoryError;
use crate::domain::repository::{AuditLog, MemoryStore};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecayReport {
    pub status: EngineStatus,
    pub memories_affected: u64,
    /// Per-day multiplier `1 − rate`.
    pub decay_factor: f64,
}

pub struct DecayEngine {
    store: Arc<dyn MemoryStore>,
    audit: Arc<dyn AuditLog>,
    config: Arc<MemoryConfig>,
}

impl DecayEngine {
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

    /// Decay every long-term memory whose last access is older than one
    /// day. Dry-run counts candidates without writing.
    pub async fn decay(&self, dry_run: bool) -> Result<DecayReport, MemoryError> {
        let decay_factor = 1.0 - self.config.decay.rate_per_day;

        if !self.config.decay.enabled {
            return Ok(DecayReport {
                status: EngineStatus::Disabled,
                memories_affected: 0,
                decay_factor,
            });
        }

        let now = Utc::now();
        let cutoff = now - Duration::days(1);
        let memories_affected = self
            .store
            .decay_unaccessed(cutoff, now, self.config.decay.rate_per_day, dry_run)
            .await?;

        if !dry_run {
            append_audit_best_effort(
                self.audit.as_ref(),
                AuditEntry::success(AuditOperation::Decay).with_details(serde_json::json!({
                    "memories_affected": memories_affected,
                    "decay_factor": decay_factor,
                })),
            )
            .await;

            info!(memories_affected, decay_factor, "Decay pass completed");
        }

        Ok(DecayReport {
            status: EngineStatus::Completed,
            memories_affected,
            decay_factor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::memory::{MemoryKind, MemoryScope, MemoryTier, NewMemory};
    use crate::infrastructure::repositories::{InMemoryAuditLog, InMemoryMemoryStore};

    fn engine(
        config: MemoryConfig,
    ) -> (DecayEngine, Arc<InMemoryMemoryStore>, Arc<InMemoryAuditLog>) {
        let store = Arc::new(InMemoryMemoryStore::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let engine = DecayEngine::new(store.clone(), audit.clone(), Arc::new(config));
        (engine, store, audit)
    }

    /// Plant a long-term memory and backdate its last access.
    async fn plant_accessed_ago(store: &InMemoryMemoryStore, days: i64) -> i64 {
        let created_at = Utc::now() - chrono::Duration::days(days);
        store
            .insert(NewMemory {
                tier: MemoryTier::Long,
                user_id: "u1".to_string(),
                content: "fading".to_string(),
                kind: MemoryKind::Fact,
                scope: Some(MemoryScope::User),
                importance: 1.0,
                embedding: vec![1.0, 0.0],
                tags: Vec::new(),
                metadata: serde_json::json!({}),
                created_at,
                expires_at: None,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_disabled_reports_status() {
        let mut config = MemoryConfig::default();
        config.decay.enabled = false;
        let (engine, _, _) = engine(config);

        let report = engine.decay(false).await.unwrap();
        assert_eq!(report.status, EngineStatus::Disabled);
        assert_eq!(report.memories_affected, 0);
    }

    #[tokio::test]
    async fn test_two_day_old_memory_decays_to_0_81() {
        let (engine, store, audit) = engine(MemoryConfig::default());
        let id = plant_accessed_ago(&store, 2).await;

        let report = engine.decay(false).await.unwrap();
        assert_eq!(report.status, EngineStatus::Completed);
        assert_eq!(report.memories_affected, 1);
        assert!((report.decay_factor - 0.9).abs() < 1e-9);

        let record = store
            .find_by_id(MemoryTier::Long, id)
            .await
            .unwrap()
            .unwrap();
        // 1.0 × 0.9² with a small tolerance for the sub-second drift
        // between planting and decaying
        assert!((record.importance - 0.81).abs() < 1e-4);

        let entries = audit.find_recent(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, AuditOperation::Decay);
    }

    #[tokio::test]
    async fn test_recently_accessed_memories_are_untouched() {
        let (engine, store, _) = engine(MemoryConfig::default());
        let id = plant_accessed_ago(&store, 0).await;

        let report = engine.decay(false).await.unwrap();
        assert_eq!(report.memories_affected, 0);

        let record = store
            .find_by_id(MemoryTier::Long, id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.importance, 1.0);
    }

    #[tokio::test]
    async fn test_dry_run_counts_without_writing() {
        let (engine, store, audit) = engine(MemoryConfig::default());
        let id = plant_accessed_ago(&store, 3).await;

        let report = engine.decay(true).await.unwrap();
        assert_eq!(report.memories_affected, 1);

        let record = store
            .find_by_id(MemoryTier::Long, id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.importance, 1.0);
        assert!(audit.find_recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_decay_is_monotonically_non_increasing() {
        let (engine, store, _) = engine(MemoryConfig::default());
        let id = plant_accessed_ago(&store, 5).await;

        let mut last = f64::INFINITY;
        for _ in 0..3 {
            engine.decay(false).await.unwrap();
            let importance = store
                .find_by_id(MemoryTier::Long, id)
                .await
                .unwrap()
                .unwrap()
                .importance;
            assert!(importance <= last);
            last = importance;
        }
        assert!(last > 0.0);
    }
}
