// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # MemoryService — Save, Stats & Expiry (ADR-118)
//!
//! Application service translating domain operations into tier-specific
//! persistence calls. The service owns the expiry computation: short and
//! medium memories get `expires_at` from the configured retention, long-term
//! memories never carry one.
//!
//! ## Audit trail
//!
//! Every confirmed operation appends one audit row. The append is
//! best-effort: a failed audit write is logged and the primary effect
//! stands (ADR-119: the trail is for traceability, not replay).
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Save/stats/cleanup operations over the tier tables
//! - **Related ADRs:** ADR-118: Tiered Memory Substrate, ADR-119: Memory Audit Trail

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::append_audit_best_effort;
use crate::config::MemoryConfig;
use crate::domain::audit::{AuditEntry, AuditOperation};
use crate::domain::error::MemoryError;
use crate::domain::memory::{
    MemoryKind, MemoryRecord, MemoryScope, MemoryTier, NewMemory, TierSelector, TierStats,
};
use crate::domain::repository::{AuditLog, EmbeddingGateway, MemoryStore};

/// Input to [`MemoryService::save`].
#[derive(Debug, Clone)]
pub struct SaveMemory {
    pub user_id: String,
    pub content: String,
    pub kind: MemoryKind,
    /// Long-term visibility; ignored for ephemeral tiers. Defaults to
    /// [`MemoryScope::User`] when absent on a long-term save.
    pub scope: Option<MemoryScope>,
    pub tier: MemoryTier,
    pub tags: Vec<String>,
    pub importance: Option<f64>,
    pub metadata: Option<serde_json::Value>,
}

/// Result of a [`MemoryService::delete_expired`] pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CleanupReport {
    pub short_term_expired: u64,
    pub medium_term_expired: u64,
    pub dry_run: bool,
}

impl CleanupReport {
    pub fn total(&self) -> u64 {
        self.short_term_expired + self.medium_term_expired
    }
}

/// Per-tier counts and averages returned by [`MemoryService::get_stats`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub tiers: Vec<TierStats>,
    pub total_count: u64,
    pub avg_importance: f64,
    /// Distinct owners over the long-term tier; present only when the
    /// long-term tier was part of the request.
    pub unique_users: Option<u64>,
}

pub struct MemoryService {
    store: Arc<dyn MemoryStore>,
    audit: Arc<dyn AuditLog>,
    embeddings: Arc<dyn EmbeddingGateway>,
    config: Arc<MemoryConfig>,
}

impl MemoryService {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        audit: Arc<dyn AuditLog>,
        embeddings: Arc<dyn EmbeddingGateway>,
        config: Arc<MemoryConfig>,
    ) -> Self {
        Self {
            store,
            audit,
            embeddings,
            config,
        }
    }

    /// Persist a new memory. The embedding is computed synchronously before
    /// the insert; a failed insert leaves no row and no audit entry.
    pub async fn save(&self, request: SaveMemory) -> Result<MemoryRecord, MemoryError> {
        if request.content.trim().is_empty() {
            return Err(MemoryError::Validation(
                "Memory content must not be empty".to_string(),
            ));
        }

        let embedding = self
            .embeddings
            .embed(&request.content)
            .await
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;

        let now = Utc::now();
        let expires_at = self.config.retention_for(request.tier).map(|d| now + d);
        let is_long = !request.tier.is_ephemeral();
        let importance = request.importance.unwrap_or(1.0);

        let record = self
            .store
            .insert(NewMemory {
                tier: request.tier,
                user_id: request.user_id,
                content: request.content,
                kind: request.kind,
                scope: is_long.then(|| request.scope.unwrap_or(MemoryScope::User)),
                importance,
                embedding,
                tags: if is_long { request.tags } else { Vec::new() },
                metadata: request.metadata.unwrap_or(serde_json::json!({})),
                created_at: now,
                expires_at,
            })
            .await?;

        append_audit_best_effort(
            self.audit.as_ref(),
            AuditEntry::success(AuditOperation::Insert)
                .with_tier(record.tier)
                .with_memory_id(record.id)
                .with_user(record.user_id.clone())
                .with_details(serde_json::json!({
                    "kind": record.kind,
                    "importance": record.importance,
                })),
        )
        .await;

        info!(
            tier = %record.tier,
            memory_id = record.id,
            user_id = %record.user_id,
            "Memory saved"
        );

        Ok(record)
    }

    /// Fetch a single memory by tier and id.
    pub async fn get(
        &self,
        tier: MemoryTier,
        id: i64,
    ) -> Result<Option<MemoryRecord>, MemoryError> {
        Ok(self.store.find_by_id(tier, id).await?)
    }

    /// Aggregate count and mean importance per requested tier; global when
    /// `user_id` is omitted. Unique users are counted over long-term only.
    pub async fn get_stats(
        &self,
        user_id: Option<&str>,
        selector: TierSelector,
    ) -> Result<MemoryStats, MemoryError> {
        let tiers = selector.tiers();
        let mut per_tier = Vec::with_capacity(tiers.len());
        for tier in &tiers {
            per_tier.push(self.store.tier_stats(*tier, user_id).await?);
        }

        let total_count: u64 = per_tier.iter().map(|s| s.count).sum();
        let avg_importance = if total_count == 0 {
            0.0
        } else {
            per_tier
                .iter()
                .map(|s| s.avg_importance * s.count as f64)
                .sum::<f64>()
                / total_count as f64
        };

        let unique_users = if tiers.contains(&MemoryTier::Long) {
            Some(self.store.count_unique_users().await?)
        } else {
            None
        };

        Ok(MemoryStats {
            tiers: per_tier,
            total_count,
            avg_importance,
            unique_users,
        })
    }

    /// Count (dry-run) or delete expired short/medium rows. Real runs
    /// append one cleanup audit row summarizing both tiers.
    pub async fn delete_expired(&self, dry_run: bool) -> Result<CleanupReport, MemoryError> {
        let now = Utc::now();
        let short_term_expired = self
            .store
            .delete_expired(MemoryTier::Short, now, dry_run)
            .await?;
        let medium_term_expired = self
            .store
            .delete_expired(MemoryTier::Medium, now, dry_run)
            .await?;

        let report = CleanupReport {
            short_term_expired,
            medium_term_expired,
            dry_run,
        };

        if dry_run {
            debug!(
                short = short_term_expired,
                medium = medium_term_expired,
                "Expiry dry-run"
            );
        } else {
            append_audit_best_effort(
                self.audit.as_ref(),
                AuditEntry::success(AuditOperation::Cleanup).with_details(serde_json::json!({
                    "short_term_expired": short_term_expired,
                    "medium_term_expired": medium_term_expired,
                })),
            )
            .await;

            info!(
                short = short_term_expired,
                medium = medium_term_expired,
                "Expired memories deleted"
            );
        }

        Ok(report)
    }
}
