// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SearchAggregator — Cross-Tier Semantic Search (ADR-118)
//!
//! Executes one semantic query against the selected tiers and returns a
//! globally ranked, capped result list. The query embedding is computed
//! once and reused for every tier; per-tier fetches run concurrently, the
//! merge step then concatenates, sorts by similarity descending and
//! truncates to the global `top_k`; a tier can be entirely absent from
//! the final set when another tier's results dominate.
//!
//! ## Timing
//!
//! `embedding_time_ms` and `search_time_ms` are reported separately;
//! `search_time_ms` covers fan-out through merge and deliberately excludes
//! the embedding call, so search latency reads independently of
//! embedding-provider variance.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Tier fan-out, result merging and ranking
//! - **Related ADRs:** ADR-118: Tiered Memory Substrate

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::application::append_audit_best_effort;
use crate::config::MemoryConfig;
use crate::domain::audit::{AuditEntry, AuditOperation};
use crate::domain::error::MemoryError;
use crate::domain::memory::{
    MemoryKind, MemoryScope, MemoryTier, ScoredMemory, TierSelector,
};
use crate::domain::repository::{AuditLog, EmbeddingGateway, MemoryStore, SearchFilter};

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub user_id: String,
    pub query: String,
    /// Long-term visibility filter; ephemeral tiers ignore it.
    pub scopes: Option<Vec<MemoryScope>>,
    pub kinds: Option<Vec<MemoryKind>>,
    /// Defaults from config when absent. `0` is passed through unvalidated.
    pub top_k: Option<usize>,
    /// Similarity floor in `1 − distance` space; defaults from config.
    pub threshold: Option<f64>,
    pub tier: TierSelector,
}

/// One ranked hit. `similarity` is `1 − distance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub tier: MemoryTier,
    pub content: String,
    pub kind: MemoryKind,
    pub scope: Option<MemoryScope>,
    pub importance: f64,
    pub similarity: f64,
    pub tags: Vec<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub total: usize,
    pub embedding_time_ms: f64,
    pub search_time_ms: f64,
}

pub struct SearchAggregator {
    store: Arc<dyn MemoryStore>,
    audit: Arc<dyn AuditLog>,
    embeddings: Arc<dyn EmbeddingGateway>,
    config: Arc<MemoryConfig>,
}

impl SearchAggregator {
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

    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, MemoryError> {
        let top_k = request.top_k.unwrap_or(self.config.search.default_top_k);
        let threshold = request
            .threshold
            .unwrap_or(self.config.search.default_threshold);

        // An empty query still embeds and searches; there is no
        // short-circuit for it.
        let embed_start = Instant::now();
        let embedding = self
            .embeddings
            .embed(&request.query)
            .await
            .map_err(|e| MemoryError::Embedding(e.to_string()))?;
        let embedding_time_ms = embed_start.elapsed().as_secs_f64() * 1000.0;

        let search_start = Instant::now();
        let now = Utc::now();

        let fetches = request.tier.tiers().into_iter().map(|tier| {
            let filter = SearchFilter {
                user_id: request.user_id.clone(),
                embedding: embedding.clone(),
                scopes: request.scopes.clone(),
                kinds: request.kinds.clone(),
                min_similarity: threshold,
                limit: top_k as i64,
                now,
            };
            let store = self.store.clone();
            async move {
                store
                    .search_similar(tier, &filter)
                    .await
                    .map(|hits| (tier, hits))
            }
        });
        let per_tier = try_join_all(fetches).await?;

        // Long-term hits are touched as a side effect; ephemeral hits are
        // already tracked by their expiry and stay untouched.
        let accessed_ids: Vec<i64> = per_tier
            .iter()
            .filter(|(tier, _)| *tier == MemoryTier::Long)
            .flat_map(|(_, hits)| hits.iter().map(|h| h.record.id))
            .collect();
        if !accessed_ids.is_empty() {
            self.store.mark_accessed(&accessed_ids, now).await?;
        }

        // Cross-tier merge: global cap, not per-tier.
        let mut merged: Vec<ScoredMemory> = per_tier
            .into_iter()
            .flat_map(|(_, hits)| hits)
            .collect();
        merged.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        merged.truncate(top_k);

        let search_time_ms = search_start.elapsed().as_secs_f64() * 1000.0;

        append_audit_best_effort(
            self.audit.as_ref(),
            AuditEntry::success(AuditOperation::Search)
                .with_user(request.user_id.clone())
                .with_details(serde_json::json!({
                    "query": request.query,
                    "result_count": merged.len(),
                })),
        )
        .await;

        debug!(
            user_id = %request.user_id,
            results = merged.len(),
            embedding_time_ms,
            search_time_ms,
            "Search completed"
        );

        let results: Vec<SearchHit> = merged
            .into_iter()
            .map(|hit| SearchHit {
                id: hit.record.id,
                tier: hit.record.tier,
                content: hit.record.content,
                kind: hit.record.kind,
                scope: hit.record.scope,
                importance: hit.record.importance,
                similarity: hit.similarity,
                tags: hit.record.tags,
                metadata: hit.record.metadata,
                created_at: hit.record.created_at,
            })
            .collect();

        Ok(SearchResponse {
            total: results.len(),
            results,
            embedding_time_ms,
            search_time_ms,
        })
    }
}
