// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! End-to-end tests over the assembled substrate services (in-memory
//! backend, deterministic embeddings): save → search round trips,
//! compounding of near-identical saves, expiry sweeps.

use std::sync::Arc;

use chrono::Utc;
use l9_memory_core::application::{
    CompoundingEngine, DecayEngine, EngineStatus, LifecycleSweeper, MemoryService,
    SearchAggregator, SearchRequest, SaveMemory,
};
use l9_memory_core::config::MemoryConfig;
use l9_memory_core::domain::memory::{
    MemoryKind, MemoryTier, NewMemory, TierSelector,
};
use l9_memory_core::domain::repository::{AuditLog, MemoryStore};
use l9_memory_core::infrastructure::embedding::HashEmbeddingClient;
use l9_memory_core::infrastructure::repositories::{InMemoryAuditLog, InMemoryMemoryStore};

struct Substrate {
    store: Arc<InMemoryMemoryStore>,
    audit: Arc<InMemoryAuditLog>,
    memory_service: Arc<MemoryService>,
    search: Arc<SearchAggregator>,
    compounding: Arc<CompoundingEngine>,
    decay: Arc<DecayEngine>,
    config: Arc<MemoryConfig>,
}

fn substrate(config: MemoryConfig) -> Substrate {
    let config = Arc::new(config);
    let store = Arc::new(InMemoryMemoryStore::new());
    let audit = Arc::new(InMemoryAuditLog::new());
    let embeddings = Arc::new(HashEmbeddingClient::default());

    Substrate {
        store: store.clone(),
        audit: audit.clone(),
        memory_service: Arc::new(MemoryService::new(
            store.clone(),
            audit.clone(),
            embeddings.clone(),
            config.clone(),
        )),
        search: Arc::new(SearchAggregator::new(
            store.clone(),
            audit.clone(),
            embeddings.clone(),
            config.clone(),
        )),
        compounding: Arc::new(CompoundingEngine::new(
            store.clone(),
            audit.clone(),
            config.clone(),
        )),
        decay: Arc::new(DecayEngine::new(store, audit, config.clone())),
        config,
    }
}

fn save(tier: MemoryTier, content: &str) -> SaveMemory {
    SaveMemory {
        user_id: "u1".to_string(),
        content: content.to_string(),
        kind: MemoryKind::Fact,
        scope: None,
        tier,
        tags: Vec::new(),
        importance: None,
        metadata: None,
    }
}

fn search(query: &str) -> SearchRequest {
    SearchRequest {
        user_id: "u1".to_string(),
        query: query.to_string(),
        scopes: None,
        kinds: None,
        top_k: Some(5),
        threshold: Some(0.0),
        tier: TierSelector::All,
    }
}

#[tokio::test]
async fn test_save_then_search_round_trip() {
    let s = substrate(MemoryConfig::default());
    let saved = s
        .memory_service
        .save(save(MemoryTier::Long, "the user prefers tabs over spaces"))
        .await
        .unwrap();

    let response = s
        .search
        .search(search("the user prefers tabs over spaces"))
        .await
        .unwrap();

    assert!(response.total >= 1);
    let top = &response.results[0];
    assert_eq!(top.id, saved.id);
    assert!((top.similarity - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_round_trip_across_every_tier() {
    let s = substrate(MemoryConfig::default());
    for tier in MemoryTier::all() {
        s.memory_service
            .save(save(tier, "same phrase in every tier"))
            .await
            .unwrap();
    }

    let response = s
        .search
        .search(search("same phrase in every tier"))
        .await
        .unwrap();
    assert_eq!(response.total, 3);

    let tiers: Vec<MemoryTier> = response.results.iter().map(|h| h.tier).collect();
    for tier in MemoryTier::all() {
        assert!(tiers.contains(&tier));
    }
}

#[tokio::test]
async fn test_near_identical_saves_compound_to_one_row() {
    let s = substrate(MemoryConfig::default());
    // identical content ⇒ identical embeddings ⇒ pairwise similarity 1.0
    for _ in 0..3 {
        s.memory_service
            .save(save(MemoryTier::Long, "the deploy pipeline needs a manual approval"))
            .await
            .unwrap();
    }

    let report = s.compounding.compound("u1", Some(0.92)).await.unwrap();
    assert_eq!(report.status, EngineStatus::Completed);
    assert_eq!(report.clusters_found, 1);
    assert_eq!(report.memories_merged, 2);

    let survivors = s.store.list_long_term("u1").await.unwrap();
    assert_eq!(survivors.len(), 1);
}

#[tokio::test]
async fn test_search_after_compound_returns_merged_memory() {
    let s = substrate(MemoryConfig::default());
    for _ in 0..2 {
        s.memory_service
            .save(save(MemoryTier::Long, "retries are capped at three"))
            .await
            .unwrap();
    }
    s.compounding.compound("u1", None).await.unwrap();

    let response = s
        .search
        .search(search("retries are capped at three"))
        .await
        .unwrap();
    assert_eq!(response.total, 1);
    assert!((response.results[0].importance - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_expired_short_term_memory_is_swept() {
    let s = substrate(MemoryConfig::default());
    // a one-hour memory saved "two hours ago"
    let now = Utc::now();
    s.store
        .insert(NewMemory {
            tier: MemoryTier::Short,
            user_id: "u1".to_string(),
            content: "transient context".to_string(),
            kind: MemoryKind::Context,
            scope: None,
            importance: 1.0,
            embedding: vec![1.0, 0.0],
            tags: Vec::new(),
            metadata: serde_json::json!({}),
            created_at: now - chrono::Duration::hours(2),
            expires_at: Some(now - chrono::Duration::hours(1)),
        })
        .await
        .unwrap();

    let report = s.memory_service.delete_expired(false).await.unwrap();
    assert_eq!(report.short_term_expired, 1);
    assert!(s
        .store
        .find_by_id(MemoryTier::Short, 1)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_cleanup_dry_run_is_idempotent() {
    let s = substrate(MemoryConfig::default());
    let now = Utc::now();
    for _ in 0..2 {
        s.store
            .insert(NewMemory {
                tier: MemoryTier::Medium,
                user_id: "u1".to_string(),
                content: "stale".to_string(),
                kind: MemoryKind::Context,
                scope: None,
                importance: 1.0,
                embedding: vec![1.0],
                tags: Vec::new(),
                metadata: serde_json::json!({}),
                created_at: now - chrono::Duration::days(9),
                expires_at: Some(now - chrono::Duration::days(2)),
            })
            .await
            .unwrap();
    }

    let first = s.memory_service.delete_expired(true).await.unwrap();
    let second = s.memory_service.delete_expired(true).await.unwrap();
    assert_eq!(first.medium_term_expired, second.medium_term_expired);
    assert_eq!(first.medium_term_expired, 2);
}

#[tokio::test]
async fn test_audit_trail_records_every_operation() {
    let s = substrate(MemoryConfig::default());
    s.memory_service
        .save(save(MemoryTier::Long, "first"))
        .await
        .unwrap();
    s.memory_service
        .save(save(MemoryTier::Long, "first"))
        .await
        .unwrap();
    s.search.search(search("first")).await.unwrap();
    s.compounding.compound("u1", None).await.unwrap();
    s.decay.decay(false).await.unwrap();
    s.memory_service.delete_expired(false).await.unwrap();

    let entries = s.audit.find_recent(20).await.unwrap();
    let operations: Vec<&str> = entries
        .iter()
        .map(|e| e.operation.as_str())
        .collect();
    assert_eq!(
        operations,
        // newest first
        vec!["cleanup", "decay", "compound", "search", "insert", "insert"]
    );
}

#[tokio::test]
async fn test_sweeper_full_cycle_with_decay() {
    let mut config = MemoryConfig::default();
    config.sweeper.interval = std::time::Duration::from_millis(20);
    let s = substrate(config);

    // expired ephemeral row + an unaccessed long-term row
    let now = Utc::now();
    s.store
        .insert(NewMemory {
            tier: MemoryTier::Short,
            user_id: "u1".to_string(),
            content: "old".to_string(),
            kind: MemoryKind::Context,
            scope: None,
            importance: 1.0,
            embedding: vec![1.0],
            tags: Vec::new(),
            metadata: serde_json::json!({}),
            created_at: now - chrono::Duration::hours(3),
            expires_at: Some(now - chrono::Duration::hours(1)),
        })
        .await
        .unwrap();
    s.store
        .insert(NewMemory {
            tier: MemoryTier::Long,
            user_id: "u1".to_string(),
            content: "fading".to_string(),
            kind: MemoryKind::Fact,
            scope: None,
            importance: 1.0,
            embedding: vec![1.0],
            tags: Vec::new(),
            metadata: serde_json::json!({}),
            created_at: now - chrono::Duration::days(4),
            expires_at: None,
        })
        .await
        .unwrap();

    let sweeper = Arc::new(LifecycleSweeper::new(
        s.memory_service.clone(),
        s.decay.clone(),
        s.config.clone(),
    ));
    let handle = sweeper.clone().start();
    tokio::time::sleep(std::time::Duration::from_millis(80)).await;
    sweeper.shutdown_token().cancel();
    handle.await.unwrap();

    assert!(s
        .store
        .find_by_id(MemoryTier::Short, 1)
        .await
        .unwrap()
        .is_none());
    let decayed = s
        .store
        .find_by_id(MemoryTier::Long, 1)
        .await
        .unwrap()
        .unwrap();
    assert!(decayed.importance < 1.0);
}
