// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lifecycle Sweeper - Background task for expiry eviction and decay
//!
//! The substrate's "sleep cycle": periodically evicts expired short/medium
//! memories and triggers the decay engine. One sweeper runs per process,
//! owned by the daemon lifecycle: started at init, cancelled and joined at
//! shutdown via its `CancellationToken` rather than detached fire-and-forget.
//!
//! A failed iteration is logged and the loop continues after the next
//! sleep; repeated failures are only visible via logs.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Supervised background loop over cleanup and decay
//! - **Related ADRs:** ADR-029: Time-Decay Parameters

use std::sync::Arc;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::decay::DecayEngine;
use crate::application::memory_service::{CleanupReport, MemoryService};
use crate::config::MemoryConfig;
use crate::domain::error::MemoryError;

pub struct LifecycleSweeper {
    memory_service: Arc<MemoryService>,
    decay_engine: Arc<DecayEngine>,
    config: Arc<MemoryConfig>,
    shutdown_token: tokio_util::sync::CancellationToken,
}

impl LifecycleSweeper {
    pub fn new(
        memory_service: Arc<MemoryService>,
        decay_engine: Arc<DecayEngine>,
        config: Arc<MemoryConfig>,
    ) -> Self {
        Self {
            memory_service,
            decay_engine,
            config,
            shutdown_token: tokio_util::sync::CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> tokio_util::sync::CancellationToken {
        self.shutdown_token.clone()
    }

    /// Start the sweeper background task
    /// Returns a handle the daemon joins at shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the sweep loop with graceful shutdown support
    async fn run(&self) {
        if !self.config.sweeper.enabled {
            info!("Lifecycle sweeper is disabled");
            return;
        }

        info!(
            interval_seconds = self.config.sweeper.interval.as_secs(),
            decay_enabled = self.config.decay.enabled,
            "Starting lifecycle sweeper background task"
        );

        // First cycle runs after a full interval: the loop sleeps first.
        let period = self.config.sweeper.interval;
        let mut tick = interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let cycle_id = Uuid::new_v4();
                    debug!(%cycle_id, "Running sweep cycle");

                    match self.sweep_cycle().await {
                        Ok((cleanup, decayed)) => {
                            info!(
                                %cycle_id,
                                short = cleanup.short_term_expired,
                                medium = cleanup.medium_term_expired,
                                decayed,
                                "Sweep cycle completed successfully"
                            );
                        }
                        Err(e) => {
                            warn!(%cycle_id, "Sweep cycle failed: {}", e);
                        }
                    }
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping lifecycle sweeper");
                    break;
                }
            }
        }

        info!("Lifecycle sweeper background task stopped");
    }

    /// Execute a single sweep: evict expired ephemeral rows, then decay.
    /// The decay engine no-ops itself when decay is disabled.
    async fn sweep_cycle(&self) -> Result<(CleanupReport, u64), MemoryError> {
        let cleanup = self.memory_service.delete_expired(false).await?;
        let decay = self.decay_engine.decay(false).await?;
        Ok((cleanup, decay.memories_affected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::memory::{MemoryKind, MemoryTier, NewMemory};
    use crate::domain::repository::MemoryStore;
    use crate::infrastructure::embedding::HashEmbeddingClient;
    use crate::infrastructure::repositories::{InMemoryAuditLog, InMemoryMemoryStore};
    use chrono::Utc;
    use std::time::Duration;

    fn sweeper(config: MemoryConfig) -> (Arc<LifecycleSweeper>, Arc<InMemoryMemoryStore>) {
        let store = Arc::new(InMemoryMemoryStore::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let embeddings = Arc::new(HashEmbeddingClient::default());
        let config = Arc::new(config);
        let memory_service = Arc::new(MemoryService::new(
            store.clone(),
            audit.clone(),
            embeddings,
            config.clone(),
        ));
        let decay_engine = Arc::new(DecayEngine::new(store.clone(), audit, config.clone()));
        (
            Arc::new(LifecycleSweeper::new(memory_service, decay_engine, config)),
            store,
        )
    }

    async fn plant_expired(store: &InMemoryMemoryStore) {
        let now = Utc::now();
        store
            .insert(NewMemory {
                tier: MemoryTier::Short,
                user_id: "u1".to_string(),
                content: "stale".to_string(),
                kind: MemoryKind::Context,
                scope: None,
                importance: 1.0,
                embedding: vec![1.0],
                tags: Vec::new(),
                metadata: serde_json::json!({}),
                created_at: now - chrono::Duration::hours(2),
                expires_at: Some(now - chrono::Duration::hours(1)),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sweep_cycle_evicts_expired_rows() {
        let (sweeper, store) = sweeper(MemoryConfig::default());
        plant_expired(&store).await;

        let (cleanup, decayed) = sweeper.sweep_cycle().await.unwrap();
        assert_eq!(cleanup.short_term_expired, 1);
        assert_eq!(cleanup.medium_term_expired, 0);
        assert_eq!(decayed, 0);
        assert!(store
            .find_by_id(MemoryTier::Short, 1)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_sweeper_runs_cycles_on_interval() {
        let mut config = MemoryConfig::default();
        config.sweeper.interval = Duration::from_millis(20);
        let (sweeper, store) = sweeper(config);
        plant_expired(&store).await;

        let handle = sweeper.clone().start();
        tokio::time::sleep(Duration::from_millis(80)).await;
        sweeper.shutdown_token().cancel();
        handle.await.unwrap();

        assert!(store
            .find_by_id(MemoryTier::Short, 1)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_sweeper_disabled() {
        let mut config = MemoryConfig::default();
        config.sweeper.enabled = false;
        let (sweeper, _) = sweeper(config);

        // run() returns immediately when disabled
        let handle = sweeper.start();
        tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("disabled sweeper should exit on its own")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancellation_stops_the_loop() {
        let mut config = MemoryConfig::default();
        config.sweeper.interval = Duration::from_secs(3600);
        let (sweeper, _) = sweeper(config);

        let handle = sweeper.clone().start();
        sweeper.shutdown_token().cancel();
        tokio::time::timeout(Duration::from_millis(100), handle)
            .await
            .expect("cancelled sweeper should stop promptly")
            .unwrap();
    }
}
