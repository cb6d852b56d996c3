// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Daemon HTTP server implementation
//!
//! Wires configuration → repositories → services, starts the supervised
//! lifecycle sweeper, and serves the memory API until ctrl-c/SIGTERM. The
//! sweeper is cancelled and joined before the process exits.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use l9_memory_core::application::{
    CompoundingEngine, DecayEngine, LifecycleSweeper, MemoryService, SearchAggregator,
};
use l9_memory_core::config::{MemoryConfig, StorageBackendKind};
use l9_memory_core::domain::repository::{AuditLog, EmbeddingGateway, MemoryStore};
use l9_memory_core::infrastructure::repositories::{
    InMemoryAuditLog, InMemoryMemoryStore, PostgresAuditLog, PostgresMemoryStore,
};
use l9_memory_core::infrastructure::{Database, HashEmbeddingClient, OllamaEmbeddingClient};
use l9_memory_core::presentation::{router, AppState};

pub async fn start_daemon(config_path: Option<PathBuf>, host: &str, port: u16) -> Result<()> {
    // Load configuration
    let config = MemoryConfig::discover(config_path.as_deref())
        .context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;
    let config = Arc::new(config);

    info!(backend = ?config.database.backend, "L9 memory daemon starting");

    // Select storage backend
    let (store, audit): (Arc<dyn MemoryStore>, Arc<dyn AuditLog>) = match config.database.backend {
        StorageBackendKind::Memory => {
            warn!("Using in-memory storage; memories will not survive a restart");
            (
                Arc::new(InMemoryMemoryStore::new()),
                Arc::new(InMemoryAuditLog::new()),
            )
        }
        StorageBackendKind::Postgres => {
            let url = config
                .database
                .url
                .as_deref()
                .context("database.url missing for postgres backend")?;
            let database = Database::new(url, config.database.max_connections)
                .await
                .context("Failed to connect to PostgreSQL")?;
            database
                .migrate()
                .await
                .context("Failed to run schema migrations")?;
            (
                Arc::new(PostgresMemoryStore::new(database.get_pool().clone())),
                Arc::new(PostgresAuditLog::new(database.get_pool().clone())),
            )
        }
    };

    // Select embedding gateway
    let embeddings: Arc<dyn EmbeddingGateway> = match &config.embedding.endpoint {
        Some(endpoint) => {
            info!(endpoint, model = %config.embedding.model, "Using HTTP embedding gateway");
            Arc::new(OllamaEmbeddingClient::new(
                endpoint.clone(),
                config.embedding.model.clone(),
                config.embedding.dimension,
            ))
        }
        None => {
            warn!("No embedding endpoint configured; using deterministic hash embeddings");
            Arc::new(HashEmbeddingClient::new(config.embedding.dimension))
        }
    };

    // Initialize services
    let memory_service = Arc::new(MemoryService::new(
        store.clone(),
        audit.clone(),
        embeddings.clone(),
        config.clone(),
    ));
    let search = Arc::new(SearchAggregator::new(
        store.clone(),
        audit.clone(),
        embeddings,
        config.clone(),
    ));
    let compounding = Arc::new(CompoundingEngine::new(
        store.clone(),
        audit.clone(),
        config.clone(),
    ));
    let decay = Arc::new(DecayEngine::new(store, audit, config.clone()));

    // Start the supervised sweeper
    let sweeper = Arc::new(LifecycleSweeper::new(
        memory_service.clone(),
        decay.clone(),
        config.clone(),
    ));
    let sweeper_token = sweeper.shutdown_token();
    let sweeper_handle = sweeper.start();

    let state = Arc::new(AppState {
        memory_service,
        search,
        compounding,
        decay,
        start_time: std::time::Instant::now(),
    });

    // Start HTTP server
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Memory daemon listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    // Stop the sweeper before exiting
    sweeper_token.cancel();
    if let Err(e) = sweeper_handle.await {
        warn!("Sweeper task join failed: {}", e);
    }

    info!("Memory daemon shutting down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
