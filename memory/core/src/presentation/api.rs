// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP API for the memory substrate.
//!
//! Wire contract keeps the platform's string vocabulary (`duration`,
//! `kind`, `scope` as lowercase names); parsing happens here and unknown
//! names surface as 400s before any work is done. Everything else maps to
//! a generic 500 carrying the underlying message; no finer error codes
//! exist at this boundary.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::application::compound::CompoundReport;
use crate::application::decay::DecayReport;
use crate::application::memory_service::{CleanupReport, MemoryService, MemoryStats, SaveMemory};
use crate::application::search::{SearchAggregator, SearchRequest, SearchResponse};
use crate::application::{CompoundingEngine, DecayEngine};
use crate::domain::error::MemoryError;
use crate::domain::memory::{
    MemoryKind, MemoryRecord, MemoryScope, MemoryTier, TierSelector,
};

pub struct AppState {
    pub memory_service: Arc<MemoryService>,
    pub search: Arc<SearchAggregator>,
    pub compounding: Arc<CompoundingEngine>,
    pub decay: Arc<DecayEngine>,
    pub start_time: std::time::Instant,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/memory", post(save_memory))
        .route("/api/memory/search", post(search_memory))
        .route("/api/memory/stats", get(memory_stats))
        .route("/api/memory/{tier}/{id}", get(get_memory))
        .route("/api/admin/cleanup", post(admin_cleanup))
        .route("/api/admin/compound", post(admin_compound))
        .route("/api/admin/decay", post(admin_decay))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Boundary error: validation maps to 400, everything else to 500.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<MemoryError> for ApiError {
    fn from(err: MemoryError) -> Self {
        let status = if err.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveMemoryRequest {
    pub user_id: String,
    pub content: String,
    pub kind: String,
    pub scope: Option<String>,
    pub duration: String,
    pub tags: Option<Vec<String>>,
    pub importance: Option<f64>,
    pub metadata: Option<serde_json::Value>,
}

/// Persisted memory summary returned by save and get.
#[derive(Debug, Serialize)]
pub struct MemoryView {
    pub id: i64,
    pub tier: MemoryTier,
    pub user_id: String,
    pub content: String,
    pub kind: MemoryKind,
    pub scope: Option<MemoryScope>,
    pub importance: f64,
    pub tags: Vec<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub access_count: i64,
}

impl From<MemoryRecord> for MemoryView {
    fn from(record: MemoryRecord) -> Self {
        Self {
            id: record.id,
            tier: record.tier,
            user_id: record.user_id,
            content: record.content,
            kind: record.kind,
            scope: record.scope,
            importance: record.importance,
            tags: record.tags,
            metadata: record.metadata,
            created_at: record.created_at,
            expires_at: record.expires_at,
            last_accessed_at: record.last_accessed_at,
            access_count: record.access_count,
        }
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}

async fn save_memory(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SaveMemoryRequest>,
) -> Result<Json<MemoryView>, ApiError> {
    let tier = MemoryTier::from_str(&payload.duration)?;
    let kind = MemoryKind::from_str(&payload.kind)?;
    let scope = payload
        .scope
        .as_deref()
        .map(MemoryScope::from_str)
        .transpose()?;

    let record = state
        .memory_service
        .save(SaveMemory {
            user_id: payload.user_id,
            content: payload.content,
            kind,
            scope,
            tier,
            tags: payload.tags.unwrap_or_default(),
            importance: payload.importance,
            metadata: payload.metadata,
        })
        .await?;

    Ok(Json(record.into()))
}

#[derive(Debug, Deserialize)]
pub struct SearchMemoryRequest {
    pub user_id: String,
    pub query: String,
    pub scopes: Option<Vec<String>>,
    pub kinds: Option<Vec<String>>,
    pub top_k: Option<usize>,
    pub threshold: Option<f64>,
    pub duration: Option<String>,
}

async fn search_memory(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SearchMemoryRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let tier = payload
        .duration
        .as_deref()
        .map(TierSelector::from_str)
        .transpose()?
        .unwrap_or_default();
    let scopes = payload
        .scopes
        .map(|scopes| {
            scopes
                .iter()
                .map(|s| MemoryScope::from_str(s))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;
    let kinds = payload
        .kinds
        .map(|kinds| {
            kinds
                .iter()
                .map(|k| MemoryKind::from_str(k))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    let response = state
        .search
        .search(SearchRequest {
            user_id: payload.user_id,
            query: payload.query,
            scopes,
            kinds,
            top_k: payload.top_k,
            threshold: payload.threshold,
            tier,
        })
        .await?;

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    pub user_id: Option<String>,
    pub duration: Option<String>,
}

async fn memory_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsParams>,
) -> Result<Json<MemoryStats>, ApiError> {
    let selector = params
        .duration
        .as_deref()
        .map(TierSelector::from_str)
        .transpose()?
        .unwrap_or_default();

    let stats = state
        .memory_service
        .get_stats(params.user_id.as_deref(), selector)
        .await?;
    Ok(Json(stats))
}

async fn get_memory(
    State(state): State<Arc<AppState>>,
    Path((tier, id)): Path<(String, i64)>,
) -> Result<Json<MemoryView>, ApiError> {
    let tier = MemoryTier::from_str(&tier)?;
    let record = state
        .memory_service
        .get(tier, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No {} memory with id {}", tier, id)))?;
    Ok(Json(record.into()))
}

#[derive(Debug, Deserialize, Default)]
pub struct CleanupRequest {
    #[serde(default)]
    pub dry_run: bool,
}

async fn admin_cleanup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CleanupRequest>,
) -> Result<Json<CleanupReport>, ApiError> {
    let report = state.memory_service.delete_expired(payload.dry_run).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct CompoundRequest {
    pub user_id: String,
    pub threshold: Option<f64>,
}

async fn admin_compound(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CompoundRequest>,
) -> Result<Json<CompoundReport>, ApiError> {
    let report = state
        .compounding
        .compound(&payload.user_id, payload.threshold)
        .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize, Default)]
pub struct DecayRequest {
    #[serde(default)]
    pub dry_run: bool,
}

async fn admin_decay(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DecayRequest>,
) -> Result<Json<DecayReport>, ApiError> {
    let report = state.decay.decay(payload.dry_run).await?;
    Ok(Json(report))
}
