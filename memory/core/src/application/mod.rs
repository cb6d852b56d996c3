// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application layer: services orchestrating the domain contracts:
//! save/stats/cleanup, cross-tier search, compounding, decay and the
//! background lifecycle sweeper.

pub mod compound;
pub mod decay;
pub mod memory_service;
pub mod search;
pub mod sweeper;

pub use compound::{CompoundReport, CompoundingEngine};
pub use decay::{DecayEngine, DecayReport};
pub use memory_service::{CleanupReport, MemoryService, MemoryStats, SaveMemory};
pub use search::{SearchAggregator, SearchHit, SearchRequest, SearchResponse};
pub use sweeper::LifecycleSweeper;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::audit::AuditEntry;
use crate::domain::repository::AuditLog;

/// Outcome of a feature-gated engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    Completed,
    Disabled,
    Skipped,
}

/// Append an audit entry after a confirmed primary effect. Best-effort:
/// the trail is for traceability, so a failed append is logged and the
/// operation's result stands.
pub(crate) async fn append_audit_best_effort(audit: &dyn AuditLog, entry: AuditEntry) {
    let operation = entry.operation;
    if let Err(e) = audit.append(entry).await {
        warn!(operation = operation.as_str(), error = %e, "Audit append failed");
    }
}
