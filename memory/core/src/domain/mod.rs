// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: entities, persistence contracts and errors for the
//! tiered memory substrate.

pub mod audit;
pub mod error;
pub mod memory;
pub mod repository;
pub mod vector;

pub use audit::{AuditEntry, AuditOperation, AuditStatus};
pub use error::MemoryError;
pub use memory::{
    ClusterMerge, MemoryKind, MemoryRecord, MemoryScope, MemoryTier, NewMemory, ScoredMemory,
    TierSelector, TierStats,
};
pub use repository::{
    AuditLog, EmbeddingError, EmbeddingGateway, MemoryStore, RepositoryError, SearchFilter,
};
