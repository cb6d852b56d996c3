// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository implementations: in-memory for development and tests,
//! PostgreSQL + pgvector for production.

pub mod in_memory;
pub mod postgres_audit;
pub mod postgres_memory;

pub use in_memory::{InMemoryAuditLog, InMemoryMemoryStore};
pub use postgres_audit::PostgresAuditLog;
pub use postgres_memory::PostgresMemoryStore;
