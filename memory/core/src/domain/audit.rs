// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Audit Trail Domain Types (ADR-119)
//!
//! Append-only records written after every save, search, compound, decay
//! and cleanup operation. Entries are for traceability, never replay: they
//! are written best-effort after the primary effect has been confirmed, so
//! a lost audit row never invalidates the operation it describes.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Audit log entry model
//! - **Related ADRs:** ADR-119: Memory Audit Trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::memory::MemoryTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOperation {
    Insert,
    Search,
    Compound,
    Decay,
    Cleanup,
}

impl AuditOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOperation::Insert => "insert",
            AuditOperation::Search => "search",
            AuditOperation::Compound => "compound",
            AuditOperation::Decay => "decay",
            AuditOperation::Cleanup => "cleanup",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Failure,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Success => "success",
            AuditStatus::Failure => "failure",
        }
    }
}

/// One row in the audit log. Never updated or deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub operation: AuditOperation,
    pub table_name: Option<String>,
    pub memory_id: Option<i64>,
    pub user_id: Option<String>,
    pub status: AuditStatus,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(operation: AuditOperation, status: AuditStatus) -> Self {
        Self {
            operation,
            table_name: None,
            memory_id: None,
            user_id: None,
            status,
            details: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn success(operation: AuditOperation) -> Self {
        Self::new(operation, AuditStatus::Success)
    }

    pub fn with_tier(mut self, tier: MemoryTier) -> Self {
        self.table_name = Some(tier.table_name().to_string());
        self
    }

    pub fn with_memory_id(mut self, id: i64) -> Self {
        self.memory_id = Some(id);
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let entry = AuditEntry::success(AuditOperation::Insert)
            .with_tier(MemoryTier::Long)
            .with_memory_id(7)
            .with_user("u1")
            .with_details(serde_json::json!({"kind": "fact"}));

        assert_eq!(entry.operation, AuditOperation::Insert);
        assert_eq!(entry.table_name.as_deref(), Some("long_term_memories"));
        assert_eq!(entry.memory_id, Some(7));
        assert_eq!(entry.user_id.as_deref(), Some("u1"));
        assert_eq!(entry.status, AuditStatus::Success);
    }
}
