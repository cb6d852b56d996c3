// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Audit Log — ADR-119
//!
//! Append-only `memory_audit_log` table. Rows are only ever inserted;
//! there is no update or delete path in this repository by construction.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::audit::{AuditEntry, AuditOperation, AuditStatus};
use crate::domain::repository::{AuditLog, RepositoryError};

pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_operation(raw: &str) -> Result<AuditOperation, RepositoryError> {
    match raw {
        "insert" => Ok(AuditOperation::Insert),
        "search" => Ok(AuditOperation::Search),
        "compound" => Ok(AuditOperation::Compound),
        "decay" => Ok(AuditOperation::Decay),
        "cleanup" => Ok(AuditOperation::Cleanup),
        other => Err(RepositoryError::Serialization(format!(
            "Unknown audit operation in row: {}",
            other
        ))),
    }
}

fn parse_status(raw: &str) -> Result<AuditStatus, RepositoryError> {
    match raw {
        "success" => Ok(AuditStatus::Success),
        "failure" => Ok(AuditStatus::Failure),
        other => Err(RepositoryError::Serialization(format!(
            "Unknown audit status in row: {}",
            other
        ))),
    }
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    async fn append(&self, entry: AuditEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO memory_audit_log
                (operation, table_name, memory_id, user_id, status, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.operation.as_str())
        .bind(&entry.table_name)
        .bind(entry.memory_id)
        .bind(&entry.user_id)
        .bind(entry.status.as_str())
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to append audit entry: {}", e)))?;

        Ok(())
    }

    async fn find_recent(&self, limit: usize) -> Result<Vec<AuditEntry>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT operation, table_name, memory_id, user_id, status, details, created_at
            FROM memory_audit_log
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let operation: String = row.get("operation");
            let status: String = row.get("status");
            entries.push(AuditEntry {
                operation: parse_operation(&operation)?,
                table_name: row.get("table_name"),
                memory_id: row.get("memory_id"),
                user_id: row.get("user_id"),
                status: parse_status(&status)?,
                details: row.get("details"),
                created_at: row.get("created_at"),
            });
        }
        Ok(entries)
    }
}
