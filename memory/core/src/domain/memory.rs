// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Tiered Memory Domain Model (ADR-118)
//!
//! Core aggregates for the L9 memory substrate: a memory lives in exactly
//! one retention tier and is owned by its tier table row. Short and medium
//! tier rows always carry an expiry timestamp; long-term rows never do;
//! the repository layer enforces that invariant at construction time.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Memory entities, tier/kind/scope vocabulary, search types
//! - **Related ADRs:** ADR-118: Tiered Memory Substrate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::MemoryError;

/// Retention tier of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryTier {
    /// Hours-scale retention, always expires.
    Short,
    /// Day-scale retention, always expires.
    Medium,
    /// Durable, never expires; decays instead.
    Long,
}

impl MemoryTier {
    /// Table backing this tier in the relational store.
    pub fn table_name(&self) -> &'static str {
        match self {
            MemoryTier::Short => "short_term_memories",
            MemoryTier::Medium => "medium_term_memories",
            MemoryTier::Long => "long_term_memories",
        }
    }

    /// Short and medium tiers expire; long-term does not.
    pub fn is_ephemeral(&self) -> bool {
        !matches!(self, MemoryTier::Long)
    }

    pub fn all() -> [MemoryTier; 3] {
        [MemoryTier::Short, MemoryTier::Medium, MemoryTier::Long]
    }
}

impl fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemoryTier::Short => "short",
            MemoryTier::Medium => "medium",
            MemoryTier::Long => "long",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for MemoryTier {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(MemoryTier::Short),
            "medium" => Ok(MemoryTier::Medium),
            "long" => Ok(MemoryTier::Long),
            other => Err(MemoryError::Validation(format!(
                "Unknown memory tier: '{}' (expected short, medium or long)",
                other
            ))),
        }
    }
}

/// What kind of recollection a memory captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Preference,
    Fact,
    Context,
    Error,
    Success,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Preference => "preference",
            MemoryKind::Fact => "fact",
            MemoryKind::Context => "context",
            MemoryKind::Error => "error",
            MemoryKind::Success => "success",
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MemoryKind {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "preference" => Ok(MemoryKind::Preference),
            "fact" => Ok(MemoryKind::Fact),
            "context" => Ok(MemoryKind::Context),
            "error" => Ok(MemoryKind::Error),
            "success" => Ok(MemoryKind::Success),
            other => Err(MemoryError::Validation(format!(
                "Unknown memory kind: '{}'",
                other
            ))),
        }
    }
}

/// Visibility of a long-term memory to other callers' searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryScope {
    User,
    Project,
    Global,
}

impl MemoryScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryScope::User => "user",
            MemoryScope::Project => "project",
            MemoryScope::Global => "global",
        }
    }
}

impl fmt::Display for MemoryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MemoryScope {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MemoryScope::User),
            "project" => Ok(MemoryScope::Project),
            "global" => Ok(MemoryScope::Global),
            other => Err(MemoryError::Validation(format!(
                "Unknown memory scope: '{}'",
                other
            ))),
        }
    }
}

/// Which tiers a search or stats call fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierSelector {
    All,
    Short,
    Medium,
    Long,
}

impl TierSelector {
    pub fn tiers(&self) -> Vec<MemoryTier> {
        match self {
            TierSelector::All => MemoryTier::all().to_vec(),
            TierSelector::Short => vec![MemoryTier::Short],
            TierSelector::Medium => vec![MemoryTier::Medium],
            TierSelector::Long => vec![MemoryTier::Long],
        }
    }
}

impl Default for TierSelector {
    fn default() -> Self {
        TierSelector::All
    }
}

impl FromStr for TierSelector {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(TierSelector::All),
            "short" => Ok(TierSelector::Short),
            "medium" => Ok(TierSelector::Medium),
            "long" => Ok(TierSelector::Long),
            other => Err(MemoryError::Validation(format!(
                "Unknown tier selector: '{}' (expected short, medium, long or all)",
                other
            ))),
        }
    }
}

/// A persisted memory row. `id` is unique per tier table, not globally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: i64,
    pub tier: MemoryTier,
    pub user_id: String,
    pub content: String,
    pub kind: MemoryKind,
    /// Long-term only; `None` for ephemeral tiers.
    pub scope: Option<MemoryScope>,
    /// Nominally 0–1 but not hard-clamped on write.
    pub importance: f64,
    /// Owned by this row; never shared between memories.
    #[serde(skip)]
    pub embedding: Vec<f32>,
    /// Long-term only; empty for ephemeral tiers.
    pub tags: Vec<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    /// Long-term only.
    pub updated_at: Option<DateTime<Utc>>,
    /// Always set for short/medium rows, never for long-term rows.
    pub expires_at: Option<DateTime<Utc>>,
    /// Long-term only.
    pub last_accessed_at: Option<DateTime<Utc>>,
    /// Long-term only; ephemeral rows stay at 0.
    pub access_count: i64,
}

impl MemoryRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

/// Insert payload handed to a [`crate::domain::repository::MemoryStore`].
///
/// Built by the application layer, which owns the expiry computation:
/// ephemeral tiers get `expires_at` from the configured retention, long-term
/// never carries one.
#[derive(Debug, Clone)]
pub struct NewMemory {
    pub tier: MemoryTier,
    pub user_id: String,
    pub content: String,
    pub kind: MemoryKind,
    pub scope: Option<MemoryScope>,
    pub importance: f64,
    pub embedding: Vec<f32>,
    pub tags: Vec<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A search hit: the record plus its similarity to the query embedding,
/// expressed as `1 − distance` throughout the system.
#[derive(Debug, Clone)]
pub struct ScoredMemory {
    pub record: MemoryRecord,
    pub similarity: f64,
}

/// Per-tier aggregate returned by stats queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierStats {
    pub tier: MemoryTier,
    pub count: u64,
    pub avg_importance: f64,
}

/// Update applied to a long-term cluster primary when near-duplicates are
/// merged into it; `absorbed_ids` are hard-deleted in the same operation.
#[derive(Debug, Clone)]
pub struct ClusterMerge {
    pub primary_id: i64,
    pub importance: f64,
    pub access_count: i64,
    pub tags: Vec<String>,
    pub absorbed_ids: Vec<i64>,
    pub merged_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_round_trip() {
        for tier in MemoryTier::all() {
            let parsed: MemoryTier = tier.to_string().parse().unwrap();
            assert_eq!(parsed, tier);
        }
    }

    #[test]
    fn test_unknown_tier_is_validation_error() {
        let err = MemoryTier::from_str("weekly").unwrap_err();
        assert!(matches!(err, MemoryError::Validation(_)));
    }

    #[test]
    fn test_tier_selector_fan_out() {
        assert_eq!(TierSelector::All.tiers().len(), 3);
        assert_eq!(TierSelector::Long.tiers(), vec![MemoryTier::Long]);
        let parsed: TierSelector = "all".parse().unwrap();
        assert_eq!(parsed, TierSelector::All);
        assert!(TierSelector::from_str("everything").is_err());
    }

    #[test]
    fn test_ephemeral_tiers() {
        assert!(MemoryTier::Short.is_ephemeral());
        assert!(MemoryTier::Medium.is_ephemeral());
        assert!(!MemoryTier::Long.is_ephemeral());
    }

    #[test]
    fn test_expiry_check() {
        let now = Utc::now();
        let record = MemoryRecord {
            id: 1,
            tier: MemoryTier::Short,
            user_id: "u1".to_string(),
            content: "ephemeral".to_string(),
            kind: MemoryKind::Context,
            scope: None,
            importance: 1.0,
            embedding: vec![],
            tags: vec![],
            metadata: serde_json::json!({}),
            created_at: now,
            updated_at: None,
            expires_at: Some(now - chrono::Duration::minutes(1)),
            last_accessed_at: None,
            access_count: 0,
        };
        assert!(record.is_expired(now));
        assert!(!record.is_expired(now - chrono::Duration::minutes(2)));
    }
}
