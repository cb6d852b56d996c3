// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # L9 Tiered Memory Substrate
//!
//! Stores short/medium/long-term memories with vector embeddings,
//! searches across tiers, merges near-duplicates (compounding) and applies
//! exponential importance decay over time, against PostgreSQL + pgvector.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Library root for the memory substrate
//! - **Related ADRs:** ADR-118: Tiered Memory Substrate

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use config::MemoryConfig;
pub use domain::*;
