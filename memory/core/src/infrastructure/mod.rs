// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure layer: connection pool, embedding clients, query
//! helpers and repository implementations.

pub mod db;
pub mod embedding;
pub mod query;
pub mod repositories;

pub use db::Database;
pub use embedding::{HashEmbeddingClient, OllamaEmbeddingClient};
pub use query::SqlPredicates;
