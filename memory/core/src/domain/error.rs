// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Service-level error taxonomy for the memory substrate.
//!
//! Validation errors surface immediately to the caller with no partial
//! write; everything else collapses to a generic failure carrying the
//! underlying message (no finer error codes are defined at the boundary).

use thiserror::Error;

use crate::domain::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Embedding gateway error: {0}")]
    Embedding(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl MemoryError {
    /// True for caller mistakes that map to a 400-class response.
    pub fn is_validation(&self) -> bool {
        matches!(self, MemoryError::Validation(_))
    }
}
