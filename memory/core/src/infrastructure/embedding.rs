// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Embedding Gateway Clients
//!
//! Two implementations of [`EmbeddingGateway`]:
//!
//! - [`OllamaEmbeddingClient`]: HTTP client for an Ollama-compatible
//!   `/api/embeddings` endpoint (sentence-transformers models per ADR-028).
//! - [`HashEmbeddingClient`]: deterministic hash-based vectors for
//!   development and tests; identical text always produces an identical
//!   vector, so similarity ranking stays meaningful without a provider.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements the embedding gateway contract
//! - **Related ADRs:** ADR-028: Embedding Model Selection

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::domain::repository::{EmbeddingError, EmbeddingGateway};

/// Deterministic hash-based embedding client.
pub struct HashEmbeddingClient {
    dimension: usize,
}

impl HashEmbeddingClient {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for HashEmbeddingClient {
    fn default() -> Self {
        // 384 dims to match all-MiniLM-L6-v2
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingGateway for HashEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        // One hash per 64-dim block so different texts diverge across the
        // whole vector, not just the first 64 components.
        let embedding: Vec<f32> = (0..self.dimension)
            .map(|i| {
                let mut hasher = DefaultHasher::new();
                text.hash(&mut hasher);
                (i / 64).hash(&mut hasher);
                let hash = hasher.finish();
                let bit = (hash >> (i % 64)) & 1;
                bit as f32
            })
            .collect();

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// HTTP client for an Ollama-compatible embedding endpoint.
pub struct OllamaEmbeddingClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbeddingClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingGateway for OllamaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/api/embeddings", self.endpoint.trim_end_matches('/'));
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EmbeddingError(format!(
                "embedding service returned {}",
                response.status()
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError(e.to_string()))?;

        if body.embedding.len() != self.dimension {
            return Err(EmbeddingError(format!(
                "expected {}-dim embedding, got {}",
                self.dimension,
                body.embedding.len()
            )));
        }

        Ok(body.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
