// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! HTTP client for delegating CLI commands to a running memory daemon.

use anyhow::{bail, Context, Result};
use serde_json::Value;

pub struct DaemonClient {
    base_url: String,
    client: reqwest::Client,
}

impl DaemonClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            base_url: format!("http://{}:{}", host, port),
            client: reqwest::Client::new(),
        }
    }

    pub async fn health(&self) -> Result<Value> {
        self.get("/health").await
    }

    pub async fn save(&self, payload: Value) -> Result<Value> {
        self.post("/api/memory", payload).await
    }

    pub async fn search(&self, payload: Value) -> Result<Value> {
        self.post("/api/memory/search", payload).await
    }

    pub async fn stats(&self, user_id: Option<&str>, duration: Option<&str>) -> Result<Value> {
        let mut path = "/api/memory/stats".to_string();
        let mut params = Vec::new();
        if let Some(user_id) = user_id {
            params.push(format!("user_id={}", user_id));
        }
        if let Some(duration) = duration {
            params.push(format!("duration={}", duration));
        }
        if !params.is_empty() {
            path = format!("{}?{}", path, params.join("&"));
        }
        self.get(&path).await
    }

    pub async fn show(&self, tier: &str, id: i64) -> Result<Value> {
        self.get(&format!("/api/memory/{}/{}", tier, id)).await
    }

    pub async fn cleanup(&self, dry_run: bool) -> Result<Value> {
        self.post("/api/admin/cleanup", serde_json::json!({ "dry_run": dry_run }))
            .await
    }

    pub async fn compound(&self, user_id: &str, threshold: Option<f64>) -> Result<Value> {
        self.post(
            "/api/admin/compound",
            serde_json::json!({ "user_id": user_id, "threshold": threshold }),
        )
        .await
    }

    pub async fn decay(&self, dry_run: bool) -> Result<Value> {
        self.post("/api/admin/decay", serde_json::json!({ "dry_run": dry_run }))
            .await
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .context("Is the memory daemon running? (l9mem --daemon)")?;
        Self::into_json(response).await
    }

    async fn post(&self, path: &str, payload: Value) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&payload)
            .send()
            .await
            .context("Is the memory daemon running? (l9mem --daemon)")?;
        Self::into_json(response).await
    }

    async fn into_json(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .unwrap_or(Value::Null);

        if !status.is_success() {
            let message = body["error"].as_str().unwrap_or("unknown error");
            bail!("Daemon returned {}: {}", status, message);
        }
        Ok(body)
    }
}
