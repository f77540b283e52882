// src/collect/providers/http_json.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::{fetch_body, required_url};
use crate::collect::types::{SourceProvider, SourceRecord};
use crate::config::SourceConfig;

/// Polls a JSON API and picks record fields out of the body by JSON pointer.
pub struct HttpJsonSource {
    name: String,
    url: String,
    /// (record key, JSON pointer)
    fields: Vec<(String, String)>,
    timeout: Option<Duration>,
    client: Client,
}

impl HttpJsonSource {
    pub fn from_config(cfg: &SourceConfig, client: Client) -> Result<Self> {
        Ok(Self {
            name: cfg.name.clone(),
            url: required_url(cfg)?,
            fields: cfg
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            timeout: cfg.timeout_ms.map(Duration::from_millis),
            client,
        })
    }

    fn extract(&self, body: &str) -> Result<SourceRecord> {
        let payload: Value = serde_json::from_str(body)
            .with_context(|| format!("{}: malformed JSON payload", self.name))?;
        Ok(extract_pointers(&payload, &self.fields))
    }
}

/// Fields whose pointer does not resolve are left out of the record.
pub fn extract_pointers(payload: &Value, fields: &[(String, String)]) -> SourceRecord {
    let mut out = SourceRecord::new();
    for (key, pointer) in fields {
        match payload.pointer(pointer) {
            Some(v) => {
                out.insert(key.clone(), v.clone());
            }
            None => tracing::debug!(field = %key, pointer = %pointer, "pointer not found"),
        }
    }
    out
}

#[async_trait]
impl SourceProvider for HttpJsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn fetch(&self) -> Result<SourceRecord> {
        let body = fetch_body(&self.client, &self.url).await?;
        self.extract(&body)
    }
}
