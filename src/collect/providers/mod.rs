// src/collect/providers/mod.rs
pub mod fixture;
pub mod html_scrape;
pub mod http_json;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use std::sync::Arc;

use crate::collect::types::SourceProvider;
use crate::config::{sources::SourceKind, CollectorConfig, SourceConfig};

/// Shared HTTP client for all sources of one collector.
pub fn http_client(cfg: &CollectorConfig) -> Result<Client> {
    Client::builder()
        .user_agent(cfg.user_agent.clone())
        .build()
        .context("building source http client")
}

/// Build a provider from its declared schema.
pub fn build(cfg: &SourceConfig, client: &Client) -> Result<Arc<dyn SourceProvider>> {
    let provider: Arc<dyn SourceProvider> = match cfg.kind {
        SourceKind::Json => Arc::new(http_json::HttpJsonSource::from_config(cfg, client.clone())?),
        SourceKind::Html => Arc::new(html_scrape::HtmlScrapeSource::from_config(
            cfg,
            client.clone(),
        )?),
        SourceKind::Static => Arc::new(fixture::StaticSource::new(
            cfg.name.clone(),
            cfg.record.clone(),
        )),
    };
    Ok(provider)
}

/// GET `url` and return the body of a 2xx response.
pub(crate) async fn fetch_body(client: &Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(anyhow!("HTTP {} from {url}", status.as_u16()));
    }
    resp.text().await.context("reading response body")
}

pub(crate) fn required_url(cfg: &SourceConfig) -> Result<String> {
    cfg.url
        .clone()
        .ok_or_else(|| anyhow!("source '{}': url is required", cfg.name))
}
