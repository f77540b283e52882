// src/collect/providers/html_scrape.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use super::{fetch_body, required_url};
use crate::collect::types::{SourceProvider, SourceRecord};
use crate::config::SourceConfig;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>|</?[^>]+>").unwrap()
});
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Scrapes an affiliate stats page. Each field is a regex applied to the
/// visible page text; the first capture group is the value.
pub struct HtmlScrapeSource {
    name: String,
    url: String,
    fields: Vec<(String, Regex)>,
    timeout: Option<Duration>,
    client: Client,
}

impl HtmlScrapeSource {
    pub fn from_config(cfg: &SourceConfig, client: Client) -> Result<Self> {
        let fields = cfg
            .fields
            .iter()
            .map(|(k, pat)| {
                Regex::new(pat)
                    .with_context(|| format!("source '{}': invalid regex for '{k}'", cfg.name))
                    .map(|re| (k.clone(), re))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            name: cfg.name.clone(),
            url: required_url(cfg)?,
            fields,
            timeout: cfg.timeout_ms.map(Duration::from_millis),
            client,
        })
    }
}

/// Decode entities, drop tags, collapse whitespace.
pub fn visible_text(html: &str) -> String {
    let stripped = RE_TAGS.replace_all(html, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    RE_WS.replace_all(&decoded, " ").trim().to_string()
}

pub fn scrape_record(html: &str, fields: &[(String, Regex)]) -> SourceRecord {
    let text = visible_text(html);
    let mut out = SourceRecord::new();
    for (key, re) in fields {
        if let Some(m) = re.captures(&text).and_then(|c| c.get(1)) {
            out.insert(key.clone(), Value::String(m.as_str().trim().to_string()));
        }
    }
    out
}

#[async_trait]
impl SourceProvider for HtmlScrapeSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn fetch(&self) -> Result<SourceRecord> {
        let body = fetch_body(&self.client, &self.url).await?;
        Ok(scrape_record(&body, &self.fields))
    }
}
