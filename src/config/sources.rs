// src/config/sources.rs
//! Declarative per-source extraction schema.
//!
//! `fields` maps a record key to an extraction rule:
//! - `json` sources: a JSON pointer into the response body (`/data/clicks`)
//! - `html` sources: a regex whose first capture group holds the value

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Json,
    Html,
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    #[serde(default)]
    pub url: Option<String>,
    /// Overrides `collector.default_timeout_ms` for this source.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Fixed record for `static` sources.
    #[serde(default)]
    pub record: BTreeMap<String, serde_json::Value>,
}

impl SourceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("source name must not be empty");
        }
        if self.timeout_ms == Some(0) {
            bail!("source '{}': timeout_ms must be > 0", self.name);
        }
        match self.kind {
            SourceKind::Json | SourceKind::Html => {
                if self.url.as_deref().map(str::trim).unwrap_or_default().is_empty() {
                    bail!("source '{}': url is required", self.name);
                }
                if self.fields.is_empty() {
                    bail!("source '{}': at least one field is required", self.name);
                }
            }
            SourceKind::Static => {
                if self.record.is_empty() {
                    bail!("static source '{}': record must not be empty", self.name);
                }
            }
        }
        for (key, rule) in &self.fields {
            match self.kind {
                SourceKind::Json if !rule.starts_with('/') => {
                    bail!(
                        "source '{}': field '{key}' must be a JSON pointer starting with '/'",
                        self.name
                    );
                }
                SourceKind::Html => {
                    let re = regex::Regex::new(rule).with_context(|| {
                        format!("source '{}': invalid regex for field '{key}'", self.name)
                    })?;
                    if re.captures_len() < 2 {
                        bail!(
                            "source '{}': regex for field '{key}' needs a capture group",
                            self.name
                        );
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}
