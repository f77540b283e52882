// src/collect/types.rs
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::PipelineError;

/// Raw metric values one source produced for one cycle, keyed by field name.
/// Values stay as extracted; the analyzer decides what is numeric.
pub type SourceRecord = BTreeMap<String, serde_json::Value>;

/// Per-cycle collection: source name -> record, plus the sources that failed.
/// Frozen once the collector returns it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionResult {
    records: BTreeMap<String, SourceRecord>,
    failures: Vec<PipelineError>,
}

impl CollectionResult {
    pub fn new(records: BTreeMap<String, SourceRecord>, failures: Vec<PipelineError>) -> Self {
        Self { records, failures }
    }

    pub fn from_records<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = (S, SourceRecord)>,
        S: Into<String>,
    {
        Self {
            records: records.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            failures: Vec::new(),
        }
    }

    pub fn records(&self) -> &BTreeMap<String, SourceRecord> {
        &self.records
    }

    pub fn get(&self, source: &str) -> Option<&SourceRecord> {
        self.records.get(source)
    }

    /// Warnings recorded for sources that were omitted.
    pub fn failures(&self) -> &[PipelineError] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Per-source fetch limit; `None` falls back to the collector default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn fetch(&self) -> Result<SourceRecord>;
}
