// src/collect/providers/fixture.rs
use anyhow::Result;
use async_trait::async_trait;

use crate::collect::types::{SourceProvider, SourceRecord};

/// Returns a fixed record every cycle. Backs `kind = "static"` sources
/// (dry runs) and tests.
pub struct StaticSource {
    name: String,
    record: SourceRecord,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, record: SourceRecord) -> Self {
        Self {
            name: name.into(),
            record,
        }
    }
}

#[async_trait]
impl SourceProvider for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<SourceRecord> {
        Ok(self.record.clone())
    }
}
