// src/collect/mod.rs
pub mod providers;
pub mod types;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::error::PipelineError;
pub use types::{CollectionResult, SourceProvider, SourceRecord};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "collect_sources_ok_total",
            "Sources that returned a usable record."
        );
        describe_counter!(
            "collect_source_errors_total",
            "Source fetch/parse errors and timeouts."
        );
        describe_histogram!("collect_fetch_ms", "Per-source fetch time in milliseconds.");
    });
}

/// Pulls one record per configured source. Sources are fetched concurrently,
/// each under its own timeout; the result is built after every fetch has
/// returned or timed out.
pub struct Collector {
    providers: Vec<Arc<dyn SourceProvider>>,
    default_timeout: Duration,
}

impl Collector {
    pub fn new(providers: Vec<Arc<dyn SourceProvider>>, default_timeout: Duration) -> Self {
        Self {
            providers,
            default_timeout,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let client = providers::http_client(&cfg.collector)?;
        let providers = cfg
            .sources
            .iter()
            .map(|s| providers::build(s, &client))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self::new(
            providers,
            Duration::from_millis(cfg.collector.default_timeout_ms),
        ))
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Fails only when no source produced a record.
    pub async fn collect(&self) -> Result<CollectionResult, PipelineError> {
        ensure_metrics_described();

        let mut handles = Vec::with_capacity(self.providers.len());
        for p in &self.providers {
            let provider = Arc::clone(p);
            let limit = provider.timeout().unwrap_or(self.default_timeout);
            let handle = tokio::spawn(async move {
                let t0 = Instant::now();
                let res = tokio::time::timeout(limit, provider.fetch()).await;
                (res, limit, t0.elapsed())
            });
            handles.push((p.name().to_string(), handle));
        }

        let mut records = BTreeMap::new();
        let mut failures = Vec::new();
        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok((Ok(Ok(record)), _, elapsed)) if record.is_empty() => {
                    histogram!("collect_fetch_ms").record(elapsed.as_secs_f64() * 1_000.0);
                    Err("payload yielded no fields".to_string())
                }
                Ok((Ok(Ok(record)), _, elapsed)) => {
                    histogram!("collect_fetch_ms").record(elapsed.as_secs_f64() * 1_000.0);
                    tracing::debug!(
                        source = %name,
                        fields = record.len(),
                        duration_ms = elapsed.as_millis() as u64,
                        "source collected"
                    );
                    Ok(record)
                }
                Ok((Ok(Err(e)), _, _)) => Err(format!("{e:#}")),
                Ok((Err(_elapsed), limit, _)) => {
                    Err(format!("timed out after {}ms", limit.as_millis()))
                }
                Err(join_err) => Err(format!("fetch task failed: {join_err}")),
            };

            match outcome {
                Ok(record) => {
                    counter!("collect_sources_ok_total").increment(1);
                    records.insert(name, record);
                }
                Err(reason) => {
                    tracing::warn!(source = %name, error = %reason, "source unavailable");
                    counter!("collect_source_errors_total").increment(1);
                    failures.push(PipelineError::source_unavailable(name, reason));
                }
            }
        }

        if records.is_empty() {
            return Err(PipelineError::NoDataAvailable {
                attempted: self.providers.len(),
            });
        }
        Ok(CollectionResult::new(records, failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::providers::fixture::StaticSource;
    use anyhow::anyhow;
    use serde_json::json;

    struct Broken;

    #[async_trait::async_trait]
    impl SourceProvider for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        async fn fetch(&self) -> anyhow::Result<SourceRecord> {
            Err(anyhow!("HTTP 503"))
        }
    }

    fn website() -> Arc<dyn SourceProvider> {
        Arc::new(StaticSource::new(
            "website",
            [("clicks".to_string(), json!(100))].into_iter().collect(),
        ))
    }

    #[tokio::test]
    async fn one_failure_is_omitted_and_recorded() {
        let c = Collector::new(vec![website(), Arc::new(Broken)], Duration::from_secs(1));
        let out = c.collect().await.unwrap();
        assert_eq!(out.len(), 1);
        assert!(out.get("website").is_some());
        assert!(out.get("broken").is_none());
        assert_eq!(out.failures().len(), 1);
        assert!(matches!(
            &out.failures()[0],
            PipelineError::SourceUnavailable { source_name, .. } if source_name == "broken"
        ));
    }

    #[tokio::test]
    async fn all_failures_mean_no_data() {
        let c = Collector::new(vec![Arc::new(Broken)], Duration::from_secs(1));
        let err = c.collect().await.unwrap_err();
        assert_eq!(err, PipelineError::NoDataAvailable { attempted: 1 });
    }

    #[tokio::test]
    async fn no_sources_means_no_data() {
        let c = Collector::new(Vec::new(), Duration::from_secs(1));
        assert_eq!(
            c.collect().await.unwrap_err(),
            PipelineError::NoDataAvailable { attempted: 0 }
        );
    }

    #[tokio::test]
    async fn empty_record_counts_as_failure() {
        let empty: Arc<dyn SourceProvider> = Arc::new(StaticSource::new("empty", SourceRecord::new()));
        let c = Collector::new(vec![website(), empty], Duration::from_secs(1));
        let out = c.collect().await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.failures().len(), 1);
    }
}
