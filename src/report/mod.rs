// src/report/mod.rs
//! Best-effort reporting to external monitoring surfaces.
//! Sink failures are logged and returned in the outcome, never propagated.

pub mod dashboard;
pub mod slack;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;

use crate::analyze::MetricsSummary;
use crate::config::ReporterConfig;
use crate::error::PipelineError;
use crate::optimize::Strategy;

pub use dashboard::DashboardSink;
pub use slack::SlackSink;

/// Snapshot pushed to every sink.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSnapshot<'a> {
    pub cycle_id: &'a str,
    pub generated_at: DateTime<Utc>,
    pub metrics: &'a MetricsSummary,
    pub strategies: &'a [Strategy],
}

#[async_trait::async_trait]
pub trait ReportSink: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, snapshot: &CycleSnapshot<'_>) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReportOutcome {
    pub delivered: Vec<String>,
    pub failed: Vec<PipelineError>,
}

impl ReportOutcome {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fans one snapshot out to all configured sinks.
#[derive(Clone, Default)]
pub struct Reporter {
    sinks: Vec<Arc<dyn ReportSink>>,
}

impl Reporter {
    pub fn new(sinks: Vec<Arc<dyn ReportSink>>) -> Self {
        Self { sinks }
    }

    pub fn from_config(cfg: &ReporterConfig) -> Self {
        let mut sinks: Vec<Arc<dyn ReportSink>> = Vec::new();
        if let Some(url) = &cfg.dashboard_url {
            sinks.push(Arc::new(
                DashboardSink::new(url.clone())
                    .with_token(cfg.dashboard_token.clone())
                    .with_timeout(cfg.timeout_ms)
                    .with_retries(cfg.retries),
            ));
        }
        if let Some(hook) = &cfg.slack_webhook {
            sinks.push(Arc::new(SlackSink::new(hook.clone()).with_timeout(cfg.timeout_ms)));
        }
        if sinks.is_empty() {
            tracing::debug!("reporter has no sinks configured");
        }
        Self::new(sinks)
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }

    pub async fn report(
        &self,
        cycle_id: &str,
        metrics: &MetricsSummary,
        strategies: &[Strategy],
    ) -> ReportOutcome {
        let snapshot = CycleSnapshot {
            cycle_id,
            generated_at: Utc::now(),
            metrics,
            strategies,
        };
        let mut out = ReportOutcome::default();
        for sink in &self.sinks {
            match sink.send(&snapshot).await {
                Ok(()) => out.delivered.push(sink.name().to_string()),
                Err(e) => {
                    let err = PipelineError::ReportingFailure {
                        sink: sink.name().to_string(),
                        reason: format!("{e:#}"),
                    };
                    tracing::warn!(sink = sink.name(), error = %err, "report sink failed");
                    counter!("report_failures_total").increment(1);
                    out.failed.push(err);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct Down;

    #[async_trait::async_trait]
    impl ReportSink for Down {
        fn name(&self) -> &'static str {
            "down"
        }
        async fn send(&self, _s: &CycleSnapshot<'_>) -> anyhow::Result<()> {
            Err(anyhow!("connection refused"))
        }
    }

    struct Up;

    #[async_trait::async_trait]
    impl ReportSink for Up {
        fn name(&self) -> &'static str {
            "up"
        }
        async fn send(&self, _s: &CycleSnapshot<'_>) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failing_sink_does_not_block_others() {
        let r = Reporter::new(vec![Arc::new(Down), Arc::new(Up)]);
        let out = r.report("c1", &MetricsSummary::new(), &[]).await;
        assert_eq!(out.delivered, vec!["up".to_string()]);
        assert_eq!(out.failed.len(), 1);
        assert!(!out.is_ok());
    }

    #[tokio::test]
    async fn no_sinks_is_a_clean_noop() {
        let out = Reporter::from_config(&ReporterConfig::default())
            .report("c1", &MetricsSummary::new(), &[])
            .await;
        assert!(out.is_ok());
        assert!(out.delivered.is_empty());
    }

    #[test]
    fn snapshot_shape() {
        let m: MetricsSummary = [("clicks", 150.0)].into_iter().collect();
        let s = CycleSnapshot {
            cycle_id: "c1",
            generated_at: Utc::now(),
            metrics: &m,
            strategies: &[],
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["cycle_id"], "c1");
        assert_eq!(v["metrics"]["clicks"], 150.0);
        assert!(v["strategies"].as_array().unwrap().is_empty());
    }
}
