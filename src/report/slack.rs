use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

use super::{CycleSnapshot, ReportSink};

/// Posts a short cycle summary to a Slack incoming webhook.
pub struct SlackSink {
    webhook_url: String,
    client: Client,
    timeout: Duration,
}

impl SlackSink {
    pub fn new(url: String) -> Self {
        Self {
            webhook_url: url,
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout = Duration::from_millis(ms);
        self
    }
}

pub fn summary_text(snapshot: &CycleSnapshot<'_>) -> String {
    let top = snapshot
        .strategies
        .first()
        .map(|s| format!("{} ({:.0}%)", s.label(), s.expected_impact * 100.0))
        .unwrap_or_else(|| "nothing to optimize".to_string());
    let cr = snapshot
        .metrics
        .get("conversion_rate")
        .map(|v| format!("{:.2}%", v * 100.0))
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "*Affiliate cycle {}*\nConversion rate: {}\nStrategies: {}\nTop: {}\n@ {}",
        snapshot.cycle_id,
        cr,
        snapshot.strategies.len(),
        top,
        snapshot.generated_at.to_rfc3339()
    )
}

#[async_trait::async_trait]
impl ReportSink for SlackSink {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, snapshot: &CycleSnapshot<'_>) -> Result<()> {
        let body = serde_json::json!({ "text": summary_text(snapshot) });
        self.client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::MetricsSummary;
    use crate::optimize::{rank_strategies, Strategy};
    use chrono::{TimeZone, Utc};

    #[test]
    fn text_mentions_top_strategy_and_unknown_metrics() {
        let m = MetricsSummary::new();
        let strategies = rank_strategies(vec![Strategy::new("spend", "reduce_budget", 0.42)]);
        let s = CycleSnapshot {
            cycle_id: "c7",
            generated_at: Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap(),
            metrics: &m,
            strategies: &strategies,
        };
        let t = summary_text(&s);
        assert!(t.contains("cycle c7"));
        assert!(t.contains("Conversion rate: unknown"));
        assert!(t.contains("reduce_budget on spend (42%)"));
    }
}
