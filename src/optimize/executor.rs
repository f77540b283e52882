// src/optimize/executor.rs
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ExecutorConfig, ExecutorKind};
use crate::optimize::strategy::Strategy;

/// Carries out the side effect of one strategy.
#[async_trait::async_trait]
pub trait ActionExecutor: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, strategy: &Strategy) -> Result<()>;
}

/// Command body sent to the campaign management endpoint.
#[derive(Debug, Serialize)]
pub struct ActionCommand<'a> {
    pub target: &'a str,
    pub action: &'a str,
    pub expected_impact: f64,
    pub rank: usize,
    pub issued_at: DateTime<Utc>,
}

impl<'a> ActionCommand<'a> {
    pub fn from_strategy(s: &'a Strategy, issued_at: DateTime<Utc>) -> Self {
        Self {
            target: &s.target,
            action: &s.action,
            expected_impact: s.expected_impact,
            rank: s.rank,
            issued_at,
        }
    }
}

/// Dry run: logs the command and succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogExecutor;

#[async_trait::async_trait]
impl ActionExecutor for LogExecutor {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn execute(&self, strategy: &Strategy) -> Result<()> {
        tracing::info!(
            target_area = %strategy.target,
            action = %strategy.action,
            expected_impact = strategy.expected_impact,
            rank = strategy.rank,
            "dry-run action"
        );
        Ok(())
    }
}

/// POSTs an `ActionCommand` per strategy; any non-2xx is a failure.
#[derive(Clone)]
pub struct HttpExecutor {
    endpoint: String,
    client: Client,
    timeout: Duration,
}

impl HttpExecutor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl ActionExecutor for HttpExecutor {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn execute(&self, strategy: &Strategy) -> Result<()> {
        let cmd = ActionCommand::from_strategy(strategy, Utc::now());
        let resp = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&cmd)
            .send()
            .await
            .context("action endpoint request")?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("action endpoint HTTP {}", status.as_u16()));
        }
        Ok(())
    }
}

pub fn from_config(cfg: &ExecutorConfig) -> Result<Arc<dyn ActionExecutor>> {
    Ok(match cfg.kind {
        ExecutorKind::Log => Arc::new(LogExecutor),
        ExecutorKind::Http => {
            let endpoint = cfg
                .endpoint
                .clone()
                .ok_or_else(|| anyhow!("executor.endpoint missing"))?;
            Arc::new(HttpExecutor::new(endpoint).with_timeout(Duration::from_millis(cfg.timeout_ms)))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn command_shape() {
        let mut s = Strategy::new("traffic", "increase_budget", 0.3);
        s.rank = 2;
        let ts = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
        let v = serde_json::to_value(ActionCommand::from_strategy(&s, ts)).unwrap();
        assert_eq!(v["target"], "traffic");
        assert_eq!(v["action"], "increase_budget");
        assert_eq!(v["rank"], 2);
        assert_eq!(v["issued_at"], "2025-09-06T09:00:00Z");
    }

    #[tokio::test]
    async fn log_executor_always_succeeds() {
        assert!(LogExecutor
            .execute(&Strategy::new("spend", "reduce_budget", 0.2))
            .await
            .is_ok());
    }
}
