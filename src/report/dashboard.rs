use anyhow::{anyhow, Result};
use reqwest::Client;
use std::time::Duration;

use super::{CycleSnapshot, ReportSink};

/// Pushes the cycle snapshot as JSON to the monitoring dashboard.
#[derive(Clone)]
pub struct DashboardSink {
    url: String,
    token: Option<String>,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DashboardSink {
    pub fn new(url: String) -> Self {
        Self {
            url,
            token: None,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout = Duration::from_millis(ms);
        self
    }

    /// Total attempts, clamped to `1..=MAX_ATTEMPTS`.
    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.clamp(1, MAX_ATTEMPTS);
        self
    }

    pub fn max_attempts(&self) -> u8 {
        self.max_retries
    }
}

/// Upper bound on push attempts per cycle.
pub const MAX_ATTEMPTS: u8 = 10;

/// Delay before retry `attempt + 1`: 200ms doubling, capped at 12.8s.
pub fn backoff(attempt: u8) -> Duration {
    let exp = u32::from(attempt.saturating_sub(1)).min(6);
    Duration::from_millis(200u64.saturating_mul(1u64 << exp))
}

#[async_trait::async_trait]
impl ReportSink for DashboardSink {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    async fn send(&self, snapshot: &CycleSnapshot<'_>) -> Result<()> {
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let mut req = self
                .client
                .post(&self.url)
                .timeout(self.timeout)
                .json(snapshot);
            if let Some(t) = &self.token {
                req = req.bearer_auth(t);
            }

            let err = match req.send().await {
                Ok(rsp) => match rsp.error_for_status_ref() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("dashboard HTTP error: {e}"),
                },
                Err(e) => anyhow!("dashboard request failed: {e}"),
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(attempt, error = %err, "dashboard push failed, retrying");
            tokio::time::sleep(backoff(attempt)).await;
        }
    }
}
