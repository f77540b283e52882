// src/config/mod.rs
//! Application configuration: sources, thresholds, executor, reporter, scheduler.
//!
//! Resolution order for `load_default()`:
//! 1) $OPTIMIZER_CONFIG_PATH (must exist)
//! 2) config/optimizer.toml
//! 3) config/optimizer.json
//! 4) built-in defaults (no sources)

pub mod sources;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use crate::optimize::rules::Thresholds;
use crate::report::dashboard::MAX_ATTEMPTS;
pub use sources::{SourceConfig, SourceKind};

pub const ENV_CONFIG_PATH: &str = "OPTIMIZER_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/optimizer.toml";
pub const DEFAULT_JSON_PATH: &str = "config/optimizer.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub collector: CollectorConfig,
    pub sources: Vec<SourceConfig>,
    pub optimizer: OptimizerConfig,
    pub executor: ExecutorConfig,
    pub reporter: ReporterConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Upper bound for one source fetch unless the source overrides it.
    pub default_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 5_000,
            user_agent: "Mozilla/5.0 (compatible; affiliate-optimizer/0.1)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    #[serde(flatten)]
    pub thresholds: Thresholds,
    /// Apply at most this many strategies per cycle (0 = all).
    pub max_actions: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// Dry run: commands are logged, nothing is sent.
    #[default]
    Log,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub kind: ExecutorKind,
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            kind: ExecutorKind::Log,
            endpoint: None,
            timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    pub dashboard_url: Option<String>,
    /// Bearer token; "ENV" means read from $DASHBOARD_TOKEN.
    pub dashboard_token: Option<String>,
    /// Slack webhook; "ENV" means read from $SLACK_WEBHOOK_URL.
    pub slack_webhook: Option<String>,
    pub timeout_ms: u64,
    pub retries: u8,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            dashboard_url: None,
            dashboard_token: None,
            slack_webhook: None,
            timeout_ms: 5_000,
            retries: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3_600,
        }
    }
}

impl AppConfig {
    /// Load from an explicit path. Supports TOML or JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.finalize()
    }

    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            bail!("{ENV_CONFIG_PATH} points to non-existent path");
        }
        let toml_p = PathBuf::from(DEFAULT_TOML_PATH);
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from(DEFAULT_JSON_PATH);
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        tracing::warn!("no optimizer config found, running with defaults (no sources)");
        Self::default().finalize()
    }

    /// Resolve "ENV" secrets and validate.
    fn finalize(mut self) -> Result<Self> {
        self.reporter.dashboard_token =
            resolve_secret(self.reporter.dashboard_token.take(), "DASHBOARD_TOKEN")?;
        self.reporter.slack_webhook =
            resolve_secret(self.reporter.slack_webhook.take(), "SLACK_WEBHOOK_URL")?;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.collector.default_timeout_ms == 0 {
            bail!("collector.default_timeout_ms must be > 0");
        }
        let mut seen = std::collections::BTreeSet::new();
        for s in &self.sources {
            s.validate()?;
            if !seen.insert(s.name.as_str()) {
                bail!("duplicate source name '{}'", s.name);
            }
        }
        if self.executor.kind == ExecutorKind::Http && self.executor.endpoint.is_none() {
            bail!("executor.kind = \"http\" requires executor.endpoint");
        }
        if self.executor.timeout_ms == 0 || self.reporter.timeout_ms == 0 {
            bail!("executor/reporter timeout_ms must be > 0");
        }
        if !(1..=MAX_ATTEMPTS).contains(&self.reporter.retries) {
            bail!("reporter.retries must be between 1 and {MAX_ATTEMPTS}");
        }
        if self.scheduler.interval_secs == 0 {
            bail!("scheduler.interval_secs must be > 0");
        }
        Ok(())
    }
}

fn resolve_secret(value: Option<String>, env_key: &str) -> Result<Option<String>> {
    match value {
        Some(v) if v.trim().eq_ignore_ascii_case("env") => std::env::var(env_key)
            .map(Some)
            .map_err(|_| anyhow!("Missing {env_key} env var")),
        Some(v) if v.trim().is_empty() => Ok(None),
        other => Ok(other),
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig> {
    match hint_ext {
        "toml" => Ok(toml::from_str(s)?),
        "json" => Ok(serde_json::from_str(s)?),
        _ => {
            if let Ok(v) = serde_json::from_str(s) {
                return Ok(v);
            }
            toml::from_str(s).map_err(|e| anyhow!("unsupported config format: {e}"))
        }
    }
}
