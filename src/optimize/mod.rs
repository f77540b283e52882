// src/optimize/mod.rs
//! Strategy generation (pure) and application (side-effecting).

pub mod executor;
pub mod rules;
pub mod strategy;

use metrics::counter;
use serde::Serialize;
use std::sync::Arc;

use crate::analyze::MetricsSummary;
use crate::config::OptimizerConfig;
use crate::error::PipelineError;
pub use executor::{ActionExecutor, HttpExecutor, LogExecutor};
pub use rules::Thresholds;
pub use strategy::{rank_strategies, Strategy};

#[derive(Debug, Clone, Serialize)]
pub struct FailedStrategy {
    pub strategy: Strategy,
    pub error: PipelineError,
}

/// What `apply` did with each strategy it was handed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    pub applied: Vec<Strategy>,
    pub failed: Vec<FailedStrategy>,
    /// Left out because of `max_actions`.
    pub skipped: Vec<Strategy>,
}

impl ApplyReport {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

pub struct Optimizer {
    thresholds: Thresholds,
    max_actions: usize,
    executor: Arc<dyn ActionExecutor>,
}

impl Optimizer {
    pub fn new(thresholds: Thresholds, executor: Arc<dyn ActionExecutor>) -> Self {
        Self {
            thresholds,
            max_actions: 0,
            executor,
        }
    }

    pub fn from_config(cfg: &OptimizerConfig, executor: Arc<dyn ActionExecutor>) -> Self {
        Self::new(cfg.thresholds.clone(), executor).with_max_actions(cfg.max_actions)
    }

    /// 0 = no cap.
    pub fn with_max_actions(mut self, n: usize) -> Self {
        self.max_actions = n;
        self
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Same summary in, same ordered strategies out. An empty summary yields
    /// an empty list.
    pub fn generate(&self, summary: &MetricsSummary) -> Vec<Strategy> {
        rank_strategies(rules::candidates(summary, &self.thresholds))
    }

    /// Runs strategies in rank order. A failing strategy is recorded and
    /// skipped; the rest still run.
    pub async fn apply(&self, strategies: &[Strategy]) -> ApplyReport {
        let mut ordered: Vec<&Strategy> = strategies.iter().collect();
        ordered.sort_by_key(|s| s.rank);

        let mut report = ApplyReport::default();
        for (i, s) in ordered.into_iter().enumerate() {
            if self.max_actions > 0 && i >= self.max_actions {
                report.skipped.push(s.clone());
                continue;
            }
            match self.executor.execute(s).await {
                Ok(()) => {
                    tracing::info!(
                        executor = self.executor.name(),
                        rank = s.rank,
                        strategy = %s.label(),
                        "strategy applied"
                    );
                    counter!("strategies_applied_total").increment(1);
                    report.applied.push(s.clone());
                }
                Err(e) => {
                    let error = PipelineError::StrategyApplicationFailure {
                        target: s.target.clone(),
                        action: s.action.clone(),
                        reason: format!("{e:#}"),
                    };
                    tracing::warn!(
                        executor = self.executor.name(),
                        rank = s.rank,
                        error = %error,
                        "strategy application failed, continuing"
                    );
                    counter!("strategies_failed_total").increment(1);
                    report.failed.push(FailedStrategy {
                        strategy: s.clone(),
                        error,
                    });
                }
            }
        }
        report
    }
}
