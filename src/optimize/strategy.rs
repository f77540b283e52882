// src/optimize/strategy.rs
use serde::{Deserialize, Serialize};

/// A ranked, actionable recommendation derived from one cycle's metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Funnel area the action targets ("traffic", "conversion", "spend", ...).
    pub target: String,
    pub action: String,
    /// Estimated relative improvement in `[0.0, 1.0]`.
    pub expected_impact: f64,
    /// 1-based position after ordering.
    pub rank: usize,
    /// Human-readable trigger, e.g. "conversion_rate 0.012 < 0.020".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rationale: String,
}

impl Strategy {
    pub fn new(target: impl Into<String>, action: impl Into<String>, expected_impact: f64) -> Self {
        Self {
            target: target.into(),
            action: action.into(),
            expected_impact: expected_impact.clamp(0.0, 1.0),
            rank: 0,
            rationale: String::new(),
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    /// `"<action> on <target>"`, used in logs and notifications.
    pub fn label(&self) -> String {
        format!("{} on {}", self.action, self.target)
    }
}

/// Descending impact; ties by (target, action) ascending. Assigns ranks.
pub fn rank_strategies(mut items: Vec<Strategy>) -> Vec<Strategy> {
    items.sort_by(|a, b| {
        b.expected_impact
            .total_cmp(&a.expected_impact)
            .then_with(|| a.target.cmp(&b.target))
            .then_with(|| a.action.cmp(&b.action))
    });
    for (i, s) in items.iter_mut().enumerate() {
        s.rank = i + 1;
    }
    items
}
