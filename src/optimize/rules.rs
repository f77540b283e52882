// src/optimize/rules.rs
//! Strategy rules: metric thresholds → candidate actions.
//!
//! A rule whose metric is missing from the summary is skipped; an unknown
//! metric is never treated as zero.

use serde::{Deserialize, Serialize};

use crate::analyze::catalog::{
    CLICKS, CLICK_THROUGH_RATE, CONVERSION_RATE, EARNINGS_PER_CLICK, ENGAGEMENT_RATE,
    RETURN_ON_SPEND,
};
use crate::analyze::MetricsSummary;
use crate::optimize::strategy::Strategy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub min_ctr: f64,
    pub min_conversion_rate: f64,
    /// Above this, traffic converts well enough to buy more of it.
    pub strong_conversion_rate: f64,
    pub min_engagement_rate: f64,
    pub min_earnings_per_click: f64,
    pub target_return_on_spend: f64,
    pub min_clicks: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_ctr: 0.01,
            min_conversion_rate: 0.02,
            strong_conversion_rate: 0.05,
            min_engagement_rate: 0.03,
            min_earnings_per_click: 0.25,
            target_return_on_spend: 0.5,
            min_clicks: 1_000.0,
        }
    }
}

type Rule = fn(&MetricsSummary, &Thresholds) -> Option<Strategy>;

const RULES: &[Rule] = &[
    low_ctr,
    low_conversion,
    strong_conversion,
    low_engagement,
    low_epc,
    negative_return,
    strong_return,
    thin_traffic,
];

/// Unordered candidates; zero-impact ones are dropped.
pub fn candidates(summary: &MetricsSummary, th: &Thresholds) -> Vec<Strategy> {
    RULES
        .iter()
        .filter_map(|rule| rule(summary, th))
        .filter(|s| s.expected_impact > 0.0)
        .collect()
}

/// Relative gap below a floor, e.g. 0.01 vs floor 0.02 → 0.5.
fn shortfall(value: f64, floor: f64) -> Option<f64> {
    (floor > 0.0 && value < floor).then(|| (floor - value) / floor)
}

/// Relative gap above a ceiling.
fn excess(value: f64, ceiling: f64) -> Option<f64> {
    (ceiling > 0.0 && value > ceiling).then(|| (value - ceiling) / ceiling)
}

fn below(
    summary: &MetricsSummary,
    metric: &str,
    floor: f64,
    target: &str,
    action: &str,
) -> Option<Strategy> {
    let v = summary.get(metric)?;
    let gap = shortfall(v, floor)?;
    Some(Strategy::new(target, action, gap).with_rationale(format!("{metric} {v:.3} < {floor:.3}")))
}

fn low_ctr(s: &MetricsSummary, th: &Thresholds) -> Option<Strategy> {
    below(s, CLICK_THROUGH_RATE, th.min_ctr, "traffic", "refresh_creatives")
}

fn low_conversion(s: &MetricsSummary, th: &Thresholds) -> Option<Strategy> {
    below(
        s,
        CONVERSION_RATE,
        th.min_conversion_rate,
        "conversion",
        "optimize_landing_pages",
    )
}

fn strong_conversion(s: &MetricsSummary, th: &Thresholds) -> Option<Strategy> {
    let v = s.get(CONVERSION_RATE)?;
    let gap = excess(v, th.strong_conversion_rate)?;
    Some(
        Strategy::new("traffic", "increase_budget", gap * 0.5).with_rationale(format!(
            "{CONVERSION_RATE} {v:.3} > {:.3}",
            th.strong_conversion_rate
        )),
    )
}

fn low_engagement(s: &MetricsSummary, th: &Thresholds) -> Option<Strategy> {
    below(
        s,
        ENGAGEMENT_RATE,
        th.min_engagement_rate,
        "engagement",
        "boost_social_content",
    )
}

fn low_epc(s: &MetricsSummary, th: &Thresholds) -> Option<Strategy> {
    below(
        s,
        EARNINGS_PER_CLICK,
        th.min_earnings_per_click,
        "monetization",
        "renegotiate_commission",
    )
}

fn negative_return(s: &MetricsSummary, _th: &Thresholds) -> Option<Strategy> {
    let v = s.get(RETURN_ON_SPEND)?;
    (v < 0.0).then(|| {
        Strategy::new("spend", "reduce_budget", (-v).min(1.0))
            .with_rationale(format!("{RETURN_ON_SPEND} {v:.3} < 0"))
    })
}

fn strong_return(s: &MetricsSummary, th: &Thresholds) -> Option<Strategy> {
    let v = s.get(RETURN_ON_SPEND)?;
    let gap = excess(v, th.target_return_on_spend)?;
    Some(
        Strategy::new("spend", "increase_budget", gap * 0.5).with_rationale(format!(
            "{RETURN_ON_SPEND} {v:.3} > {:.3}",
            th.target_return_on_spend
        )),
    )
}

fn thin_traffic(s: &MetricsSummary, th: &Thresholds) -> Option<Strategy> {
    below(s, CLICKS, th.min_clicks, "traffic", "scale_traffic")
}
