// src/analyze/mod.rs
//! Metric aggregation: heterogeneous source records → one `MetricsSummary`.
//!
//! Two passes:
//! 1) `normalize` turns every record into a row of canonical metrics
//!    (aliases resolved, values coerced, malformed fields dropped per source).
//! 2) `aggregate` applies the catalogue rule of each metric across rows.
//!
//! Metrics without contributing data are left out of the summary, never
//! zero-filled.

pub mod catalog;
pub mod coerce;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::collect::CollectionResult;
use crate::error::PipelineError;
use catalog::{Combine, MetricRule, CATALOG};

/// Canonical metric name → aggregated value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsSummary(BTreeMap<String, f64>);

impl MetricsSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.0.get(metric).copied()
    }

    pub fn contains(&self, metric: &str) -> bool {
        self.0.contains_key(metric)
    }

    pub fn insert(&mut self, metric: impl Into<String>, value: f64) {
        self.0.insert(metric.into(), value);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for MetricsSummary {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A field removed during normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedField {
    pub source: String,
    pub field: String,
    pub reason: String,
}

/// Tabular view of one collection: one row per source, one column per
/// canonical metric.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: BTreeMap<String, BTreeMap<&'static str, f64>>,
    dropped: Vec<DroppedField>,
}

impl Dataset {
    pub fn rows(&self) -> &BTreeMap<String, BTreeMap<&'static str, f64>> {
        &self.rows
    }

    pub fn dropped(&self) -> &[DroppedField] {
        &self.dropped
    }

    fn column(&self, metric: &str) -> impl Iterator<Item = (&BTreeMap<&'static str, f64>, Option<f64>)> + '_ {
        let metric = metric.to_string();
        self.rows.values().map(move |row| (row, row.get(metric.as_str()).copied()))
    }
}

pub fn normalize(collection: &CollectionResult) -> Dataset {
    let mut ds = Dataset::default();
    for (source, record) in collection.records() {
        let mut row = BTreeMap::new();
        for (field, raw) in record {
            let Some(metric) = catalog::canonical_name(field) else {
                tracing::debug!(source = %source, field = %field, "field has no canonical metric");
                continue;
            };
            let rule = catalog::rule_for(metric);
            let value = coerce::to_number(raw).and_then(|v| {
                if v < 0.0 && !rule.is_some_and(MetricRule::allows_negative) {
                    Err(format!("negative value {v}"))
                } else {
                    Ok(v)
                }
            });
            match value {
                Ok(v) => {
                    if row.insert(metric, v).is_some() {
                        tracing::debug!(source = %source, metric, "duplicate field for metric, last wins");
                    }
                }
                Err(reason) => {
                    tracing::warn!(source = %source, field = %field, error = %reason, "dropping malformed field");
                    ds.dropped.push(DroppedField {
                        source: source.clone(),
                        field: field.clone(),
                        reason,
                    });
                }
            }
        }
        ds.rows.insert(source.clone(), row);
    }
    ds
}

pub fn aggregate(ds: &Dataset) -> MetricsSummary {
    let mut out = MetricsSummary::new();
    for rule in CATALOG {
        if let Some(v) = combine(ds, rule) {
            out.insert(rule.name, v);
        }
    }
    out
}

fn combine(ds: &Dataset, rule: &MetricRule) -> Option<f64> {
    match rule.combine {
        Combine::Sum => {
            let vals: Vec<f64> = ds.column(rule.name).filter_map(|(_, v)| v).collect();
            (!vals.is_empty()).then(|| vals.iter().sum())
        }
        Combine::Rate {
            numerator,
            denominator,
        } => weighted_mean(ds.column(rule.name).filter_map(|(row, reported)| {
            per_source_ratio(row, reported, numerator, denominator, |n, d| n / d)
        })),
        Combine::NetReturn { gain, spend } => net_return(ds, rule.name, gain, spend),
    }
}

/// Derived from the summed totals when spend is positive and some gain is
/// known; otherwise the mean of directly reported values.
fn net_return(ds: &Dataset, metric: &str, gain: &str, spend: &str) -> Option<f64> {
    let gains: Vec<f64> = ds.column(gain).filter_map(|(_, v)| v).collect();
    let spent: f64 = ds.column(spend).filter_map(|(_, v)| v).sum();
    if !gains.is_empty() && spent > 0.0 {
        let earned: f64 = gains.iter().sum();
        return Some((earned - spent) / spent);
    }
    weighted_mean(ds.column(metric).filter_map(|(_, v)| v.map(|v| (v, None))))
}

/// One source's contribution: its reported value or one derived from the
/// two parts, weighted by the denominator volume when that is known.
fn per_source_ratio(
    row: &BTreeMap<&'static str, f64>,
    reported: Option<f64>,
    numerator: &str,
    denominator: &str,
    derive: impl Fn(f64, f64) -> f64,
) -> Option<(f64, Option<f64>)> {
    let volume = row.get(denominator).copied().filter(|d| *d > 0.0);
    if let Some(v) = reported {
        return Some((v, volume));
    }
    let n = row.get(numerator).copied()?;
    let d = volume?;
    Some((derive(n, d), Some(d)))
}

/// Weighted by volume when every contributor has one, simple mean otherwise.
fn weighted_mean(items: impl Iterator<Item = (f64, Option<f64>)>) -> Option<f64> {
    let items: Vec<(f64, Option<f64>)> = items.collect();
    if items.is_empty() {
        return None;
    }
    if items.iter().all(|(_, w)| w.is_some()) {
        let total: f64 = items.iter().filter_map(|(_, w)| *w).sum();
        let acc: f64 = items.iter().map(|(v, w)| v * w.unwrap_or(0.0)).sum();
        Some(acc / total)
    } else {
        Some(items.iter().map(|(v, _)| v).sum::<f64>() / items.len() as f64)
    }
}

/// Stateless: every call works only on the collection it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(&self, collection: &CollectionResult) -> Result<MetricsSummary, PipelineError> {
        if collection.is_empty() {
            tracing::warn!("no data provided for analysis");
            return Err(PipelineError::EmptyInput);
        }
        let ds = normalize(collection);
        let summary = aggregate(&ds);
        tracing::debug!(
            sources = ds.rows().len(),
            dropped = ds.dropped().len(),
            metrics = summary.len(),
            "analysis complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::SourceRecord;
    use serde_json::{json, Value};

    fn rec(pairs: &[(&str, Value)]) -> SourceRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_collection_is_rejected() {
        let err = Analyzer::new()
            .analyze(&CollectionResult::default())
            .unwrap_err();
        assert_eq!(err, PipelineError::EmptyInput);
    }

    #[test]
    fn conversion_rate_weighted_by_clicks() {
        let c = CollectionResult::from_records([
            ("website", rec(&[("clicks", json!(100)), ("conversions", json!(10))])),
            ("social", rec(&[("clicks", json!(50)), ("conversions", json!(2))])),
        ]);
        let s = Analyzer::new().analyze(&c).unwrap();
        assert!(close(s.get("conversion_rate").unwrap(), 12.0 / 150.0));
        assert_eq!(s.get("clicks"), Some(150.0));
        assert_eq!(s.get("conversions"), Some(12.0));
        let names: Vec<&str> = s.names().collect();
        assert_eq!(names, vec!["clicks", "conversion_rate", "conversions"]);
    }

    #[test]
    fn reported_rate_without_volume_uses_simple_mean() {
        let c = CollectionResult::from_records([
            ("a", rec(&[("ctr", json!("2%"))])),
            ("b", rec(&[("clicks", json!(30)), ("impressions", json!(1000))])),
        ]);
        let s = Analyzer::new().analyze(&c).unwrap();
        // a has no impressions volume → simple mean of 0.02 and 0.03
        assert!(close(s.get("click_through_rate").unwrap(), 0.025));
    }

    #[test]
    fn malformed_fields_are_dropped_not_fatal() {
        let c = CollectionResult::from_records([(
            "website",
            rec(&[
                ("clicks", json!("n/a")),
                ("conversions", json!(4)),
                ("bounce_rate", json!(0.4)),
            ]),
        )]);
        let ds = normalize(&c);
        assert_eq!(ds.dropped().len(), 1);
        assert_eq!(ds.dropped()[0].field, "clicks");
        let s = aggregate(&ds);
        assert_eq!(s.get("conversions"), Some(4.0));
        assert!(!s.contains("clicks"));
        assert!(!s.contains("conversion_rate"));
        assert!(!s.contains("bounce_rate"));
    }

    #[test]
    fn return_on_spend_from_revenue_and_cost() {
        let c = CollectionResult::from_records([
            ("a", rec(&[("revenue", json!(150)), ("cost", json!(100))])),
            ("b", rec(&[("earnings", json!(50)), ("spend", json!(100))])),
        ]);
        let s = Analyzer::new().analyze(&c).unwrap();
        // (200 - 200) / 200
        assert!(close(s.get("return_on_spend").unwrap(), 0.0));
        assert_eq!(s.get("revenue"), Some(200.0));
        assert_eq!(s.get("cost"), Some(200.0));
    }

    #[test]
    fn return_on_spend_uses_totals_across_sources() {
        // revenue from one source, cost from another
        let c = CollectionResult::from_records([
            ("network", rec(&[("commissions", json!("$300"))])),
            ("ads", rec(&[("ad_spend", json!(200))])),
        ]);
        let s = Analyzer::new().analyze(&c).unwrap();
        assert!(close(s.get("return_on_spend").unwrap(), 0.5));
    }

    #[test]
    fn reported_roi_is_kept_when_nothing_to_derive_from() {
        let c = CollectionResult::from_records([
            ("a", rec(&[("roi", json!(-0.2))])),
            ("b", rec(&[("roi", json!("10%"))])),
        ]);
        let s = Analyzer::new().analyze(&c).unwrap();
        assert!(close(s.get("return_on_spend").unwrap(), -0.05));
    }

    #[test]
    fn zero_denominator_does_not_derive_a_rate() {
        let c = CollectionResult::from_records([(
            "a",
            rec(&[("clicks", json!(0)), ("conversions", json!(0))]),
        )]);
        let s = Analyzer::new().analyze(&c).unwrap();
        assert!(!s.contains("conversion_rate"));
        assert_eq!(s.get("clicks"), Some(0.0));
    }

    #[test]
    fn negative_counts_are_dropped() {
        let c = CollectionResult::from_records([("a", rec(&[("clicks", json!(-5))]))]);
        let ds = normalize(&c);
        assert_eq!(ds.dropped().len(), 1);
        assert!(aggregate(&ds).is_empty());
    }
}
