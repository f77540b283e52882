//! Canonical metric catalogue.
//!
//! Every canonical metric has exactly one combination rule. The table is
//! static so every cycle aggregates the same way.

/// How per-source values of one metric are combined into the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    /// Volume counters: summed across sources.
    Sum,
    /// `numerator / denominator`, weighted by the denominator volume.
    Rate {
        numerator: &'static str,
        denominator: &'static str,
    },
    /// `(gain - spend) / spend` over the summed totals.
    NetReturn {
        gain: &'static str,
        spend: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricRule {
    pub name: &'static str,
    pub combine: Combine,
}

impl MetricRule {
    const fn sum(name: &'static str) -> Self {
        Self {
            name,
            combine: Combine::Sum,
        }
    }

    const fn rate(name: &'static str, numerator: &'static str, denominator: &'static str) -> Self {
        Self {
            name,
            combine: Combine::Rate {
                numerator,
                denominator,
            },
        }
    }

    /// Only net returns can legitimately go below zero.
    pub fn allows_negative(&self) -> bool {
        matches!(self.combine, Combine::NetReturn { .. })
    }
}

pub const IMPRESSIONS: &str = "impressions";
pub const CLICKS: &str = "clicks";
pub const CONVERSIONS: &str = "conversions";
pub const ENGAGEMENT: &str = "engagement";
pub const REVENUE: &str = "revenue";
pub const COST: &str = "cost";
pub const CLICK_THROUGH_RATE: &str = "click_through_rate";
pub const CONVERSION_RATE: &str = "conversion_rate";
pub const ENGAGEMENT_RATE: &str = "engagement_rate";
pub const EARNINGS_PER_CLICK: &str = "earnings_per_click";
pub const RETURN_ON_SPEND: &str = "return_on_spend";

pub const CATALOG: &[MetricRule] = &[
    MetricRule::sum(IMPRESSIONS),
    MetricRule::sum(CLICKS),
    MetricRule::sum(CONVERSIONS),
    MetricRule::sum(ENGAGEMENT),
    MetricRule::sum(REVENUE),
    MetricRule::sum(COST),
    MetricRule::rate(CLICK_THROUGH_RATE, CLICKS, IMPRESSIONS),
    MetricRule::rate(CONVERSION_RATE, CONVERSIONS, CLICKS),
    MetricRule::rate(ENGAGEMENT_RATE, ENGAGEMENT, IMPRESSIONS),
    MetricRule::rate(EARNINGS_PER_CLICK, REVENUE, CLICKS),
    MetricRule {
        name: RETURN_ON_SPEND,
        combine: Combine::NetReturn {
            gain: REVENUE,
            spend: COST,
        },
    },
];

/// Alternative field names seen in source payloads → canonical name.
const ALIASES: &[(&str, &str)] = &[
    ("views", IMPRESSIONS),
    ("impr", IMPRESSIONS),
    ("reach", IMPRESSIONS),
    ("click", CLICKS),
    ("link_clicks", CLICKS),
    ("conv", CONVERSIONS),
    ("convs", CONVERSIONS),
    ("sales", CONVERSIONS),
    ("orders", CONVERSIONS),
    ("engagements", ENGAGEMENT),
    ("interactions", ENGAGEMENT),
    ("earnings", REVENUE),
    ("commission", REVENUE),
    ("commissions", REVENUE),
    ("spend", COST),
    ("ad_spend", COST),
    ("ctr", CLICK_THROUGH_RATE),
    ("cr", CONVERSION_RATE),
    ("cvr", CONVERSION_RATE),
    ("er", ENGAGEMENT_RATE),
    ("epc", EARNINGS_PER_CLICK),
    ("roi", RETURN_ON_SPEND),
];

pub fn rule_for(name: &str) -> Option<&'static MetricRule> {
    CATALOG.iter().find(|r| r.name == name)
}

/// Lowercase, trim, and fold spaces/dashes/dots into single underscores.
pub fn normalize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        let c = match ch {
            ' ' | '-' | '.' | '_' => '_',
            c => c.to_ascii_lowercase(),
        };
        if c == '_' && (out.is_empty() || out.ends_with('_')) {
            continue;
        }
        out.push(c);
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Map a raw field name to its canonical metric, if it has one.
pub fn canonical_name(raw: &str) -> Option<&'static str> {
    let key = normalize_key(raw);
    if let Some(rule) = rule_for(&key) {
        return Some(rule.name);
    }
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canon)| *canon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_key_folds_separators() {
        assert_eq!(normalize_key("  Conversion Rate "), "conversion_rate");
        assert_eq!(normalize_key("Link-Clicks"), "link_clicks");
        assert_eq!(normalize_key("ad__spend_"), "ad_spend");
    }

    #[test]
    fn canonical_name_resolves_aliases() {
        assert_eq!(canonical_name("CTR"), Some(CLICK_THROUGH_RATE));
        assert_eq!(canonical_name("Sales"), Some(CONVERSIONS));
        assert_eq!(canonical_name("clicks"), Some(CLICKS));
        assert_eq!(canonical_name("bounce_rate"), None);
    }

    #[test]
    fn every_rate_references_sum_metrics() {
        for r in CATALOG {
            let parts = match r.combine {
                Combine::Sum => continue,
                Combine::Rate {
                    numerator,
                    denominator,
                } => [numerator, denominator],
                Combine::NetReturn { gain, spend } => [gain, spend],
            };
            for p in parts {
                assert_eq!(rule_for(p).map(|x| x.combine), Some(Combine::Sum), "{}", r.name);
            }
        }
    }
}
