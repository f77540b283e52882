//! Raw field value → f64.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Commas only as thousands grouping before an optional `.` fraction.
static RE_GROUPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?\d{1,3}(,\d{3})+(\.\d*)?$").unwrap());

/// Accepts JSON numbers and numeric strings such as `"1,204"`, `"$12.50"`
/// or `"4.5%"` (percent becomes a fraction). Everything else is rejected
/// with a short reason.
pub fn to_number(v: &Value) -> Result<f64, String> {
    let n = match v {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("unrepresentable number {n}"))?,
        Value::String(s) => parse_numeric_str(s)?,
        Value::Null => return Err("null value".to_string()),
        Value::Bool(_) => return Err("boolean is not numeric".to_string()),
        Value::Array(_) | Value::Object(_) => return Err("nested value is not numeric".to_string()),
    };
    if !n.is_finite() {
        return Err(format!("non-finite value {n}"));
    }
    Ok(n)
}

fn parse_numeric_str(raw: &str) -> Result<f64, String> {
    let mut s = raw.trim();
    let percent = s.ends_with('%');
    if percent {
        s = s[..s.len() - 1].trim_end();
    }
    let s = s.trim_start_matches(['$', '€', '£']);
    let compact: String = s
        .chars()
        .filter(|c| !matches!(c, '_' | ' ' | '\u{a0}'))
        .collect();
    if compact.contains(',') && !RE_GROUPED.is_match(&compact) {
        return Err(format!("ambiguous separators in {raw:?}"));
    }
    let cleaned = compact.replace(',', "");
    if cleaned.is_empty() {
        return Err(format!("empty numeric string {raw:?}"));
    }
    let n: f64 = cleaned
        .parse()
        .map_err(|_| format!("not a number: {raw:?}"))?;
    Ok(if percent { n / 100.0 } else { n })
}
