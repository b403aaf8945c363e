//! Shared display helpers with no theme or chart-engine dependency.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use crate::format::EM_DASH;

static ISO_DATE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("static regex"));

/// Whether a string starts with an ISO `YYYY-MM-DD` date.
pub fn is_iso_date_prefix(s: &str) -> bool {
    ISO_DATE_PREFIX.is_match(s)
}

/// Whether an axis is a time axis: decided by the first non-empty label.
pub fn is_time_axis(labels: &[String]) -> bool {
    labels
        .iter()
        .find(|l| !l.is_empty())
        .map(|l| is_iso_date_prefix(l))
        .unwrap_or(false)
}

/// Label form of a JSON number: integral values drop the fraction.
pub fn number_label(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => format!("{f}"),
        None => n.to_string(),
    }
}

/// Compact display for a value: grouped integers, two decimals for small
/// fractions, `K`/`M` notation for large magnitudes, em-dash for null.
pub fn format_compact(value: &Value) -> String {
    if value.is_null() {
        return EM_DASH.to_string();
    }
    let num = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(num) = num else {
        return match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
    };
    if !num.is_finite() {
        return format!("{num}");
    }
    if num.abs() >= 1_000_000.0 {
        return format!("{:.1}M", num / 1_000_000.0);
    }
    if num.abs() >= 1_000.0 {
        return format!("{:.1}K", num / 1_000.0);
    }
    if num.fract() == 0.0 {
        crate::format::format_number("#,##0", num)
    } else {
        format!("{num:.2}")
    }
}

/// Convert a `snake_case` or `camelCase` column name to Title Case.
pub fn format_column_header(col: &str) -> String {
    let spaced = col.replace('_', " ");

    // Insert spaces at lower-to-upper camel boundaries.
    let mut broken = String::with_capacity(spaced.len());
    let mut prev_lower = false;
    for c in spaced.chars() {
        if c.is_ascii_uppercase() && prev_lower {
            broken.push(' ');
        }
        prev_lower = c.is_ascii_lowercase();
        broken.push(c);
    }

    // Capitalize the first letter of each word.
    let mut out = String::with_capacity(broken.len());
    let mut at_word_start = true;
    for c in broken.chars() {
        if at_word_start && c.is_ascii_lowercase() {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_ascii_alphanumeric();
    }
    out
}
