//! Format resolver
//!
//! Maps a value plus a format specifier (a named preset or a raw pattern
//! string) to a display string. Patterns follow spreadsheet conventions:
//! `#,##0.00` style numeric codes with quoted literal affixes, and
//! `d mmm yyyy` style date codes. A pattern counts as a date pattern when,
//! after stripping quoted literals and bracketed codes, it contains any of
//! y/m/d/h/s.

use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use serde_json::Value;

use crate::util::{is_iso_date_prefix, number_label};

/// Placeholder for null/missing values. Never the empty string, never
/// "null".
pub const EM_DASH: &str = "\u{2014}";

const MONTHS_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun",
    "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const MONTHS_LONG: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

/// Resolve a preset name to its pattern; unknown names pass through as raw
/// patterns.
pub fn resolve_preset(spec: &str) -> &str {
    match spec {
        "num0" => "#,##0",
        "num1" => "#,##0.0",
        "num2" => "#,##0.00",
        "usd" => "$#,##0",
        "usd2" => "$#,##0.00",
        "eur" => "#,##0 \"€\"",
        "eur2" => "#,##0.00 \"€\"",
        "gbp" => "£#,##0",
        "gbp2" => "£#,##0.00",
        "chf" => "\"CHF \"#,##0",
        "chf2" => "\"CHF \"#,##0.00",
        "pct" => "0%",
        "pct1" => "0.0%",
        "pct2" => "0.00%",
        "shortdate" => "d mmm yyyy",
        "longdate" => "d mmmm yyyy",
        "monthyear" => "mmm yyyy",
        other => other,
    }
}

/// Whether a pattern formats dates rather than numbers.
pub fn is_date_pattern(pattern: &str) -> bool {
    let mut in_quote = false;
    let mut in_bracket = false;
    for c in pattern.chars() {
        match c {
            '"' if !in_bracket => in_quote = !in_quote,
            '[' if !in_quote => in_bracket = true,
            ']' if !in_quote => in_bracket = false,
            _ if in_quote || in_bracket => {}
            _ => {
                if matches!(c.to_ascii_lowercase(), 'y' | 'm' | 'd' | 'h' | 's') {
                    return true;
                }
            }
        }
    }
    false
}

/// Format a value with a preset name or raw pattern.
pub fn apply_format(value: &Value, spec: &str) -> String {
    if value.is_null() {
        return EM_DASH.to_string();
    }
    let pattern = resolve_preset(spec);

    if is_date_pattern(pattern) {
        if let Value::String(s) = value {
            if let Some(date) = parse_iso_date(s) {
                return format_date(pattern, date);
            }
        }
    }

    match coerce_number(value) {
        Some(num) => format_number(pattern, num),
        None => value_display(value),
    }
}

/// Auto-detect the value type and format with sensible defaults: ISO date
/// strings as short dates, numbers with grouped thousands (up to two
/// decimals when fractional), everything else unchanged.
pub fn auto_format(value: &Value) -> String {
    if value.is_null() {
        return EM_DASH.to_string();
    }

    if let Value::String(s) = value {
        if let Some(date) = parse_iso_date(s) {
            return format_date("d mmm yyyy", date);
        }
    }

    match coerce_number(value) {
        Some(num) => {
            if num.fract() == 0.0 {
                format_number("#,##0", num)
            } else {
                format_number("#,##0.##", num)
            }
        }
        None => value_display(value),
    }
}

/// Parse a format-map attribute like `"revenue:eur2,date:shortdate"` into
/// a column-to-format map. Commas split entries only when followed by an
/// `identifier:` pair, so commas inside patterns like `#,##0` stay put. An
/// entry with no colon is stored under the empty key, meaning "apply to
/// the single value".
pub fn parse_format_map(raw: &str) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    let mut start = 0;

    let bytes = raw.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b',' && followed_by_entry(&raw[i + 1..]) {
            push_entry(&raw[start..i], &mut map);
            start = i + 1;
        }
    }
    push_entry(&raw[start..], &mut map);
    map
}

/// `\s*[A-Za-z_]\w*\s*:` lookahead for entry boundaries.
fn followed_by_entry(rest: &str) -> bool {
    let rest = rest.trim_start();
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    let rest = rest
        .trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_')
        .trim_start();
    rest.starts_with(':')
}

fn push_entry(entry: &str, map: &mut IndexMap<String, String>) {
    let trimmed = entry.trim();
    if trimmed.is_empty() {
        return;
    }
    match trimmed.find(':') {
        None => {
            map.insert(String::new(), trimmed.to_string());
        }
        Some(idx) => {
            let col = trimmed[..idx].trim().to_string();
            let fmt = trimmed[idx + 1..].trim().to_string();
            map.insert(col, fmt);
        }
    }
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    if !is_iso_date_prefix(s) {
        return None;
    }
    NaiveDate::parse_from_str(&s[..10], "%Y-%m-%d").ok()
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn value_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => number_label(n),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

enum Tok {
    Quoted(String),
    Ch(char),
}

fn tokenize(pattern: &str) -> Vec<Tok> {
    let mut toks = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '"' {
            let mut literal = String::new();
            for q in chars.by_ref() {
                if q == '"' {
                    break;
                }
                literal.push(q);
            }
            toks.push(Tok::Quoted(literal));
        } else {
            toks.push(Tok::Ch(c));
        }
    }
    toks
}

/// Format a number with a spreadsheet-style pattern. Supports the subset
/// the preset table exercises: thousands grouping, fixed and optional
/// decimals, percent scaling, and literal/quoted affixes.
pub fn format_number(pattern: &str, num: f64) -> String {
    let toks = tokenize(pattern);

    let is_digit_tok = |t: &Tok| matches!(t, Tok::Ch('#') | Tok::Ch('0') | Tok::Ch(',') | Tok::Ch('.'));
    let Some(core_start) = toks
        .iter()
        .position(|t| matches!(t, Tok::Ch('#') | Tok::Ch('0')))
    else {
        // No digit placeholders at all: print the value followed by the
        // pattern's literals.
        return number_label_f64(num);
    };
    let core_end = toks[core_start..]
        .iter()
        .position(|t| !is_digit_tok(t))
        .map(|rel| core_start + rel)
        .unwrap_or(toks.len());

    let core: String = toks[core_start..core_end]
        .iter()
        .map(|t| match t {
            Tok::Ch(c) => *c,
            Tok::Quoted(_) => unreachable!(),
        })
        .collect();

    let percent = toks
        .iter()
        .enumerate()
        .any(|(i, t)| (i < core_start || i >= core_end) && matches!(t, Tok::Ch('%')));

    let grouping = core.contains(',');
    let (int_part, frac_part) = match core.find('.') {
        Some(idx) => (&core[..idx], &core[idx + 1..]),
        None => (core.as_str(), ""),
    };
    let min_int = int_part.matches('0').count().max(1);
    let min_dec = frac_part.matches('0').count();
    let max_dec = min_dec + frac_part.matches('#').count();

    let scaled = if percent { num * 100.0 } else { num };
    let negative = scaled < 0.0;
    let digits = render_digits(scaled.abs(), min_int, min_dec, max_dec, grouping);
    // A value that rounds to zero loses its sign.
    let signed = digits.chars().any(|c| c.is_ascii_digit() && c != '0');
    let all_zero = !signed;

    let mut out = String::new();
    if negative && !all_zero {
        out.push('-');
    }
    for t in &toks[..core_start] {
        match t {
            Tok::Quoted(s) => out.push_str(s),
            Tok::Ch(c) => out.push(*c),
        }
    }
    out.push_str(&digits);
    for t in &toks[core_end..] {
        match t {
            Tok::Quoted(s) => out.push_str(s),
            Tok::Ch(c) => out.push(*c),
        }
    }
    out
}

fn render_digits(value: f64, min_int: usize, min_dec: usize, max_dec: usize, grouping: bool) -> String {
    let factor = 10f64.powi(max_dec as i32);
    let rounded = (value * factor).round() / factor;

    let mut text = format!("{rounded:.max_dec$}");
    if max_dec > min_dec {
        // Trim optional trailing decimals down to the minimum.
        while text.contains('.') && text.ends_with('0')
            && text.split('.').nth(1).map(str::len).unwrap_or(0) > min_dec
        {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }

    let (int_text, frac_text) = match text.find('.') {
        Some(idx) => (text[..idx].to_string(), Some(text[idx + 1..].to_string())),
        None => (text, None),
    };

    let mut int_text = int_text;
    while int_text.len() < min_int {
        int_text.insert(0, '0');
    }

    if grouping {
        let mut grouped = String::new();
        let digits: Vec<char> = int_text.chars().collect();
        for (i, c) in digits.iter().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(*c);
        }
        int_text = grouped;
    }

    match frac_text {
        Some(frac) => format!("{int_text}.{frac}"),
        None => int_text,
    }
}

fn number_label_f64(num: f64) -> String {
    if num.fract() == 0.0 && num.abs() < 1e15 {
        format!("{}", num as i64)
    } else {
        format!("{num}")
    }
}

/// Format a date with a spreadsheet-style pattern: `d`/`dd` day,
/// `mmm`/`mmmm` month names, `m`/`mm` month numbers, `yy`/`yyyy` year.
/// Quoted substrings are literals.
pub fn format_date(pattern: &str, date: NaiveDate) -> String {
    let mut out = String::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '"' {
            i += 1;
            while i < chars.len() && chars[i] != '"' {
                out.push(chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }
        let lower = c.to_ascii_lowercase();
        if matches!(lower, 'y' | 'm' | 'd' | 'h' | 's') {
            let mut run = 1;
            while i + run < chars.len() && chars[i + run].to_ascii_lowercase() == lower {
                run += 1;
            }
            push_date_token(&mut out, lower, run, date);
            i += run;
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

fn push_date_token(out: &mut String, token: char, run: usize, date: NaiveDate) {
    match (token, run) {
        ('y', r) if r >= 3 => out.push_str(&date.year().to_string()),
        ('y', _) => out.push_str(&format!("{:02}", date.year() % 100)),
        ('m', 1) => out.push_str(&date.month().to_string()),
        ('m', 2) => out.push_str(&format!("{:02}", date.month())),
        ('m', 3) => out.push_str(MONTHS_SHORT[date.month0() as usize]),
        ('m', _) => out.push_str(MONTHS_LONG[date.month0() as usize]),
        ('d', 1) => out.push_str(&date.day().to_string()),
        ('d', _) => out.push_str(&format!("{:02}", date.day())),
        // Date-only values carry no time component.
        ('h', 1) | ('s', 1) => out.push('0'),
        ('h', _) | ('s', _) => out.push_str("00"),
        _ => {}
    }
}
