//! Chart payload assembly
//!
//! Resolves a typed component plus its query rows into the structured,
//! already-formatted payload the external chart engine consumes. No pixel
//! decisions happen here.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use dash_core::{
    AxisChartAttrs, BigValueAttrs, DataTableAttrs, PieChartAttrs, Row, TableRows, Y2SeriesType,
    DEFAULT_QUERY_LIMIT,
};

use crate::format::{apply_format, auto_format, parse_format_map};
use crate::series::{build_series, SeriesData};
use crate::util::{format_column_header, format_compact, is_time_axis};

/// Default table page size when the tag declares none.
const DEFAULT_PAGE_SIZE: usize = 10;

/// Resolved single-value display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BigValuePayload {
    pub label: String,
    pub value: String,
    pub comparison: Option<ComparisonPayload>,
}

/// Comparison delta shown beside a big value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonPayload {
    pub value: String,
    pub title: Option<String>,
    /// Whether the delta direction is good news (inverted by
    /// `downIsGood`, for churn and cost metrics).
    pub favorable: bool,
}

/// Chart family for an axis payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AxisKind {
    Line,
    Bar,
    Area,
}

/// Resolved axis chart: pivoted series plus formatting hints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisChartPayload {
    pub kind: AxisKind,
    pub title: Option<String>,
    pub series: SeriesData,
    pub time_axis: bool,
    pub stacked: bool,
    pub horizontal: bool,
    pub y_fmt: Option<String>,
    /// Index where secondary-axis datasets start, when `y2` is set.
    pub y2_start: Option<usize>,
    pub y2_fmt: Option<String>,
    pub y2_kind: Option<Y2SeriesType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PiePayload {
    pub title: Option<String>,
    pub slices: Vec<PieSlice>,
    pub fmt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableColumn {
    pub key: String,
    pub header: String,
    pub numeric: bool,
}

/// Resolved table: formatted cell grid plus pagination/truncation hints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePayload {
    pub title: Option<String>,
    pub columns: Vec<TableColumn>,
    pub rows: Vec<Vec<String>>,
    /// `None` disables pagination.
    pub page_size: Option<usize>,
    pub total_rows: usize,
    /// The result hit the effective row limit; more data may exist.
    pub truncated: bool,
}

/// Resolve a single-value display against its first row.
pub fn big_value(attrs: &BigValueAttrs, rows: &[Row]) -> Option<BigValuePayload> {
    let row = rows.first()?;
    let value_col = attrs.value.as_deref().unwrap_or_default();
    let raw = row.get(value_col).unwrap_or(&Value::Null);

    let value = match &attrs.fmt {
        Some(fmt) => apply_format(raw, fmt),
        None => format_compact(raw),
    };
    let label = attrs
        .title
        .clone()
        .or_else(|| attrs.value.clone())
        .unwrap_or_default();

    let comparison = attrs.comparison.as_deref().map(|col| {
        let raw = row.get(col).unwrap_or(&Value::Null);
        let fmt = attrs.comparison_fmt.as_deref().or(attrs.fmt.as_deref());
        let delta = raw.as_f64().or_else(|| {
            raw.as_str().and_then(|s| s.trim().parse::<f64>().ok())
        });
        ComparisonPayload {
            value: match fmt {
                Some(fmt) => apply_format(raw, fmt),
                None => format_compact(raw),
            },
            title: attrs.comparison_title.clone(),
            favorable: match delta {
                Some(d) if attrs.down_is_good => d <= 0.0,
                Some(d) => d >= 0.0,
                None => true,
            },
        }
    });

    Some(BigValuePayload {
        label,
        value,
        comparison,
    })
}

/// Resolve an axis chart: pivot primary (and secondary-axis) series and
/// carry the formatting hints through.
pub fn axis_chart(
    kind: AxisKind,
    attrs: &AxisChartAttrs,
    horizontal: bool,
    rows: &[Row],
) -> AxisChartPayload {
    let x = attrs.x.as_deref().unwrap_or_default();
    let y = attrs.y.as_deref().unwrap_or_default();
    let group = attrs.series.as_deref();

    let mut series = build_series(rows, x, y, group);
    let mut y2_start = None;

    if let Some(y2) = attrs.y2.as_deref() {
        let secondary = build_series(rows, x, y2, group);
        if secondary.labels == series.labels {
            y2_start = Some(series.datasets.len());
            series.datasets.extend(secondary.datasets);
        } else {
            debug!("secondary axis labels diverge from primary, dropping y2 series");
        }
    }

    let multi = series.datasets.len() > 1;
    let stacked = match kind {
        AxisKind::Bar => multi && attrs.mode != Some(dash_core::SeriesMode::Grouped),
        AxisKind::Area => attrs.mode == Some(dash_core::SeriesMode::Stacked),
        AxisKind::Line => false,
    };

    AxisChartPayload {
        kind,
        title: attrs.title.clone(),
        time_axis: is_time_axis(&series.labels),
        stacked,
        horizontal,
        y_fmt: attrs.y_fmt.clone(),
        y2_start,
        y2_fmt: attrs.y2_fmt.clone(),
        y2_kind: attrs.y2_series_type,
        series,
    }
}

/// Resolve a pie chart: one slice per row; rows without a numeric value
/// are skipped.
pub fn pie_chart(attrs: &PieChartAttrs, rows: &[Row]) -> PiePayload {
    let name_col = attrs.name.as_deref().unwrap_or_default();
    let value_col = attrs.value.as_deref().unwrap_or_default();

    let slices = rows
        .iter()
        .filter_map(|row| {
            let value = match row.get(value_col) {
                Some(Value::Number(n)) => n.as_f64(),
                Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
                _ => None,
            }?;
            let name = row
                .get(name_col)
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default();
            Some(PieSlice { name, value })
        })
        .collect();

    PiePayload {
        title: attrs.title.clone(),
        slices,
        fmt: attrs.fmt.clone(),
    }
}

/// Resolve a data table: pick columns, format every cell, and flag
/// truncation against the effective row limit.
pub fn data_table(
    attrs: &DataTableAttrs,
    rows: &[Row],
    effective_limit: Option<u64>,
) -> TablePayload {
    let keys: Vec<String> = match &attrs.columns {
        Some(cols) => cols.clone(),
        None => rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default(),
    };

    let fmt_map = attrs.fmt.as_deref().map(parse_format_map);

    let columns: Vec<TableColumn> = keys
        .iter()
        .map(|key| TableColumn {
            key: key.clone(),
            header: format_column_header(key),
            numeric: is_numeric_column(rows, key),
        })
        .collect();

    let formatted: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            keys.iter()
                .map(|key| {
                    let value = row.get(key).unwrap_or(&Value::Null);
                    match fmt_map.as_ref().and_then(|m| m.get(key)) {
                        Some(fmt) => apply_format(value, fmt),
                        None => auto_format(value),
                    }
                })
                .collect()
        })
        .collect();

    let page_size = match attrs.rows {
        Some(TableRows::All) => None,
        Some(TableRows::Count(n)) => Some(n),
        None => Some(DEFAULT_PAGE_SIZE),
    };

    let limit = effective_limit.unwrap_or(DEFAULT_QUERY_LIMIT) as usize;

    TablePayload {
        title: attrs.title.clone(),
        columns,
        total_rows: rows.len(),
        truncated: rows.len() >= limit,
        rows: formatted,
        page_size,
    }
}

/// A column is numeric when every non-null cell holds a number.
fn is_numeric_column(rows: &[Row], key: &str) -> bool {
    let mut saw_value = false;
    for row in rows {
        match row.get(key) {
            None | Some(Value::Null) => continue,
            Some(Value::Number(_)) => saw_value = true,
            Some(Value::String(s)) if s.trim().parse::<f64>().is_ok() => saw_value = true,
            _ => return false,
        }
    }
    saw_value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(data: Value) -> Vec<Row> {
        data.as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    #[test]
    fn test_big_value_with_fmt() {
        let attrs = BigValueAttrs {
            data: Some("rev".to_string()),
            value: Some("total".to_string()),
            fmt: Some("usd2".to_string()),
            ..Default::default()
        };
        let payload = big_value(&attrs, &rows(json!([{"total": 1234.5}]))).unwrap();
        assert_eq!(payload.value, "$1,234.50");
        assert_eq!(payload.label, "total");
    }

    #[test]
    fn test_big_value_comparison_down_is_good() {
        let attrs = BigValueAttrs {
            value: Some("churn".to_string()),
            comparison: Some("delta".to_string()),
            down_is_good: true,
            ..Default::default()
        };
        let payload = big_value(&attrs, &rows(json!([{"churn": 0.05, "delta": -0.01}]))).unwrap();
        let comparison = payload.comparison.unwrap();
        assert!(comparison.favorable);
    }

    #[test]
    fn test_axis_chart_bar_stacking() {
        let data = rows(json!([
            {"d": "2024-01-01", "g": "A", "v": 1},
            {"d": "2024-01-01", "g": "B", "v": 2},
        ]));
        let attrs = AxisChartAttrs {
            x: Some("d".to_string()),
            y: Some("v".to_string()),
            series: Some("g".to_string()),
            ..Default::default()
        };
        let payload = axis_chart(AxisKind::Bar, &attrs, false, &data);
        assert!(payload.stacked);
        assert!(payload.time_axis);

        let grouped = AxisChartAttrs {
            mode: Some(dash_core::SeriesMode::Grouped),
            ..attrs
        };
        assert!(!axis_chart(AxisKind::Bar, &grouped, false, &data).stacked);
    }

    #[test]
    fn test_axis_chart_y2_split() {
        let data = rows(json!([
            {"d": "2024-01-01", "v": 1, "pct": 0.5},
            {"d": "2024-01-02", "v": 2, "pct": 0.6},
        ]));
        let attrs = AxisChartAttrs {
            x: Some("d".to_string()),
            y: Some("v".to_string()),
            y2: Some("pct".to_string()),
            y2_fmt: Some("pct1".to_string()),
            ..Default::default()
        };
        let payload = axis_chart(AxisKind::Line, &attrs, false, &data);
        assert_eq!(payload.y2_start, Some(1));
        assert_eq!(payload.series.datasets.len(), 2);
        assert!(!payload.stacked);
    }

    #[test]
    fn test_pie_skips_non_numeric() {
        let data = rows(json!([
            {"region": "EMEA", "v": 10},
            {"region": "APAC", "v": "n/a"},
        ]));
        let attrs = PieChartAttrs {
            name: Some("region".to_string()),
            value: Some("v".to_string()),
            ..Default::default()
        };
        let payload = pie_chart(&attrs, &data);
        assert_eq!(payload.slices.len(), 1);
        assert_eq!(payload.slices[0].name, "EMEA");
    }

    #[test]
    fn test_table_formatting_and_pagination() {
        let data = rows(json!([
            {"month": "2024-01-01", "revenue": 1234.5},
            {"month": "2024-02-01", "revenue": 2345.6},
        ]));
        let attrs = DataTableAttrs {
            fmt: Some("revenue:eur2".to_string()),
            rows: Some(TableRows::All),
            ..Default::default()
        };
        let payload = data_table(&attrs, &data, None);
        assert_eq!(payload.columns.len(), 2);
        assert_eq!(payload.columns[0].header, "Month");
        assert!(payload.columns[1].numeric);
        assert_eq!(payload.rows[0][0], "1 Jan 2024");
        assert_eq!(payload.rows[0][1], "1,234.50 €");
        assert_eq!(payload.page_size, None);
        assert!(!payload.truncated);
    }

    #[test]
    fn test_table_truncation_flag() {
        let data = rows(json!([
            {"v": 1}, {"v": 2}, {"v": 3}
        ]));
        let attrs = DataTableAttrs::default();
        let payload = data_table(&attrs, &data, Some(3));
        assert!(payload.truncated);
        assert_eq!(payload.page_size, Some(10));
    }
}
