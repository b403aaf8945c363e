//! Series builder: pivots flat query rows into datasets on a shared label
//! axis.
//!
//! Four cases by (y columns, group column):
//!
//! | y columns | group column | result                      |
//! |-----------|--------------|-----------------------------|
//! | single    | none         | 1 dataset                   |
//! | single    | set          | one dataset per group value |
//! | multiple  | none         | one dataset per y column    |
//! | multiple  | set          | group × y datasets          |

use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use serde_json::Value;

use dash_core::Row;

use crate::util::is_iso_date_prefix;

/// One named sequence of values aligned to the shared label axis. `None`
/// marks a gap, never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Ordered labels plus one or more datasets of identical length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

/// Build datasets from flat rows.
///
/// `y` may be a comma-separated column list. When the first row's x value
/// looks like an ISO date the rows are sorted ascending by the x field
/// first (sources may return unordered data); categorical axes keep row
/// order untouched. Pure and order-deterministic for identical inputs.
pub fn build_series(rows: &[Row], x: &str, y: &str, group: Option<&str>) -> SeriesData {
    if rows.is_empty() {
        return SeriesData::default();
    }

    let mut ordered: Vec<&Row> = rows.iter().collect();
    if is_iso_date_prefix(&cell_label(rows[0].get(x))) {
        ordered.sort_by(|a, b| cell_label(a.get(x)).cmp(&cell_label(b.get(x))));
    }

    let y_columns: Vec<&str> = y
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();

    let Some(group) = group else {
        let labels: Vec<String> = ordered.iter().map(|row| cell_label(row.get(x))).collect();
        let datasets = y_columns
            .iter()
            .map(|col| Dataset {
                name: col.to_string(),
                values: ordered.iter().map(|row| cell_number(row.get(*col))).collect(),
            })
            .collect();
        return SeriesData { labels, datasets };
    };

    // Pivot: ordered-unique x values and group keys, both first-seen order.
    let mut labels: Vec<String> = Vec::new();
    let mut seen_labels: AHashSet<String> = AHashSet::new();
    let mut group_keys: Vec<String> = Vec::new();
    let mut seen_keys: AHashSet<String> = AHashSet::new();
    for row in &ordered {
        let label = cell_label(row.get(x));
        if seen_labels.insert(label.clone()) {
            labels.push(label);
        }
        let key = cell_label(row.get(group));
        if seen_keys.insert(key.clone()) {
            group_keys.push(key);
        }
    }

    // (x, group) to row; later rows win on duplicates.
    let mut lookup: AHashMap<(String, String), &Row> = AHashMap::new();
    for row in &ordered {
        lookup.insert((cell_label(row.get(x)), cell_label(row.get(group))), *row);
    }

    let mut datasets = Vec::with_capacity(group_keys.len() * y_columns.len());
    for key in &group_keys {
        for col in &y_columns {
            let name = if y_columns.len() == 1 {
                key.clone()
            } else {
                format!("{key} - {col}")
            };
            let values = labels
                .iter()
                .map(|label| {
                    lookup
                        .get(&(label.clone(), key.clone()))
                        .and_then(|row| cell_number(row.get(*col)))
                })
                .collect();
            datasets.push(Dataset { name, values });
        }
    }

    SeriesData { labels, datasets }
}

/// Axis label for a cell: missing and null become the empty string.
pub(crate) fn cell_label(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => crate::util::number_label(n),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Numeric cell value; missing, null, and non-numeric cells are gaps.
pub(crate) fn cell_number(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
