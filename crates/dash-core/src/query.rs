//! Query specification types
//!
//! A `QuerySpec` is a named, declarative request for rows. Its identity is
//! the name it is registered under in the parsed document's query map; the
//! spec itself is immutable after parsing. The filter compiler produces
//! modified copies and never mutates the base spec.

use serde::{Deserialize, Serialize};

/// A declarative request for rows: measures, dimensions, an optional time
/// window, filters, and a row limit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuerySpec {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub measures: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_dimension: Option<TimeDimension>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<Filter>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl QuerySpec {
    /// Whether the spec names at least one measure or dimension.
    pub fn has_fields(&self) -> bool {
        !self.measures.is_empty() || !self.dimensions.is_empty()
    }

    /// Measures followed by dimensions, in declaration order.
    pub fn all_fields(&self) -> impl Iterator<Item = &str> {
        self.measures
            .iter()
            .chain(self.dimensions.iter())
            .map(String::as_str)
    }
}

/// A query's designated date/time field with an optional bound range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeDimension {
    pub dimension: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,

    /// Inclusive ISO `YYYY-MM-DD` bounds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<(String, String)>,
}

/// One filter predicate on a dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub dimension: String,
    pub operator: FilterOperator,
    pub values: Vec<String>,
}

/// Filter operators accepted by the wire format. The compiler only ever
/// emits `Equals`; the rest pass through from authored query blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Strip the view qualifier from a field name.
///
/// `"sales_invoices.status"` becomes `"status"`; unqualified names pass through.
pub fn short_field_name(name: &str) -> &str {
    match name.find('.') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_field_name() {
        assert_eq!(short_field_name("sales_invoices.status"), "status");
        assert_eq!(short_field_name("status"), "status");
        assert_eq!(short_field_name("a.b.c"), "b.c");
    }

    #[test]
    fn test_spec_yaml_round_trip() {
        let yaml = r#"
measures:
  - sales.total_amount
dimensions:
  - sales.region
timeDimension:
  dimension: sales.invoice_date
  granularity: month
  dateRange: ["2024-01-01", "2024-06-30"]
filters:
  - dimension: sales.region
    operator: equals
    values: ["EMEA"]
limit: 500
"#;
        let spec: QuerySpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.measures, vec!["sales.total_amount"]);
        assert_eq!(
            spec.time_dimension.as_ref().unwrap().date_range,
            Some(("2024-01-01".to_string(), "2024-06-30".to_string()))
        );
        assert_eq!(
            spec.filters.as_ref().unwrap()[0].operator,
            FilterOperator::Equals
        );
        assert_eq!(spec.limit, Some(500));
        assert!(spec.has_fields());
    }

    #[test]
    fn test_empty_spec_has_no_fields() {
        let spec = QuerySpec::default();
        assert!(!spec.has_fields());
    }
}
