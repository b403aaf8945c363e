//! Built-in sample dashboard and a canned query client.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use serde_json::{json, Map, Value};

use dash_core::{QueryClient, QueryResponse, QuerySpec, Row};

pub const SAMPLE_DASHBOARD: &str = r#"---
title: Revenue Overview
description: Monthly revenue and regional split
theme:
  palette: observable
---

# Revenue

Numbers refresh as you change the filters above the charts.

```query revenue
measures:
  - sales.total_amount
timeDimension:
  dimension: sales.invoice_date
  granularity: month
```

```query by_region
measures:
  - sales.total_amount
dimensions:
  - sales.region
timeDimension:
  dimension: sales.invoice_date
  granularity: month
```

```query regions
dimensions:
  - sales.region
```

<DateRange name="period" label="Period" />
<Dropdown name="region" label="Region" data={regions} dimension="sales.region" queries="revenue,by_region" />

<BigValue data={revenue} value="sales.total_amount" title="Total Revenue" fmt="usd" />

<Grid cols="2">
  <LineChart data={revenue} x="sales.invoice_date" y="sales.total_amount" yFmt="usd" />
  <BarChart data={by_region} x="sales.invoice_date" y="sales.total_amount" series="sales.region" />
</Grid>

<DataTable data={by_region} fmt="sales.total_amount:usd2" rows="10" />
"#;

/// Deterministic in-process client: synthesizes monthly rows and honors
/// the spec's date range and equality filters.
#[derive(Debug, Default)]
pub struct DemoClient;

const REGIONS: [&str; 3] = ["AMER", "EMEA", "APAC"];

#[async_trait]
impl QueryClient for DemoClient {
    async fn query(&self, spec: &QuerySpec) -> anyhow::Result<QueryResponse> {
        let by_region = spec.dimensions.iter().any(|d| d.ends_with(".region"));

        // Dimension-only query: the dropdown's option list
        if spec.measures.is_empty() {
            let rows = REGIONS
                .iter()
                .map(|region| row(&[("sales.region", json!(region))]))
                .collect();
            return Ok(QueryResponse {
                rows,
                applied_limit: spec.limit,
            });
        }

        let (start, end) = spec
            .time_dimension
            .as_ref()
            .and_then(|td| td.date_range.clone())
            .unwrap_or(("2024-01-01".to_string(), "2024-12-31".to_string()));

        let region_filter = spec.filters.as_deref().and_then(|filters| {
            filters
                .iter()
                .find(|f| f.dimension.ends_with(".region"))
                .and_then(|f| f.values.first().cloned())
        });

        let mut rows = Vec::new();
        for month in month_starts(&start, &end) {
            for (i, region) in REGIONS.iter().enumerate() {
                if let Some(wanted) = &region_filter {
                    if wanted != region {
                        continue;
                    }
                }
                let amount = 40_000 + 7_000 * i as i64 + 900 * month.month0() as i64;
                if by_region {
                    rows.push(row(&[
                        ("sales.invoice_date", json!(month.format("%Y-%m-%d").to_string())),
                        ("sales.region", json!(region)),
                        ("sales.total_amount", json!(amount)),
                    ]));
                }
            }
            if !by_region {
                let total: i64 = REGIONS
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| region_filter.as_deref().map(|w| w == **r).unwrap_or(true))
                    .map(|(i, _)| 40_000 + 7_000 * i as i64 + 900 * month.month0() as i64)
                    .sum();
                rows.push(row(&[
                    ("sales.invoice_date", json!(month.format("%Y-%m-%d").to_string())),
                    ("sales.total_amount", json!(total)),
                ]));
            }
        }

        Ok(QueryResponse {
            rows,
            applied_limit: spec.limit,
        })
    }
}

fn row(cells: &[(&str, Value)]) -> Row {
    let mut map = Map::new();
    for (key, value) in cells {
        map.insert(key.to_string(), value.clone());
    }
    map
}

/// First-of-month dates covering the inclusive ISO range.
fn month_starts(start: &str, end: &str) -> Vec<NaiveDate> {
    let parse = |s: &str| NaiveDate::parse_from_str(&s[..10.min(s.len())], "%Y-%m-%d").ok();
    let (Some(start), Some(end)) = (parse(start), parse(end)) else {
        return Vec::new();
    };

    let mut months = Vec::new();
    let mut current = start.with_day(1).unwrap_or(start);
    while current <= end {
        months.push(current);
        let (y, m) = if current.month() == 12 {
            (current.year() + 1, 1)
        } else {
            (current.year(), current.month() + 1)
        };
        match NaiveDate::from_ymd_opt(y, m, 1) {
            Some(next) => current = next,
            None => break,
        }
    }
    months
}
