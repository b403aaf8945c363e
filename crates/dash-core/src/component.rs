//! Component tags and their typed attribute structs
//!
//! The markup scanner produces `RawComponentTag`s: a kind plus an ordered
//! bag of raw string attributes. The parser converts those into the typed
//! `Component` union at its boundary, so downstream code never re-parses
//! attribute strings for numeric or boolean fields.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The eight component kinds recognized in dashboard markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    BigValue,
    LineChart,
    BarChart,
    AreaChart,
    DataTable,
    PieChart,
    DateRange,
    Dropdown,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 8] = [
        ComponentKind::BigValue,
        ComponentKind::LineChart,
        ComponentKind::BarChart,
        ComponentKind::AreaChart,
        ComponentKind::DataTable,
        ComponentKind::PieChart,
        ComponentKind::DateRange,
        ComponentKind::Dropdown,
    ];

    /// Map a tag name to a known kind. Anything else is not a component.
    pub fn from_tag_name(name: &str) -> Option<Self> {
        match name {
            "BigValue" => Some(ComponentKind::BigValue),
            "LineChart" => Some(ComponentKind::LineChart),
            "BarChart" => Some(ComponentKind::BarChart),
            "AreaChart" => Some(ComponentKind::AreaChart),
            "DataTable" => Some(ComponentKind::DataTable),
            "PieChart" => Some(ComponentKind::PieChart),
            "DateRange" => Some(ComponentKind::DateRange),
            "Dropdown" => Some(ComponentKind::Dropdown),
            _ => None,
        }
    }

    pub fn tag_name(&self) -> &'static str {
        match self {
            ComponentKind::BigValue => "BigValue",
            ComponentKind::LineChart => "LineChart",
            ComponentKind::BarChart => "BarChart",
            ComponentKind::AreaChart => "AreaChart",
            ComponentKind::DataTable => "DataTable",
            ComponentKind::PieChart => "PieChart",
            ComponentKind::DateRange => "DateRange",
            ComponentKind::Dropdown => "Dropdown",
        }
    }

    /// Input kinds are hoisted out of the section tree into the inputs bar.
    pub fn is_input(&self) -> bool {
        matches!(self, ComponentKind::DateRange | ComponentKind::Dropdown)
    }
}

/// A component tag as scanned from markup, before typing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawComponentTag {
    pub kind: ComponentKind,
    /// Ordered attribute name to raw string value.
    pub attrs: IndexMap<String, String>,
}

/// Display mode for multi-series charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesMode {
    Stacked,
    Grouped,
}

/// Chart type override for secondary-axis series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Y2SeriesType {
    Line,
    Bar,
    Area,
}

/// Row count for a data table: explicit page size, or everything at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRows {
    Count(usize),
    All,
}

/// Attributes for a single-value display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BigValueAttrs {
    pub data: Option<String>,
    pub value: Option<String>,
    pub title: Option<String>,
    pub fmt: Option<String>,
    pub comparison: Option<String>,
    pub comparison_fmt: Option<String>,
    pub comparison_title: Option<String>,
    pub down_is_good: bool,
}

/// Attributes shared by axis-based charts (line, bar, area).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisChartAttrs {
    pub data: Option<String>,
    pub x: Option<String>,
    /// Comma-separated list of y columns.
    pub y: Option<String>,
    pub title: Option<String>,
    /// Column to split data into separate series.
    pub series: Option<String>,
    pub mode: Option<SeriesMode>,
    pub y_fmt: Option<String>,
    /// Comma-separated columns for the secondary y-axis.
    pub y2: Option<String>,
    pub y2_fmt: Option<String>,
    pub y2_series_type: Option<Y2SeriesType>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarChartAttrs {
    pub axis: AxisChartAttrs,
    pub horizontal: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PieChartAttrs {
    pub data: Option<String>,
    /// Column holding slice names.
    pub name: Option<String>,
    /// Column holding slice values.
    pub value: Option<String>,
    pub title: Option<String>,
    pub fmt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTableAttrs {
    pub data: Option<String>,
    pub columns: Option<Vec<String>>,
    /// Column format map, e.g. `"revenue:eur2,date:shortdate"`.
    pub fmt: Option<String>,
    pub rows: Option<TableRows>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateRangeAttrs {
    pub name: Option<String>,
    pub label: Option<String>,
    /// Explicit target query names; absent means "every time-dimension query".
    pub queries: Option<Vec<String>>,
    /// Declared default preset key.
    pub default: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DropdownAttrs {
    pub name: Option<String>,
    pub label: Option<String>,
    /// Query supplying the dropdown's option list.
    pub data: Option<String>,
    /// Dimension the dropdown filters on, possibly view-qualified.
    pub dimension: Option<String>,
    /// Explicit target query names; dropdowns never broadcast.
    pub queries: Option<Vec<String>>,
    pub default: Option<String>,
}

/// A parsed component with typed attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    BigValue(BigValueAttrs),
    LineChart(AxisChartAttrs),
    BarChart(BarChartAttrs),
    AreaChart(AxisChartAttrs),
    DataTable(DataTableAttrs),
    PieChart(PieChartAttrs),
    DateRange(DateRangeAttrs),
    Dropdown(DropdownAttrs),
}

impl Component {
    /// Convert a raw tag into its typed form. Numeric and boolean
    /// attributes are parsed here; malformed values fall back with a
    /// warning rather than failing the whole document.
    pub fn from_raw(tag: RawComponentTag) -> Self {
        let mut attrs = tag.attrs;
        match tag.kind {
            ComponentKind::BigValue => Component::BigValue(BigValueAttrs {
                data: attrs.shift_remove("data"),
                value: attrs.shift_remove("value"),
                title: attrs.shift_remove("title"),
                fmt: attrs.shift_remove("fmt"),
                comparison: attrs.shift_remove("comparison"),
                comparison_fmt: attrs.shift_remove("comparisonFmt"),
                comparison_title: attrs.shift_remove("comparisonTitle"),
                down_is_good: bool_attr(&mut attrs, "downIsGood"),
            }),
            ComponentKind::LineChart => Component::LineChart(axis_attrs(&mut attrs)),
            ComponentKind::AreaChart => Component::AreaChart(axis_attrs(&mut attrs)),
            ComponentKind::BarChart => {
                let axis = axis_attrs(&mut attrs);
                Component::BarChart(BarChartAttrs {
                    axis,
                    horizontal: bool_attr(&mut attrs, "horizontal"),
                })
            }
            ComponentKind::PieChart => Component::PieChart(PieChartAttrs {
                data: attrs.shift_remove("data"),
                name: attrs.shift_remove("name"),
                value: attrs.shift_remove("value"),
                title: attrs.shift_remove("title"),
                fmt: attrs.shift_remove("fmt"),
            }),
            ComponentKind::DataTable => Component::DataTable(DataTableAttrs {
                data: attrs.shift_remove("data"),
                columns: list_attr(&mut attrs, "columns"),
                fmt: attrs.shift_remove("fmt"),
                rows: rows_attr(&mut attrs),
                title: attrs.shift_remove("title"),
            }),
            ComponentKind::DateRange => Component::DateRange(DateRangeAttrs {
                name: attrs.shift_remove("name"),
                label: attrs.shift_remove("label"),
                queries: list_attr(&mut attrs, "queries"),
                default: attrs.shift_remove("default"),
            }),
            ComponentKind::Dropdown => Component::Dropdown(DropdownAttrs {
                name: attrs.shift_remove("name"),
                label: attrs.shift_remove("label"),
                data: attrs.shift_remove("data"),
                dimension: attrs.shift_remove("dimension"),
                queries: list_attr(&mut attrs, "queries"),
                default: attrs.shift_remove("default"),
            }),
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::BigValue(_) => ComponentKind::BigValue,
            Component::LineChart(_) => ComponentKind::LineChart,
            Component::BarChart(_) => ComponentKind::BarChart,
            Component::AreaChart(_) => ComponentKind::AreaChart,
            Component::DataTable(_) => ComponentKind::DataTable,
            Component::PieChart(_) => ComponentKind::PieChart,
            Component::DateRange(_) => ComponentKind::DateRange,
            Component::Dropdown(_) => ComponentKind::Dropdown,
        }
    }

    pub fn is_input(&self) -> bool {
        self.kind().is_input()
    }

    /// The query this component reads rows from, if any.
    pub fn data_ref(&self) -> Option<&str> {
        match self {
            Component::BigValue(a) => a.data.as_deref(),
            Component::LineChart(a) | Component::AreaChart(a) => a.data.as_deref(),
            Component::BarChart(a) => a.axis.data.as_deref(),
            Component::DataTable(a) => a.data.as_deref(),
            Component::PieChart(a) => a.data.as_deref(),
            Component::DateRange(_) => None,
            Component::Dropdown(a) => a.data.as_deref(),
        }
    }

    /// The declared input name (input kinds only).
    pub fn input_name(&self) -> Option<&str> {
        match self {
            Component::DateRange(a) => a.name.as_deref(),
            Component::Dropdown(a) => a.name.as_deref(),
            _ => None,
        }
    }
}

fn axis_attrs(attrs: &mut IndexMap<String, String>) -> AxisChartAttrs {
    AxisChartAttrs {
        data: attrs.shift_remove("data"),
        x: attrs.shift_remove("x"),
        y: attrs.shift_remove("y"),
        title: attrs.shift_remove("title"),
        series: attrs.shift_remove("series"),
        mode: attrs.shift_remove("type").and_then(|raw| match raw.as_str() {
            "stacked" => Some(SeriesMode::Stacked),
            "grouped" => Some(SeriesMode::Grouped),
            other => {
                warn!(mode = other, "unknown series mode, ignoring");
                None
            }
        }),
        y_fmt: attrs.shift_remove("yFmt"),
        y2: attrs.shift_remove("y2"),
        y2_fmt: attrs.shift_remove("y2Fmt"),
        y2_series_type: attrs
            .shift_remove("y2SeriesType")
            .and_then(|raw| match raw.as_str() {
                "line" => Some(Y2SeriesType::Line),
                "bar" => Some(Y2SeriesType::Bar),
                "area" => Some(Y2SeriesType::Area),
                other => {
                    warn!(kind = other, "unknown y2 series type, ignoring");
                    None
                }
            }),
    }
}

fn bool_attr(attrs: &mut IndexMap<String, String>, key: &str) -> bool {
    attrs
        .shift_remove(key)
        .map(|raw| raw == "true")
        .unwrap_or(false)
}

fn list_attr(attrs: &mut IndexMap<String, String>, key: &str) -> Option<Vec<String>> {
    attrs.shift_remove(key).map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}

fn rows_attr(attrs: &mut IndexMap<String, String>) -> Option<TableRows> {
    let raw = attrs.shift_remove("rows")?;
    if raw == "all" {
        return Some(TableRows::All);
    }
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Some(TableRows::Count(n)),
        _ => {
            warn!(rows = raw.as_str(), "invalid rows attribute, using default");
            None
        }
    }
}
