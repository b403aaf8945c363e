//! Pure chart-side transforms
//!
//! Everything here is a pure function from rows (as returned by the query
//! client) to the resolved structures an external chart engine consumes:
//! pivoted series, formatted display strings, and per-kind chart payloads.
//! No drawing, no state.

pub mod format;
pub mod payload;
pub mod series;
pub mod util;

pub use format::{apply_format, auto_format, parse_format_map, EM_DASH};
pub use payload::{
    axis_chart, big_value, data_table, pie_chart, AxisChartPayload, AxisKind, BigValuePayload,
    ComparisonPayload, PiePayload, PieSlice, TableColumn, TablePayload,
};
pub use series::{build_series, Dataset, SeriesData};
