//! Core document model for the dashboard platform
//!
//! This crate provides the shared vocabulary between the parser, the chart
//! transforms, and the reactive runtime: query specifications, component
//! tags, layout sections, input values, date presets, themes, and the
//! external query-client contract.

pub mod client;
pub mod component;
pub mod dates;
pub mod input;
pub mod query;
pub mod section;
pub mod theme;

// Re-export commonly used types
pub use client::{QueryClient, QueryResponse, Row, DEFAULT_QUERY_LIMIT};
pub use component::{
    AxisChartAttrs, BarChartAttrs, BigValueAttrs, Component, ComponentKind, DataTableAttrs,
    DateRangeAttrs, DropdownAttrs, PieChartAttrs, RawComponentTag, SeriesMode, TableRows,
    Y2SeriesType,
};
pub use dates::DateRangePreset;
pub use input::{DateRangeValue, InputState, InputValue};
pub use query::{short_field_name, Filter, FilterOperator, QuerySpec, TimeDimension};
pub use section::Section;
pub use theme::{PaletteRef, Theme, ThemeBase, ThemeOverride};
