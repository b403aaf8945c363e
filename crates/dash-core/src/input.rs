//! Input widget values and state

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dates::DateRangePreset;

/// Resolved value of a date-range input: the chosen preset plus the
/// concrete ISO bounds it resolved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRangeValue {
    pub preset: DateRangePreset,
    pub range: (String, String),
}

/// Current value of one input widget.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    DateRange(DateRangeValue),
    /// `None` means "all": no filter applied.
    Dropdown(Option<String>),
}

/// Input name to current value, in input declaration order.
///
/// Seeded from declared defaults (or external seed params) at parse time,
/// mutated only by explicit user interaction, and replaced wholesale on
/// re-parse.
pub type InputState = IndexMap<String, InputValue>;
