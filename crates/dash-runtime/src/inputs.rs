//! Input-to-query filter compiler
//!
//! Rewrites a base query spec into the effective, per-query spec implied
//! by the current input state: date-range overrides on time-dimension
//! queries and dimension filters from dropdowns. The base spec is never
//! mutated.

use chrono::Local;
use tracing::warn;

use dash_core::dates::DEFAULT_PRESET;
use dash_core::{
    short_field_name, Component, DateRangeAttrs, DateRangePreset, DateRangeValue, DropdownAttrs,
    Filter, FilterOperator, InputState, InputValue, QuerySpec,
};
use dash_parser::ParsedDashboard;

/// Build the initial input state from declared defaults, optionally
/// overridden by externally supplied seed params (URL reflection).
pub fn initial_input_state(inputs: &[Component], seed: &[(String, String)]) -> InputState {
    let mut state = InputState::new();
    let today = Local::now().date_naive();

    for input in inputs {
        let Some(name) = input.input_name() else {
            continue;
        };
        let seeded = seed
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str());

        match input {
            Component::DateRange(attrs) => {
                let preset = pick_preset(seeded, attrs.default.as_deref());
                let range = preset.resolve(today);
                state.insert(
                    name.to_string(),
                    InputValue::DateRange(DateRangeValue { preset, range }),
                );
            }
            Component::Dropdown(attrs) => {
                let selection = match seeded {
                    Some("") => None,
                    Some(value) => Some(value.to_string()),
                    None => attrs.default.clone().filter(|d| !d.is_empty()),
                };
                state.insert(name.to_string(), InputValue::Dropdown(selection));
            }
            _ => {}
        }
    }

    state
}

/// First parsable preset among seed value, declared default, and the
/// hardcoded fallback.
fn pick_preset(seeded: Option<&str>, declared: Option<&str>) -> DateRangePreset {
    for candidate in [seeded, declared].into_iter().flatten() {
        match DateRangePreset::parse(candidate) {
            Some(preset) => return preset,
            None => warn!(
                preset = candidate,
                fallback = DEFAULT_PRESET.as_str(),
                "unknown date preset"
            ),
        }
    }
    DEFAULT_PRESET
}

/// Serialize the current input state as flat key/value pairs: date inputs
/// as their preset key, dropdowns as the selected string (empty for
/// "all").
pub fn input_state_to_params(state: &InputState) -> Vec<(String, String)> {
    state
        .iter()
        .map(|(name, value)| {
            let serialized = match value {
                InputValue::DateRange(v) => v.preset.as_str().to_string(),
                InputValue::Dropdown(Some(selected)) => selected.clone(),
                InputValue::Dropdown(None) => String::new(),
            };
            (name.clone(), serialized)
        })
        .collect()
}

/// Apply all active inputs to one query's spec, in input declaration
/// order. Returns a modified copy.
pub fn apply_inputs_to_query(
    query_name: &str,
    base: &QuerySpec,
    inputs: &[Component],
    state: &InputState,
) -> QuerySpec {
    let mut spec = base.clone();

    for input in inputs {
        let Some(name) = input.input_name() else {
            continue;
        };
        let Some(value) = state.get(name) else {
            continue;
        };
        match (input, value) {
            (Component::DateRange(attrs), InputValue::DateRange(range)) => {
                apply_date_range(query_name, &mut spec, attrs, range);
            }
            (Component::Dropdown(attrs), InputValue::Dropdown(selection)) => {
                apply_dropdown(query_name, &mut spec, attrs, selection.as_deref());
            }
            _ => {}
        }
    }

    spec
}

/// The query subset one input re-executes when it changes.
///
/// DateRange broadcasts to every time-dimension query unless an explicit
/// target list narrows it; Dropdown only ever touches its explicit
/// targets, minus its own option-source query.
pub fn affected_queries(input: &Component, parsed: &ParsedDashboard) -> Vec<String> {
    match input {
        Component::DateRange(attrs) => match &attrs.queries {
            Some(targets) => targets.clone(),
            None => parsed
                .queries
                .iter()
                .filter(|(_, spec)| spec.time_dimension.is_some())
                .map(|(name, _)| name.clone())
                .collect(),
        },
        Component::Dropdown(attrs) => attrs
            .queries
            .clone()
            .unwrap_or_default()
            .into_iter()
            .filter(|name| attrs.data.as_deref() != Some(name.as_str()))
            .collect(),
        _ => Vec::new(),
    }
}

/// Date ranges only touch queries that declare a time dimension.
fn apply_date_range(
    query_name: &str,
    spec: &mut QuerySpec,
    attrs: &DateRangeAttrs,
    value: &DateRangeValue,
) {
    let Some(time_dimension) = spec.time_dimension.as_mut() else {
        return;
    };
    if let Some(targets) = &attrs.queries {
        if !targets.iter().any(|t| t == query_name) {
            return;
        }
    }
    time_dimension.date_range = Some(value.range.clone());
}

fn apply_dropdown(
    query_name: &str,
    spec: &mut QuerySpec,
    attrs: &DropdownAttrs,
    selection: Option<&str>,
) {
    let Some(dimension) = attrs.dimension.as_deref() else {
        return;
    };
    // Dropdowns never broadcast: an explicit target list is required.
    let Some(targets) = &attrs.queries else {
        return;
    };
    // Never filter the query that supplies this dropdown's own options.
    if attrs.data.as_deref() == Some(query_name) {
        return;
    }
    if !targets.iter().any(|t| t == query_name) {
        return;
    }

    let field = short_field_name(dimension).to_string();

    // "All" removes any existing filter on this dimension.
    let Some(selection) = selection.filter(|s| !s.is_empty()) else {
        if let Some(filters) = spec.filters.as_mut() {
            filters.retain(|f| short_field_name(&f.dimension) != field);
            if filters.is_empty() {
                spec.filters = None;
            }
        }
        return;
    };

    let resolved = resolve_filter_dimension(dimension, spec);
    let filter = Filter {
        dimension: resolved,
        operator: FilterOperator::Equals,
        values: vec![selection.to_string()],
    };

    let filters = spec.filters.get_or_insert_with(Vec::new);
    match filters
        .iter_mut()
        .find(|f| short_field_name(&f.dimension) == field)
    {
        Some(existing) => *existing = filter,
        None => filters.push(filter),
    }
}

/// Resolve a dropdown's dimension name against a target query's fields.
///
/// Prefers an exact match on the unqualified field name. Failing that,
/// re-qualifies with the view prefix of the target's first field. That
/// fallback is a heuristic and can mis-resolve ambiguous multi-view
/// queries; it is kept for compatibility with existing dashboards.
fn resolve_filter_dimension(dimension: &str, target: &QuerySpec) -> String {
    let field = short_field_name(dimension);

    let mut fields = target.all_fields().peekable();
    let Some(first) = fields.peek().copied() else {
        return dimension.to_string();
    };

    if let Some(exact) = target.all_fields().find(|f| short_field_name(f) == field) {
        return exact.to_string();
    }

    match first.find('.') {
        Some(idx) => format!("{}.{}", &first[..idx], field),
        None => dimension.to_string(),
    }
}
