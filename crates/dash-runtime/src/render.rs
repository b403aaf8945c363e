//! Render-tree production
//!
//! Resolves the parsed section tree against current per-query runtime
//! state into a tree of render nodes for the host UI: sanitized markup,
//! grids, chart payloads, and non-fatal placeholders. Configuration
//! problems (missing data reference, unknown query) degrade to inline
//! placeholders; they never abort the rest of the tree.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

use dash_charts::payload::{self, AxisKind};
use dash_charts::{AxisChartPayload, BigValuePayload, PiePayload, TablePayload};
use dash_core::{
    Component, ComponentKind, DateRangePreset, DateRangeValue, InputState, InputValue, Row,
    Section, Theme, ThemeBase,
};
use dash_parser::ParsedDashboard;

use crate::controller::QueryRuntimeState;
use crate::sanitize::HtmlSanitizer;

/// Single-value displays are auto-grouped into rows of at most this many
/// columns.
const VALUE_ROW_MAX_COLS: u8 = 4;

/// Fully resolved dashboard, ready for the host UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedDashboard {
    pub title: String,
    pub description: Option<String>,
    pub theme: Theme,
    pub inputs: Vec<InputView>,
    pub nodes: Vec<RenderNode>,
}

/// One input widget with its current value and options.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputView {
    pub name: String,
    pub label: Option<String>,
    pub control: InputControl,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InputControl {
    DateRange {
        value: DateRangeValue,
        /// `(preset key, display label)` option pairs, in fixed order.
        options: Vec<(String, String)>,
    },
    Dropdown {
        selected: Option<String>,
        /// Distinct values drawn from the option-source query's rows.
        options: Vec<String>,
    },
}

/// One node of the resolved render tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RenderNode {
    /// Sanitized markup fragment.
    Html(String),
    Grid {
        cols: u8,
        children: Vec<RenderNode>,
    },
    BigValue(BigValuePayload),
    AxisChart(AxisChartPayload),
    PieChart(PiePayload),
    DataTable(TablePayload),
    Placeholder(Placeholder),
}

/// Non-fatal inline states rendered in place of a component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Placeholder {
    /// Display tag with no `data` attribute.
    MissingData { kind: ComponentKind },
    /// `data` references a query name the document does not define.
    UnknownQuery { kind: ComponentKind, query: String },
    Loading { query: String },
    QueryFailed { query: String, message: String },
    /// Query succeeded with zero rows; distinct from loading and error.
    Empty { query: String },
}

pub(crate) fn render_dashboard(
    parsed: &ParsedDashboard,
    input_state: &InputState,
    queries: &IndexMap<String, QueryRuntimeState>,
    sanitizer: &dyn HtmlSanitizer,
    base: ThemeBase,
) -> RenderedDashboard {
    let overrides: Vec<_> = parsed.frontmatter.theme.iter().collect();
    let theme = Theme::resolve(base, &overrides);

    let inputs = parsed
        .inputs
        .iter()
        .filter_map(|input| input_view(input, input_state, queries))
        .collect();

    let nodes = grouped_top_level(&parsed.sections)
        .into_iter()
        .map(|group| match group {
            Grouped::One(section) => render_section(section, parsed, queries, sanitizer),
            Grouped::ValueRow(run) => {
                let children = run
                    .iter()
                    .map(|section| render_section(section, parsed, queries, sanitizer))
                    .collect();
                RenderNode::Grid {
                    cols: (run.len() as u8).min(VALUE_ROW_MAX_COLS),
                    children,
                }
            }
        })
        .collect();

    RenderedDashboard {
        title: parsed.frontmatter.title.clone(),
        description: parsed.frontmatter.description.clone(),
        theme,
        inputs,
        nodes,
    }
}

enum Grouped<'a> {
    One(&'a Section),
    /// Two or more adjacent single-value displays.
    ValueRow(Vec<&'a Section>),
}

/// Group adjacent top-level BigValue components into synthetic value rows.
/// Purely a presentation transform over the parsed section list.
fn grouped_top_level(sections: &[Section]) -> Vec<Grouped<'_>> {
    let mut out = Vec::new();
    let mut run: Vec<&Section> = Vec::new();

    for section in sections {
        let is_big_value =
            matches!(section, Section::Component(c) if c.kind() == ComponentKind::BigValue);
        if is_big_value {
            run.push(section);
        } else {
            flush_run(&mut run, &mut out);
            out.push(Grouped::One(section));
        }
    }
    flush_run(&mut run, &mut out);
    out
}

fn flush_run<'a>(run: &mut Vec<&'a Section>, out: &mut Vec<Grouped<'a>>) {
    match run.len() {
        0 => {}
        1 => out.push(Grouped::One(run[0])),
        _ => out.push(Grouped::ValueRow(std::mem::take(run))),
    }
    run.clear();
}

fn render_section(
    section: &Section,
    parsed: &ParsedDashboard,
    queries: &IndexMap<String, QueryRuntimeState>,
    sanitizer: &dyn HtmlSanitizer,
) -> RenderNode {
    match section {
        Section::Html(content) => RenderNode::Html(sanitizer.sanitize(content)),
        Section::Grid { cols, children } => RenderNode::Grid {
            cols: *cols,
            children: children
                .iter()
                .map(|child| render_section(child, parsed, queries, sanitizer))
                .collect(),
        },
        Section::Component(component) => render_component(component, parsed, queries),
    }
}

fn render_component(
    component: &Component,
    parsed: &ParsedDashboard,
    queries: &IndexMap<String, QueryRuntimeState>,
) -> RenderNode {
    let kind = component.kind();

    let Some(query) = component.data_ref() else {
        return RenderNode::Placeholder(Placeholder::MissingData { kind });
    };
    if !parsed.queries.contains_key(query) {
        return RenderNode::Placeholder(Placeholder::UnknownQuery {
            kind,
            query: query.to_string(),
        });
    }

    // No runtime entry yet means execution has not begun.
    let Some(state) = queries.get(query) else {
        return RenderNode::Placeholder(Placeholder::Loading {
            query: query.to_string(),
        });
    };
    if state.loading {
        return RenderNode::Placeholder(Placeholder::Loading {
            query: query.to_string(),
        });
    }
    if let Some(message) = &state.error {
        return RenderNode::Placeholder(Placeholder::QueryFailed {
            query: query.to_string(),
            message: message.clone(),
        });
    }
    let Some(rows) = &state.rows else {
        return RenderNode::Placeholder(Placeholder::Loading {
            query: query.to_string(),
        });
    };
    if rows.is_empty() {
        return RenderNode::Placeholder(Placeholder::Empty {
            query: query.to_string(),
        });
    }

    match component {
        Component::BigValue(attrs) => match payload::big_value(attrs, rows) {
            Some(value) => RenderNode::BigValue(value),
            None => RenderNode::Placeholder(Placeholder::Empty {
                query: query.to_string(),
            }),
        },
        Component::LineChart(attrs) => {
            RenderNode::AxisChart(payload::axis_chart(AxisKind::Line, attrs, false, rows))
        }
        Component::AreaChart(attrs) => {
            RenderNode::AxisChart(payload::axis_chart(AxisKind::Area, attrs, false, rows))
        }
        Component::BarChart(attrs) => RenderNode::AxisChart(payload::axis_chart(
            AxisKind::Bar,
            &attrs.axis,
            attrs.horizontal,
            rows,
        )),
        Component::PieChart(attrs) => RenderNode::PieChart(payload::pie_chart(attrs, rows)),
        Component::DataTable(attrs) => {
            RenderNode::DataTable(payload::data_table(attrs, rows, state.effective_limit))
        }
        Component::DateRange(_) | Component::Dropdown(_) => {
            // Parser hoists inputs out of the tree; reaching here means a
            // broken invariant upstream.
            warn!(kind = kind.tag_name(), "input component in section tree, skipping");
            RenderNode::Html(String::new())
        }
    }
}

fn input_view(
    input: &Component,
    input_state: &InputState,
    queries: &IndexMap<String, QueryRuntimeState>,
) -> Option<InputView> {
    let name = input.input_name()?;
    match input {
        Component::DateRange(attrs) => {
            let value = match input_state.get(name) {
                Some(InputValue::DateRange(value)) => value.clone(),
                _ => return None,
            };
            Some(InputView {
                name: name.to_string(),
                label: attrs.label.clone(),
                control: InputControl::DateRange {
                    value,
                    options: DateRangePreset::ALL
                        .iter()
                        .map(|p| (p.as_str().to_string(), p.label().to_string()))
                        .collect(),
                },
            })
        }
        Component::Dropdown(attrs) => {
            let selected = match input_state.get(name) {
                Some(InputValue::Dropdown(selected)) => selected.clone(),
                _ => None,
            };
            let options = attrs
                .data
                .as_deref()
                .and_then(|source| queries.get(source))
                .and_then(|state| state.rows.as_deref())
                .map(|rows| dropdown_options(rows, attrs.dimension.as_deref().unwrap_or_default()))
                .unwrap_or_default();
            Some(InputView {
                name: name.to_string(),
                label: attrs.label.clone(),
                control: InputControl::Dropdown { selected, options },
            })
        }
        _ => None,
    }
}

/// Distinct non-empty values for a dropdown, sorted. The dimension key is
/// matched exactly first, then by qualified-name suffix.
fn dropdown_options(rows: &[Row], dimension: &str) -> Vec<String> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let resolved = if first.contains_key(dimension) {
        dimension.to_string()
    } else {
        let suffix = format!(".{dimension}");
        first
            .keys()
            .find(|key| key.ends_with(&suffix))
            .cloned()
            .unwrap_or_else(|| dimension.to_string())
    };

    let mut values: Vec<String> = Vec::new();
    for row in rows {
        let label = match row.get(&resolved) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        if !label.is_empty() && !values.contains(&label) {
            values.push(label);
        }
    }
    values.sort();
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::StructuralSanitizer;
    use dash_parser::parse_dashboard;
    use serde_json::json;

    fn rows(data: serde_json::Value) -> Vec<Row> {
        data.as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn ready(data: serde_json::Value) -> QueryRuntimeState {
        QueryRuntimeState {
            loading: false,
            rows: Some(rows(data)),
            error: None,
            effective_limit: None,
        }
    }

    fn render(
        doc: &str,
        queries: IndexMap<String, QueryRuntimeState>,
    ) -> RenderedDashboard {
        let parsed = parse_dashboard(doc).unwrap();
        let inputs = crate::inputs::initial_input_state(&parsed.inputs, &[]);
        render_dashboard(&parsed, &inputs, &queries, &StructuralSanitizer, ThemeBase::Light)
    }

    #[test]
    fn test_missing_data_attr_placeholder() {
        let rendered = render("<BigValue value=\"v\" />\n", IndexMap::new());
        assert_eq!(
            rendered.nodes,
            vec![RenderNode::Placeholder(Placeholder::MissingData {
                kind: ComponentKind::BigValue
            })]
        );
    }

    #[test]
    fn test_unknown_query_placeholder() {
        let rendered = render("<DataTable data={ghost} />\n", IndexMap::new());
        assert!(matches!(
            &rendered.nodes[0],
            RenderNode::Placeholder(Placeholder::UnknownQuery { query, .. }) if query == "ghost"
        ));
    }

    #[test]
    fn test_loading_error_empty_states() {
        let doc = "\
```query q
measures: [m.v]
```

<DataTable data={q} />
";
        // Not yet executed: loading
        let rendered = render(doc, IndexMap::new());
        assert!(matches!(
            &rendered.nodes[0],
            RenderNode::Placeholder(Placeholder::Loading { .. })
        ));

        // Failed
        let mut queries = IndexMap::new();
        queries.insert(
            "q".to_string(),
            QueryRuntimeState {
                loading: false,
                rows: None,
                error: Some("boom".to_string()),
                effective_limit: None,
            },
        );
        let rendered = render(doc, queries);
        assert!(matches!(
            &rendered.nodes[0],
            RenderNode::Placeholder(Placeholder::QueryFailed { message, .. }) if message == "boom"
        ));

        // Zero rows: explicit empty state
        let mut queries = IndexMap::new();
        queries.insert("q".to_string(), ready(json!([])));
        let rendered = render(doc, queries);
        assert!(matches!(
            &rendered.nodes[0],
            RenderNode::Placeholder(Placeholder::Empty { .. })
        ));
    }

    #[test]
    fn test_adjacent_big_values_grouped() {
        let doc = "\
```query q
measures: [m.v]
```

<BigValue data={q} value=\"m.v\" />
<BigValue data={q} value=\"m.v\" />
<BigValue data={q} value=\"m.v\" />
";
        let mut queries = IndexMap::new();
        queries.insert("q".to_string(), ready(json!([{"m.v": 7}])));
        let rendered = render(doc, queries);
        assert_eq!(rendered.nodes.len(), 1);
        match &rendered.nodes[0] {
            RenderNode::Grid { cols, children } => {
                assert_eq!(*cols, 3);
                assert_eq!(children.len(), 3);
                assert!(matches!(children[0], RenderNode::BigValue(_)));
            }
            other => panic!("expected synthetic grid, got {other:?}"),
        }
    }

    #[test]
    fn test_value_row_caps_at_four_columns() {
        let doc = "\
```query q
measures: [m.v]
```

<BigValue data={q} value=\"m.v\" />
<BigValue data={q} value=\"m.v\" />
<BigValue data={q} value=\"m.v\" />
<BigValue data={q} value=\"m.v\" />
<BigValue data={q} value=\"m.v\" />
";
        let mut queries = IndexMap::new();
        queries.insert("q".to_string(), ready(json!([{"m.v": 7}])));
        let rendered = render(doc, queries);
        match &rendered.nodes[0] {
            RenderNode::Grid { cols, children } => {
                assert_eq!(*cols, 4);
                assert_eq!(children.len(), 5);
            }
            other => panic!("expected synthetic grid, got {other:?}"),
        }
    }

    #[test]
    fn test_html_sections_are_sanitized() {
        let doc = "# Title\n\n<script>evil()</script>\n\nSafe paragraph.\n";
        let rendered = render(doc, IndexMap::new());
        for node in &rendered.nodes {
            if let RenderNode::Html(html) = node {
                assert!(!html.contains("<script>"));
            }
        }
    }

    #[test]
    fn test_dropdown_options_from_source_rows() {
        let doc = "\
```query regions
dimensions: [sales.region]
```

```query revenue
measures: [sales.total]
```

<Dropdown name=\"region\" data={regions} dimension=\"sales.region\" queries=\"revenue\" />
<DataTable data={revenue} />
";
        let mut queries = IndexMap::new();
        queries.insert(
            "regions".to_string(),
            ready(json!([
                {"sales.region": "EMEA"},
                {"sales.region": "APAC"},
                {"sales.region": "EMEA"},
                {"sales.region": null},
            ])),
        );
        let rendered = render(doc, queries);
        assert_eq!(rendered.inputs.len(), 1);
        match &rendered.inputs[0].control {
            InputControl::Dropdown { options, selected } => {
                assert_eq!(options, &vec!["APAC".to_string(), "EMEA".to_string()]);
                assert_eq!(selected, &None);
            }
            other => panic!("expected dropdown control, got {other:?}"),
        }
    }

    #[test]
    fn test_theme_from_frontmatter() {
        let doc = "---\ntitle: Themed\ntheme:\n  palette: default\n---\n\nhello\n";
        let rendered = render(doc, IndexMap::new());
        assert_eq!(rendered.title, "Themed");
        assert_eq!(rendered.theme.palette[0], "#2563eb");
    }
}
