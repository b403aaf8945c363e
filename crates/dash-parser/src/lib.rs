//! Dashboard document parser
//!
//! Turns a markdown-like dashboard document into a typed
//! [`ParsedDashboard`]: frontmatter, a named query map, a flat list of
//! input components, and a tree of layout sections. All validation
//! problems found in one pass are collected and reported together in a
//! single [`ParseError`] rather than failing on the first.

mod blocks;
mod frontmatter;
mod tags;

use indexmap::IndexMap;
use thiserror::Error;

use dash_core::{Component, QuerySpec, Section, ThemeOverride};

/// Every structural/validation problem found in one parse, in discovery
/// order. Fatal to the whole render: nothing downstream can be trusted.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("dashboard parse errors:\n- {}", .problems.join("\n- "))]
pub struct ParseError {
    pub problems: Vec<String>,
}

/// Parsed frontmatter metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Frontmatter {
    pub title: String,
    pub description: Option<String>,
    pub theme: Option<ThemeOverride>,
}

impl Default for Frontmatter {
    fn default() -> Self {
        Self {
            title: "Untitled Dashboard".to_string(),
            description: None,
            theme: None,
        }
    }
}

/// Full output of [`parse_dashboard`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDashboard {
    pub frontmatter: Frontmatter,
    /// Query name to spec, in declaration order. Names are unique.
    pub queries: IndexMap<String, QuerySpec>,
    /// Input components hoisted out of the section tree, in declaration
    /// order.
    pub inputs: Vec<Component>,
    pub sections: Vec<Section>,
}

/// Parse a dashboard document.
///
/// Steps: split frontmatter, extract and validate named query blocks from
/// the markdown body, convert the remainder to inline markup, then scan it
/// for component and grid tags. Input components found at any nesting
/// depth are hoisted into the flat `inputs` list.
pub fn parse_dashboard(raw: &str) -> Result<ParsedDashboard, ParseError> {
    let mut problems = Vec::new();

    let (frontmatter, body) = frontmatter::split(raw, &mut problems);
    let extracted = blocks::extract(body, &mut problems);
    let scanned = tags::scan_sections(&extracted.html);

    validate_inputs(&scanned.inputs, &mut problems);

    if !problems.is_empty() {
        return Err(ParseError { problems });
    }

    Ok(ParsedDashboard {
        frontmatter,
        queries: extracted.queries,
        inputs: scanned.inputs,
        sections: scanned.sections,
    })
}

/// Every input needs a non-empty, unique name: runtime state is keyed on
/// it.
fn validate_inputs(inputs: &[Component], problems: &mut Vec<String>) {
    let mut seen: Vec<&str> = Vec::new();
    for input in inputs {
        match input.input_name() {
            None | Some("") => problems.push(format!(
                "Input <{}> is missing a \"name\" attribute",
                input.kind().tag_name()
            )),
            Some(name) => {
                if seen.contains(&name) {
                    problems.push(format!("Duplicate input name \"{name}\""));
                } else {
                    seen.push(name);
                }
            }
        }
    }
}
