//! Query-block extraction and body-to-markup conversion
//!
//! Walks the markdown body's block structure once: fenced code blocks
//! tagged `query <name>` are validated, recorded, and removed; everything
//! else is rendered to inline markup with embedded raw HTML passed
//! through (authors are trusted; sanitization happens at render time).

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use pulldown_cmark::{html, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;

use dash_core::QuerySpec;

static VALID_QUERY_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_$][a-zA-Z0-9_$]*$").expect("static regex"));

pub(crate) struct ExtractedBody {
    pub html: String,
    pub queries: IndexMap<String, QuerySpec>,
}

/// Extract query blocks from the body and render the rest to markup.
/// Validation problems are collected, never thrown, so one pass reports
/// everything. Query blocks are removed from the output whether or not
/// they were valid.
pub(crate) fn extract(body: &str, problems: &mut Vec<String>) -> ExtractedBody {
    let mut queries = IndexMap::new();
    let mut kept: Vec<Event> = Vec::new();

    // Info string of the query fence currently being consumed, if any.
    let mut pending: Option<String> = None;
    let mut block_body = String::new();

    for event in Parser::new_ext(body, Options::empty()) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info)))
                if is_query_fence(&info) =>
            {
                pending = Some(info.to_string());
                block_body.clear();
            }
            Event::Text(text) if pending.is_some() => block_body.push_str(&text),
            Event::End(TagEnd::CodeBlock) if pending.is_some() => {
                let info = pending.take().unwrap_or_default();
                record_query(&info, &block_body, &mut queries, problems);
            }
            other => kept.push(other),
        }
    }

    let mut out = String::new();
    html::push_html(&mut out, kept.into_iter());

    ExtractedBody {
        html: out,
        queries,
    }
}

fn is_query_fence(info: &str) -> bool {
    let mut words = info.split_whitespace();
    words.next() == Some("query")
}

/// Validate one query block and record it. Mirrors the aggregate-error
/// contract: each violation pushes a problem and skips the block, letting
/// independent problems elsewhere surface in the same parse.
fn record_query(
    info: &str,
    body: &str,
    queries: &mut IndexMap<String, QuerySpec>,
    problems: &mut Vec<String>,
) {
    let name = info
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();

    if name.is_empty() {
        problems.push("Query block must have a name: ```query my_query_name".to_string());
        return;
    }
    if !VALID_QUERY_NAME.is_match(&name) {
        problems.push(format!(
            "Invalid query name \"{name}\": must be a valid identifier (letters, numbers, _, $)"
        ));
        return;
    }
    if queries.contains_key(&name) {
        problems.push(format!("Duplicate query name \"{name}\""));
        return;
    }

    if body.trim().is_empty() {
        problems.push(format!(
            "Query \"{name}\" must specify measures or dimensions"
        ));
        return;
    }

    match serde_yaml::from_str::<QuerySpec>(body) {
        Ok(spec) if spec.has_fields() => {
            queries.insert(name, spec);
        }
        Ok(_) => problems.push(format!(
            "Query \"{name}\" must specify measures or dimensions"
        )),
        Err(err) => problems.push(format!("Query \"{name}\" has invalid YAML: {err}")),
    }
}
