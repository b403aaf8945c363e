//! Frontmatter extraction
//!
//! A document may open with a `---` fenced YAML block carrying title,
//! description, and an optional theme override. A `theme.palette` value
//! may be a literal color list or a name resolved here against the fixed
//! palette table.

use serde_yaml::Value;
use tracing::warn;

use dash_core::theme::{palette_by_name, PaletteRef, ThemeOverride};

use crate::Frontmatter;

/// Split leading frontmatter off the document. Returns the parsed
/// metadata and the remaining body. Malformed frontmatter YAML is
/// collected as a problem; the body is still processed so other problems
/// surface in the same pass.
pub(crate) fn split<'a>(raw: &'a str, problems: &mut Vec<String>) -> (Frontmatter, &'a str) {
    let Some(rest) = raw.strip_prefix("---") else {
        return (Frontmatter::default(), raw);
    };
    // The opening fence must be a line of its own.
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return (Frontmatter::default(), raw);
    };

    let Some(close) = find_closing_fence(rest) else {
        return (Frontmatter::default(), raw);
    };
    let (yaml, body) = (&rest[..close.start], &rest[close.end..]);

    match serde_yaml::from_str::<Value>(yaml) {
        Ok(value) => (from_yaml(value, problems), body),
        Err(err) => {
            problems.push(format!("Frontmatter has invalid YAML: {err}"));
            (Frontmatter::default(), body)
        }
    }
}

struct Fence {
    start: usize,
    end: usize,
}

/// Find the first `---` line after the opening fence.
fn find_closing_fence(rest: &str) -> Option<Fence> {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some(Fence {
                start: offset,
                end: offset + line.len(),
            });
        }
        offset += line.len();
    }
    None
}

/// Pick the known keys out of the frontmatter mapping. Unknown keys are
/// ignored; wrongly-typed known keys fall back to defaults.
fn from_yaml(value: Value, problems: &mut Vec<String>) -> Frontmatter {
    let mut frontmatter = Frontmatter::default();
    let Value::Mapping(mapping) = value else {
        return frontmatter;
    };

    if let Some(Value::String(title)) = mapping.get("title") {
        frontmatter.title = title.clone();
    }
    if let Some(Value::String(description)) = mapping.get("description") {
        frontmatter.description = Some(description.clone());
    }
    if let Some(theme) = mapping.get("theme") {
        match serde_yaml::from_value::<ThemeOverride>(theme.clone()) {
            Ok(mut theme) => {
                resolve_palette(&mut theme);
                frontmatter.theme = Some(theme);
            }
            Err(err) => problems.push(format!("Frontmatter theme is invalid: {err}")),
        }
    }

    frontmatter
}

/// Resolve a named palette to its literal colors at the parser boundary,
/// so the theme pipeline downstream only ever sees concrete lists from
/// frontmatter. Unknown names drop the override.
fn resolve_palette(theme: &mut ThemeOverride) {
    if let Some(PaletteRef::Name(name)) = &theme.palette {
        match palette_by_name(name) {
            Some(colors) => {
                theme.palette = Some(PaletteRef::List(
                    colors.iter().map(|c| c.to_string()).collect(),
                ));
            }
            None => {
                warn!(palette = name.as_str(), "unknown palette in frontmatter, ignoring");
                theme.palette = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_basic() {
        let doc = "---\ntitle: Sales\ndescription: All the sales\n---\n\n# Body\n";
        let mut problems = Vec::new();
        let (fm, body) = split(doc, &mut problems);
        assert!(problems.is_empty());
        assert_eq!(fm.title, "Sales");
        assert_eq!(fm.description.as_deref(), Some("All the sales"));
        assert_eq!(body.trim(), "# Body");
    }

    #[test]
    fn test_no_frontmatter() {
        let mut problems = Vec::new();
        let (fm, body) = split("# Just body\n", &mut problems);
        assert_eq!(fm.title, "Untitled Dashboard");
        assert_eq!(body, "# Just body\n");
    }

    #[test]
    fn test_unclosed_fence_is_body() {
        let mut problems = Vec::new();
        let (_, body) = split("---\ntitle: Oops\n", &mut problems);
        assert!(problems.is_empty());
        assert_eq!(body, "---\ntitle: Oops\n");
    }

    #[test]
    fn test_invalid_yaml_collected() {
        let doc = "---\ntitle: [unclosed\n---\nbody\n";
        let mut problems = Vec::new();
        let (fm, body) = split(doc, &mut problems);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("Frontmatter has invalid YAML"));
        assert_eq!(fm.title, "Untitled Dashboard");
        assert_eq!(body.trim(), "body");
    }

    #[test]
    fn test_non_string_title_falls_back() {
        let doc = "---\ntitle: 42\n---\nbody\n";
        let mut problems = Vec::new();
        let (fm, _) = split(doc, &mut problems);
        assert!(problems.is_empty());
        assert_eq!(fm.title, "Untitled Dashboard");
    }

    #[test]
    fn test_named_palette_resolved() {
        let doc = "---\ntheme:\n  palette: observable\n---\n";
        let mut problems = Vec::new();
        let (fm, _) = split(doc, &mut problems);
        match fm.theme.unwrap().palette {
            Some(PaletteRef::List(colors)) => assert_eq!(colors[0], "#4269d0"),
            other => panic!("expected resolved list, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_palette_dropped() {
        let doc = "---\ntheme:\n  palette: neon\n  chartHeight: 280\n---\n";
        let mut problems = Vec::new();
        let (fm, _) = split(doc, &mut problems);
        let theme = fm.theme.unwrap();
        assert_eq!(theme.palette, None);
        assert_eq!(theme.chart_height, Some(280));
    }
}
