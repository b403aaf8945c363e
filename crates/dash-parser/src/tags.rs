//! Component and grid tag scanning
//!
//! A small recursive-descent scan over the rendered markup: self-closing
//! component tags of the eight known kinds, and paired
//! `<Grid cols="N">...</Grid>` containers with correct nesting. Plain
//! string scanning, no regexes, so adversarial nesting cannot blow up
//! matching.
//!
//! Attribute values take three forms: `key={reference}`, `key="quoted"` /
//! `key='quoted'`, and bare `key` boolean shorthand (stored as `"true"`).
//! Attributes are separated by whitespace only; commas inside quoted
//! values are data.

use indexmap::IndexMap;
use tracing::warn;

use dash_core::section::clamp_grid_cols;
use dash_core::{Component, ComponentKind, RawComponentTag, Section};

const GRID_CLOSE: &str = "</Grid>";

pub(crate) struct ScanOutput {
    pub sections: Vec<Section>,
    /// Input components hoisted out of the tree, in document order.
    pub inputs: Vec<Component>,
}

/// Scan markup into a section tree, hoisting input components found at
/// any nesting depth into a flat list.
pub(crate) fn scan_sections(html: &str) -> ScanOutput {
    let mut inputs = Vec::new();
    let sections = scan_into(html, &mut inputs);
    ScanOutput { sections, inputs }
}

fn scan_into(html: &str, inputs: &mut Vec<Component>) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut flushed = 0;
    let mut pos = 0;

    while let Some(rel) = html[pos..].find('<') {
        let idx = pos + rel;
        match parse_tag(html, idx) {
            Some(hit) => {
                flush_html(&html[flushed..idx], &mut sections);
                match hit.tag {
                    TagMatch::Grid { cols, inner } => {
                        let children = scan_into(&html[inner.0..inner.1], inputs);
                        sections.push(Section::Grid { cols, children });
                    }
                    TagMatch::Component(raw) => {
                        let component = Component::from_raw(raw);
                        if component.is_input() {
                            inputs.push(component);
                        } else {
                            sections.push(Section::Component(component));
                        }
                    }
                    TagMatch::Dropped => {}
                }
                pos = idx + hit.consumed;
                flushed = pos;
            }
            None => pos = idx + 1,
        }
    }

    flush_html(&html[flushed..], &mut sections);
    sections
}

fn flush_html(text: &str, sections: &mut Vec<Section>) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        sections.push(Section::Html(trimmed.to_string()));
    }
}

struct TagHit {
    tag: TagMatch,
    /// Bytes consumed from the opening `<`.
    consumed: usize,
}

enum TagMatch {
    Grid { cols: u8, inner: (usize, usize) },
    Component(RawComponentTag),
    /// Unknown capitalized self-closing tag, dropped from output.
    Dropped,
}

/// Try to read a component or grid tag starting at the `<` at `idx`.
/// Returns `None` when this is not one of ours, leaving the `<` to be
/// treated as literal markup.
fn parse_tag(html: &str, idx: usize) -> Option<TagHit> {
    let rest = &html[idx + 1..];
    let name_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    if name_len == 0 {
        return None;
    }
    let name = &rest[..name_len];
    let after_name = &rest[name_len..];
    // A component tag always carries whitespace before its attributes or
    // closing slash.
    if !after_name.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }

    if name == "Grid" {
        return parse_grid(html, idx, name_len);
    }

    match ComponentKind::from_tag_name(name) {
        Some(kind) => {
            let (attrs, end) = parse_attrs_until(after_name, "/>")?;
            Some(TagHit {
                tag: TagMatch::Component(RawComponentTag { kind, attrs }),
                consumed: 1 + name_len + end,
            })
        }
        None if name.starts_with(|c: char| c.is_ascii_uppercase()) => {
            // Component-shaped but unrecognized: consume and drop.
            let (_, end) = parse_attrs_until(after_name, "/>")?;
            warn!(tag = name, "unrecognized component tag, dropping");
            Some(TagHit {
                tag: TagMatch::Dropped,
                consumed: 1 + name_len + end,
            })
        }
        None => None,
    }
}

fn parse_grid(html: &str, idx: usize, name_len: usize) -> Option<TagHit> {
    let after_name = idx + 1 + name_len;
    let (attrs, open_len) = parse_attrs_until(&html[after_name..], ">")?;
    let content_start = after_name + open_len;
    let content_len = find_matching_close(&html[content_start..])?;
    let cols = clamp_grid_cols(attrs.get("cols").map(String::as_str));
    Some(TagHit {
        tag: TagMatch::Grid {
            cols,
            inner: (content_start, content_start + content_len),
        },
        consumed: content_start + content_len + GRID_CLOSE.len() - idx,
    })
}

/// Find the end of this grid's content, accounting for nested grids.
/// Works on bytes so stray multi-byte text cannot land the cursor inside
/// a character.
fn find_matching_close(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 1usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(GRID_CLOSE.as_bytes()) {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
            i += GRID_CLOSE.len();
        } else if bytes[i..].starts_with(b"<Grid")
            && bytes
                .get(i + 5)
                .map(|b| b.is_ascii_whitespace())
                .unwrap_or(false)
        {
            depth += 1;
            i += 5;
        } else {
            i += 1;
        }
    }
    None
}

/// Scan whitespace-separated attributes up to `closer`, respecting quoted
/// values. Returns the attribute map and the bytes consumed including the
/// closer, or `None` if the closer never appears.
fn parse_attrs_until(s: &str, closer: &str) -> Option<(IndexMap<String, String>, usize)> {
    let mut attrs = IndexMap::new();
    let bytes = s.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i..].starts_with(closer.as_bytes()) {
            return Some((attrs, i + closer.len()));
        }
        let c = bytes[i] as char;
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if is_ident_start(c) {
            let start = i;
            while i < bytes.len() && is_ident_char(bytes[i] as char) {
                i += 1;
            }
            let key = s[start..i].to_string();
            if i < bytes.len() && bytes[i] == b'=' {
                match parse_value(s, i + 1) {
                    Some((value, next)) => {
                        attrs.insert(key, value);
                        i = next;
                    }
                    // Malformed value: keep the key as boolean shorthand
                    // and let the scanner resync on the stray text.
                    None => {
                        attrs.insert(key, "true".to_string());
                        i += 1;
                    }
                }
            } else {
                attrs.insert(key, "true".to_string());
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Parse one attribute value at `i`: `{reference}`, `"quoted"`, or
/// `'quoted'`. Returns the value and the index just past it.
fn parse_value(s: &str, i: usize) -> Option<(String, usize)> {
    let bytes = s.as_bytes();
    match bytes.get(i)? {
        b'{' => {
            let end = s[i + 1..].find('}')? + i + 1;
            Some((s[i + 1..end].trim().to_string(), end + 1))
        }
        b'"' => {
            let end = s[i + 1..].find('"')? + i + 1;
            Some((s[i + 1..end].to_string(), end + 1))
        }
        b'\'' => {
            let end = s[i + 1..].find('\'')? + i + 1;
            Some((s[i + 1..end].to_string(), end + 1))
        }
        _ => None,
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}
