//! Field paths into JSON values.
//!
//! Paths use `.` between object keys and `[n]` for array elements, e.g.
//! `products[0].title`. Non-empty arrays are addressed only through their
//! elements; an empty array (or empty object) is a leaf at its own path.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::template::neutralize_tokens;

lazy_static! {
    static ref OBJECT_KEY_RE: Regex = Regex::new(r#""((?:[^"\\\n]|\\.)*)"\s*:"#).unwrap();
}

/// One step of a parsed field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Path of an object member
pub fn child_key(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Path of an array element
pub fn child_index(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

/// Enumerate every addressable field path of `value` in document order
pub fn list_fields(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect(value, "", &mut out);
    out
}

fn collect(value: &Value, path: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) if map.is_empty() => {
            if !path.is_empty() {
                out.push(path.to_string());
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                collect(child, &child_key(path, key), out);
            }
        }
        Value::Array(items) if items.is_empty() => {
            out.push(if path.is_empty() {
                "[]".to_string()
            } else {
                path.to_string()
            });
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                collect(child, &child_index(path, index), out);
            }
        }
        _ => {
            if !path.is_empty() {
                out.push(path.to_string());
            }
        }
    }
}

/// Split a field path into key and index segments
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    if path.is_empty() || path == "[]" {
        return segments;
    }

    for part in path.split('.') {
        let key_end = part.find('[').unwrap_or(part.len());
        if key_end > 0 {
            segments.push(PathSegment::Key(part[..key_end].to_string()));
        }

        let mut rest = &part[key_end..];
        while let Some(open) = rest.strip_prefix('[') {
            let Some(close) = open.find(']') else {
                segments.push(PathSegment::Key(rest.to_string()));
                rest = "";
                break;
            };
            let inside = &open[..close];
            match inside.parse::<usize>() {
                Ok(index) => segments.push(PathSegment::Index(index)),
                Err(_) if inside.is_empty() => {}
                Err(_) => segments.push(PathSegment::Key(inside.to_string())),
            }
            rest = &open[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(PathSegment::Key(rest.to_string()));
        }
    }

    segments
}

/// Resolve a field path. Never fails: an unreachable path yields `None`.
pub fn get_at<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    parse_path(path)
        .iter()
        .try_fold(value, |current, segment| match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key),
            (PathSegment::Key(key), Value::Array(items)) => {
                key.parse::<usize>().ok().and_then(|i| items.get(i))
            }
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
            (PathSegment::Index(index), Value::Object(map)) => map.get(&index.to_string()),
            _ => None,
        })
}

/// Render a value for a report cell: strings verbatim, null and missing as
/// the empty string, everything else as compact JSON
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Look up a path and render it for display
pub fn display_at(value: &Value, path: &str) -> String {
    display_value(get_at(value, path))
}

/// Heuristic `"key":` scan used when text is not parseable JSON
pub fn scan_keys(text: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for caps in OBJECT_KEY_RE.captures_iter(text) {
        let key = caps[1].to_string();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Field paths of a request body template.
///
/// Tokens are neutralized first so bare placeholders do not break parsing;
/// if the text still is not JSON, fall back to scanning object keys.
pub fn template_fields(text: &str) -> Vec<String> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return list_fields(&value);
    }
    match serde_json::from_str::<Value>(&neutralize_tokens(text)) {
        Ok(value) => list_fields(&value),
        Err(_) => scan_keys(text),
    }
}
