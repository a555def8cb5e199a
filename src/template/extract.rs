//! Placeholder detection

use serde_json::Value;

use super::token::{scan_leaf_tokens, token_names};
use super::types::{PlaceholderMeta, TemplateInput};
use crate::fields::{child_index, child_key};

/// Collect the distinct placeholders of a template in first-seen order
pub fn extract(template: &TemplateInput) -> Vec<PlaceholderMeta> {
    match template {
        TemplateInput::Structured(value) => extract_from_value(value),
        TemplateInput::Raw(text) => extract_from_text(text),
    }
}

/// Walk every string leaf of a JSON value. The placeholder path is the field
/// path of the leaf where the name first appears.
pub fn extract_from_value(value: &Value) -> Vec<PlaceholderMeta> {
    let mut found = Vec::new();
    visit(value, "", &mut found);
    found
}

fn visit(value: &Value, path: &str, found: &mut Vec<PlaceholderMeta>) {
    match value {
        Value::String(s) => {
            for token in scan_leaf_tokens(s) {
                if found.iter().any(|p| p.name == token.name) {
                    continue;
                }
                let meta_path = if path.is_empty() {
                    token.name.clone()
                } else {
                    path.to_string()
                };
                found.push(PlaceholderMeta::new(token.name, meta_path));
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                visit(item, &child_index(path, index), found);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                visit(item, &child_key(path, key), found);
            }
        }
        _ => {}
    }
}

/// Scan raw text directly; each placeholder path is its own name
pub fn extract_from_text(text: &str) -> Vec<PlaceholderMeta> {
    token_names(text)
        .into_iter()
        .map(|name| PlaceholderMeta::new(name.clone(), name))
        .collect()
}

/// Detect placeholders in editor text: structurally when the text parses as
/// JSON, by raw scanning otherwise
pub fn detect_placeholders(text: &str) -> Vec<PlaceholderMeta> {
    extract(&TemplateInput::parse(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_structured_paths() {
        let template = json!({
            "userId": "{{user_id}}",
            "post": {"title": "New: {{post_title}}", "tags": ["{{tag}}", "{{user_id}}"]}
        });
        let found = extract_from_value(&template);
        let names: Vec<_> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["user_id", "post_title", "tag"]);
        assert_eq!(found[0].path, "userId");
        assert_eq!(found[2].path, "post.tags[0]");
    }

    #[test]
    fn test_extract_raw_text_fallback() {
        let found = detect_placeholders(r#"{"a": {{x}}, "b": "{{y}}", "c": {{x}}}"#);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], PlaceholderMeta::new("x", "x"));
        assert_eq!(found[1].path, "y");
    }

    #[test]
    fn test_extract_counts_distinct_names() {
        let text = r#"{"a": "{{n}}-{{n}}", "b": ["{{m}}", "{{ n }}"]}"#;
        assert_eq!(detect_placeholders(text).len(), 2);
    }

    #[test]
    fn test_extract_leaf_with_quote_and_backslash() {
        let found = extract_from_value(&json!({"p": "5\" of C:\\{{dir}}"}));
        assert_eq!(found, vec![PlaceholderMeta::new("dir", "p")]);
    }

    #[test]
    fn test_extract_ignores_malformed_and_empty() {
        assert!(detect_placeholders(r#"{"a": "{{1bad}}"}"#).is_empty());
        assert!(detect_placeholders("").is_empty());
        assert!(extract_from_value(&json!({"n": 1, "b": true})).is_empty());
    }
}
