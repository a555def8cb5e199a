//! Type-preserving substitution engine for templates

use serde_json::Value;

use super::token::{scan_leaf_tokens, scan_tokens, whole_token, TokenContext};
use super::types::{MissingValuePolicy, TemplateError, TemplateInput, TemplateResult, ValueMap};

/// Substitute `{{variable}}` placeholders in a JSON value.
///
/// A string that is exactly one token is replaced by the mapped value with its
/// own type; unknown names leave the token text in place. Tokens inside longer
/// strings are replaced by the stringified value.
pub fn substitute(template: &Value, values: &ValueMap) -> Value {
    match template {
        Value::String(s) => substitute_string(s, values),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| substitute(v, values)).collect()),
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(key, val)| (key.clone(), substitute(val, values)))
                .collect(),
        ),
        // Numbers, booleans, null are passed through as-is
        _ => template.clone(),
    }
}

fn substitute_string(template: &str, values: &ValueMap) -> Value {
    if let Some(name) = whole_token(template) {
        return match values.get(name) {
            Some(value) => value.clone(),
            None => Value::String(template.to_string()),
        };
    }

    let mut result = String::with_capacity(template.len());
    let mut last = 0;
    for token in scan_leaf_tokens(template) {
        result.push_str(&template[last..token.start]);
        match values.get(&token.name) {
            Some(value) => result.push_str(&stringify(value)),
            None => result.push_str(token.text(template)),
        }
        last = token.end;
    }
    result.push_str(&template[last..]);

    Value::String(result)
}

/// Text form of a value when spliced into a string: strings verbatim,
/// everything else as JSON
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Escape text for use inside an existing JSON string literal
fn escape_in_string(s: &str) -> String {
    let quoted = Value::String(s.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

fn render_value(value: &Value, context: TokenContext) -> String {
    match context {
        TokenContext::Bare => value.to_string(),
        TokenContext::QuotedSlot | TokenContext::InString => escape_in_string(&stringify(value)),
    }
}

fn render_text(text: &str, values: &ValueMap, neutralize_missing: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for token in scan_tokens(text) {
        out.push_str(&text[last..token.start]);
        match values.get(&token.name) {
            Some(value) => out.push_str(&render_value(value, token.context)),
            None if neutralize_missing => {
                out.push_str(if token.context.is_bare() { "null" } else { "" })
            }
            None => out.push_str(token.text(text)),
        }
        last = token.end;
    }
    out.push_str(&text[last..]);

    out
}

/// Substitute placeholders positionally in raw template text.
///
/// Inside string literals the value is inserted as escaped text; outside them
/// the value's JSON form is inserted so numbers, booleans and objects keep
/// their type. Unknown names are left verbatim. Runs in a single pass, so
/// substituted text is never scanned again.
pub fn substitute_in_text(text: &str, values: &ValueMap) -> String {
    render_text(text, values, false)
}

/// Names of tokens in `text` that have no value in `values`
pub fn unresolved_names(text: &str, values: &ValueMap) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for token in scan_tokens(text) {
        if !values.contains_key(&token.name) && !missing.contains(&token.name) {
            missing.push(token.name);
        }
    }
    missing
}

/// Build a request payload from template text.
///
/// Under [`MissingValuePolicy::Null`] unresolved tokens become `""` inside
/// strings and `null` elsewhere so the result still parses. If the result is
/// not JSON at all it is returned as a string payload.
pub fn render_payload(
    text: &str,
    values: &ValueMap,
    policy: MissingValuePolicy,
) -> TemplateResult<Value> {
    if policy == MissingValuePolicy::Reject {
        let missing = unresolved_names(text, values);
        if !missing.is_empty() {
            return Err(TemplateError::MissingValue(missing.join(", ")));
        }
    }

    let rendered = render_text(text, values, true);
    match serde_json::from_str(&rendered) {
        Ok(value) => Ok(value),
        Err(_) => Ok(Value::String(rendered)),
    }
}

/// Resolve a single request body for sending
pub fn resolve(template: &TemplateInput, values: &ValueMap) -> Value {
    match template {
        TemplateInput::Structured(value) => substitute(value, values),
        TemplateInput::Raw(text) => {
            let rendered = substitute_in_text(text, values);
            match serde_json::from_str(&rendered) {
                Ok(value) => value,
                Err(_) => Value::String(rendered),
            }
        }
    }
}
