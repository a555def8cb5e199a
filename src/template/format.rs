//! Pretty-printing of JSON text that contains tokens

use super::token::{scan_tokens, TokenSpan};

const MARKER_PREFIX: &str = "__VAR_";

/// Pretty-print template text with 2-space indentation.
///
/// Tokens are swapped for unique markers (quoted when bare, plain inside
/// string literals), the text is parsed and re-serialized, then every marker
/// is restored to its original token text. Returns `text` unchanged when it
/// cannot be parsed or when re-serializing would lose a token.
pub fn format(text: &str) -> String {
    let tokens = scan_tokens(text);
    let prefix = unique_prefix(text);

    let mut staged = String::with_capacity(text.len());
    let mut last = 0;
    for (index, token) in tokens.iter().enumerate() {
        staged.push_str(&text[last..token.start]);
        let marker = marker(&prefix, index);
        if token.context.is_bare() {
            staged.push('"');
            staged.push_str(&marker);
            staged.push('"');
        } else {
            staged.push_str(&marker);
        }
        last = token.end;
    }
    staged.push_str(&text[last..]);

    let value: serde_json::Value = match serde_json::from_str(&staged) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "template not formattable, returning input");
            return text.to_string();
        }
    };
    let mut pretty = match serde_json::to_string_pretty(&value) {
        Ok(pretty) => pretty,
        Err(_) => return text.to_string(),
    };

    for (index, token) in tokens.iter().enumerate() {
        match restore(&pretty, &prefix, index, token, text) {
            Some(restored) => pretty = restored,
            None => {
                // A duplicate key dropped this token during parsing
                tracing::debug!(token = %token.name, "token lost while formatting, returning input");
                return text.to_string();
            }
        }
    }
    pretty
}

/// Put one token back in place of its marker; `None` when the marker is gone
fn restore(pretty: &str, prefix: &str, index: usize, token: &TokenSpan, source: &str) -> Option<String> {
    let marker = marker(prefix, index);
    let needle = if token.context.is_bare() {
        format!("\"{}\"", marker)
    } else {
        marker
    };
    if !pretty.contains(&needle) {
        return None;
    }
    Some(pretty.replacen(&needle, token.text(source), 1))
}

fn marker(prefix: &str, index: usize) -> String {
    format!("{}{}__", prefix, index)
}

/// A marker prefix that does not occur anywhere in the input
fn unique_prefix(text: &str) -> String {
    let mut prefix = MARKER_PREFIX.to_string();
    while text.contains(&prefix) {
        prefix.insert(0, '_');
    }
    prefix
}
