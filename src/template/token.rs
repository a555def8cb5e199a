//! Token grammar and the scanning cursor shared by the template engine.
//!
//! A well-formed token is `{{` optional-whitespace identifier optional-whitespace `}}`
//! where the identifier matches `[a-zA-Z_][a-zA-Z0-9_]*`. A loose occurrence is anything
//! between `{{` and the nearest `}}` on the same line; the validator uses loose
//! occurrences to report malformed tokens.

use serde::Serialize;

/// Opening token delimiter
pub const OPEN: &str = "{{";

/// Closing token delimiter
pub const CLOSE: &str = "}}";

/// A location inside template text.
///
/// `offset` is a byte offset; `line` and `column` are 1-based, with the column
/// counted in characters since the last newline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const START: Position = Position {
        offset: 0,
        line: 1,
        column: 1,
    };
}

/// Forward-only cursor over template text that keeps line and column in step
/// with the byte offset as it advances.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    text: &'a str,
    pos: Position,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: Position::START,
        }
    }

    pub fn position(&self) -> Position {
        self.pos
    }

    pub fn offset(&self) -> usize {
        self.pos.offset
    }

    pub fn is_eof(&self) -> bool {
        self.pos.offset >= self.text.len()
    }

    /// Remaining unscanned text
    pub fn rest(&self) -> &'a str {
        &self.text[self.pos.offset..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn starts_with(&self, pattern: &str) -> bool {
        self.rest().starts_with(pattern)
    }

    /// Consume one character
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos.offset += c.len_utf8();
        if c == '\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }
        Some(c)
    }

    /// Advance until the cursor reaches (or passes) `offset`
    pub fn advance_to(&mut self, offset: usize) {
        let target = offset.min(self.text.len());
        while self.pos.offset < target {
            if self.bump().is_none() {
                break;
            }
        }
    }
}

/// Compute the line/column of a byte offset
pub fn position_at(text: &str, offset: usize) -> Position {
    let mut cursor = Cursor::new(text);
    cursor.advance_to(offset);
    cursor.position()
}

/// Check a string against the identifier grammar `[a-zA-Z_][a-zA-Z0-9_]*`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Match a well-formed token at the start of `s`.
///
/// Returns the token name and the byte length of the whole token.
pub fn match_token_at(s: &str) -> Option<(&str, usize)> {
    let inner = s.strip_prefix(OPEN)?;
    let name_start = OPEN.len() + (inner.len() - inner.trim_start().len());
    let after_ws = &s[name_start..];

    let name_len = after_ws
        .char_indices()
        .find(|&(i, c)| {
            if i == 0 {
                !(c.is_ascii_alphabetic() || c == '_')
            } else {
                !(c.is_ascii_alphanumeric() || c == '_')
            }
        })
        .map(|(i, _)| i)
        .unwrap_or(after_ws.len());
    if name_len == 0 {
        return None;
    }

    let name = &after_ws[..name_len];
    let tail = &after_ws[name_len..];
    let close_start = tail.len() - tail.trim_start().len();
    if !tail[close_start..].starts_with(CLOSE) {
        return None;
    }

    Some((name, name_start + name_len + close_start + CLOSE.len()))
}

/// Match a string that consists of exactly one well-formed token
pub fn whole_token(s: &str) -> Option<&str> {
    match match_token_at(s) {
        Some((name, len)) if len == s.len() => Some(name),
        _ => None,
    }
}

/// Where a token sits relative to JSON string literals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenContext {
    /// Outside any string literal, e.g. `{"n": {{count}}}`
    Bare,
    /// The whole content of a string literal, e.g. `{"id": "{{uid}}"}`
    QuotedSlot,
    /// Part of a larger string literal, e.g. `{"t": "id-{{uid}}"}`
    InString,
}

impl TokenContext {
    pub fn is_bare(self) -> bool {
        matches!(self, TokenContext::Bare)
    }
}

/// A well-formed token found in template text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenSpan {
    pub name: String,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
    pub context: TokenContext,
}

impl TokenSpan {
    /// The exact token text as written in `source`
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start..self.end]
    }
}

/// Scan every well-formed token in `text`, in order of appearance.
///
/// String literals are tracked so each token knows whether it is bare, the
/// whole content of a quoted slot, or embedded in a longer string.
pub fn scan_tokens(text: &str) -> Vec<TokenSpan> {
    let mut tokens = Vec::new();
    let mut cursor = Cursor::new(text);
    let mut in_string = false;

    while !cursor.is_eof() {
        if cursor.starts_with(OPEN) {
            if let Some((name, len)) = match_token_at(cursor.rest()) {
                let start = cursor.position();
                let end = start.offset + len;
                let context = if !in_string {
                    TokenContext::Bare
                } else if text[..start.offset].ends_with('"') && text[end..].starts_with('"') {
                    TokenContext::QuotedSlot
                } else {
                    TokenContext::InString
                };
                tokens.push(TokenSpan {
                    name: name.to_string(),
                    start: start.offset,
                    end,
                    line: start.line,
                    column: start.column,
                    context,
                });
                cursor.advance_to(end);
                continue;
            }
        }

        match cursor.bump() {
            Some('\\') if in_string => {
                cursor.bump();
            }
            Some('"') => in_string = !in_string,
            _ => {}
        }
    }

    tokens
}

/// Scan well-formed tokens in an already-decoded string value.
///
/// Quotes and backslashes are ordinary characters here, so every `{{` is a
/// candidate. Spans are reported as [`TokenContext::InString`].
pub fn scan_leaf_tokens(text: &str) -> Vec<TokenSpan> {
    let mut tokens = Vec::new();
    let mut cursor = Cursor::new(text);

    while !cursor.is_eof() {
        if cursor.starts_with(OPEN) {
            if let Some((name, len)) = match_token_at(cursor.rest()) {
                let start = cursor.position();
                let end = start.offset + len;
                tokens.push(TokenSpan {
                    name: name.to_string(),
                    start: start.offset,
                    end,
                    line: start.line,
                    column: start.column,
                    context: TokenContext::InString,
                });
                cursor.advance_to(end);
                continue;
            }
        }
        cursor.bump();
    }

    tokens
}

/// Anything delimited like a token, well-formed or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Raw content between the delimiters
    pub inner: String,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Occurrence {
    pub fn is_well_formed(&self) -> bool {
        is_identifier(self.inner.trim())
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Scan loose `{{...}}` occurrences: from each `{{` to the nearest `}}` on the
/// same line. Nested openers are not treated specially, so `{{ {{a}} }}`
/// yields the single occurrence `{{ {{a}}`.
pub fn scan_occurrences(text: &str) -> Vec<Occurrence> {
    let mut found = Vec::new();
    let mut cursor = Cursor::new(text);

    while !cursor.is_eof() {
        if cursor.starts_with(OPEN) {
            let body = &cursor.rest()[OPEN.len()..];
            let line_end = body.find('\n').unwrap_or(body.len());
            if let Some(close) = body[..line_end].find(CLOSE) {
                let start = cursor.position();
                let end = start.offset + OPEN.len() + close + CLOSE.len();
                found.push(Occurrence {
                    inner: body[..close].to_string(),
                    start: start.offset,
                    end,
                    line: start.line,
                    column: start.column,
                });
                cursor.advance_to(end);
                continue;
            }
        }
        cursor.bump();
    }

    found
}

/// Distinct token names in first-seen order
pub fn token_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for token in scan_tokens(text) {
        if !names.contains(&token.name) {
            names.push(token.name);
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_grammar() {
        assert!(is_identifier("user_id"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1bad"));
        assert!(!is_identifier("var-3"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a.b"));
    }

    #[test]
    fn test_match_token_with_whitespace() {
        assert_eq!(match_token_at("{{ name }} rest"), Some(("name", 10)));
        assert_eq!(match_token_at("{{name}}"), Some(("name", 8)));
        assert_eq!(match_token_at("{{ 1bad }}"), None);
        assert_eq!(match_token_at("{{a b}}"), None);
        assert_eq!(whole_token("{{x}}"), Some("x"));
        assert_eq!(whole_token("{{x}}!"), None);
    }

    #[test]
    fn test_scan_tokens_contexts() {
        let text = r#"{"a": "{{uid}}", "b": {{count}}, "c": "id-{{uid}}"}"#;
        let tokens = scan_tokens(text);
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].context, TokenContext::QuotedSlot);
        assert_eq!(tokens[1].context, TokenContext::Bare);
        assert_eq!(tokens[2].context, TokenContext::InString);
        assert_eq!(tokens[1].text(text), "{{count}}");
    }

    #[test]
    fn test_scan_tokens_skips_escaped_quotes() {
        let text = r#"{"a": "say \"hi\" {{x}}", "b": {{y}}}"#;
        let tokens = scan_tokens(text);
        assert_eq!(tokens[0].context, TokenContext::InString);
        assert_eq!(tokens[1].context, TokenContext::Bare);
    }

    #[test]
    fn test_scan_tokens_inside_extra_braces() {
        let tokens = scan_tokens("{{{a}}}");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name, "a");
        assert_eq!(tokens[0].start, 1);
    }

    #[test]
    fn test_scan_leaf_tokens_ignores_quotes_and_backslashes() {
        let leaf = "5\" of C:\\{{dir}}";
        let tokens = scan_leaf_tokens(leaf);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name, "dir");
        assert_eq!(tokens[0].text(leaf), "{{dir}}");
        assert!(scan_tokens(leaf).is_empty());
    }

    #[test]
    fn test_scan_occurrences_nested_is_single() {
        let found = scan_occurrences("{ {{ {{a}} }} }");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].inner, " {{a");
        assert!(!found[0].is_well_formed());
    }

    #[test]
    fn test_scan_occurrences_does_not_cross_lines() {
        let found = scan_occurrences("{{a\n{{b}}");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].inner, "b");
        assert_eq!(found[0].line, 2);
        assert_eq!(found[0].column, 1);
    }

    #[test]
    fn test_position_tracking() {
        let text = "ab\ncé{{x}}";
        let pos = position_at(text, text.find("{{").unwrap());
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 3);
    }

    #[test]
    fn test_token_names_distinct() {
        assert_eq!(token_names("{{a}} {{b}} {{ a }}"), vec!["a", "b"]);
    }
}
