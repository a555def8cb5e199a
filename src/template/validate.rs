//! Template validation: malformed tokens plus structural JSON errors

use super::token::{position_at, scan_occurrences, Occurrence};
use super::types::{ValidationError, ValidationReport};

/// Stand-in inserted for every token occurrence before JSON parsing
const NEUTRAL_VALUE: &str = "0";

/// Validate template text.
///
/// Every malformed occurrence yields its own error. Afterwards all occurrences,
/// valid or not, are replaced by `0` and the result is parsed; a parse failure
/// yields one more error positioned on the original text.
pub fn validate(text: &str) -> ValidationReport {
    let occurrences = scan_occurrences(text);

    let mut errors: Vec<ValidationError> = occurrences
        .iter()
        .filter(|occ| !occ.is_well_formed())
        .map(malformed_error)
        .collect();

    let neutral = replace_occurrences(text, &occurrences);
    if let Err(e) = serde_json::from_str::<serde_json::Value>(&neutral) {
        errors.push(json_error(text, &neutral, &occurrences, &e));
    }

    ValidationReport::from_errors(errors)
}

fn malformed_error(occ: &Occurrence) -> ValidationError {
    ValidationError {
        message: format!("malformed variable: {{{{{}}}}}", occ.inner),
        line: Some(occ.line),
        column: Some(occ.column),
        start_offset: Some(occ.start),
        end_offset: Some(occ.end),
    }
}

fn json_error(
    text: &str,
    neutral: &str,
    occurrences: &[Occurrence],
    err: &serde_json::Error,
) -> ValidationError {
    let full = err.to_string();
    let detail = full
        .rsplit_once(" at line ")
        .map(|(head, _)| head)
        .unwrap_or(&full);

    let (line, column, offset) = if err.line() == 0 {
        (None, None, None)
    } else {
        let neutral_offset = offset_of(neutral, err.line(), err.column());
        let original = to_original_offset(neutral_offset, occurrences);
        let pos = position_at(text, original);
        (Some(pos.line), Some(pos.column), Some(pos.offset))
    };

    ValidationError {
        message: format!("invalid JSON: {}", detail),
        line,
        column,
        start_offset: offset,
        end_offset: None,
    }
}

/// Byte offset of a parser position (1-based line, 1-based byte column)
fn offset_of(text: &str, line: usize, column: usize) -> usize {
    let line_start = if line <= 1 {
        0
    } else {
        text.match_indices('\n')
            .nth(line - 2)
            .map(|(i, _)| i + 1)
            .unwrap_or(text.len())
    };
    let mut offset = (line_start + column.saturating_sub(1)).min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Map an offset in neutralized text back onto the original text
fn to_original_offset(neutral_offset: usize, occurrences: &[Occurrence]) -> usize {
    let mut shift = 0usize;
    for occ in occurrences {
        let neutral_start = occ.start - shift;
        if neutral_offset < neutral_start {
            break;
        }
        if neutral_offset < neutral_start + NEUTRAL_VALUE.len() {
            return occ.start;
        }
        shift += occ.len() - NEUTRAL_VALUE.len();
    }
    neutral_offset + shift
}

fn replace_occurrences(text: &str, occurrences: &[Occurrence]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for occ in occurrences {
        out.push_str(&text[last..occ.start]);
        out.push_str(NEUTRAL_VALUE);
        last = occ.end;
    }
    out.push_str(&text[last..]);
    out
}

/// Replace every token-like occurrence with `0` so the surrounding structure
/// can be parsed as JSON
pub fn neutralize_tokens(text: &str) -> String {
    replace_occurrences(text, &scan_occurrences(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_json_with_variables() {
        let report = validate(r#"{ "a": {{var1}}, "b": "text", "c": [{{var2}}, 2] }"#);
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_malformed_variable_single_error() {
        let report = validate(r#"{ "a": {{1bad}} }"#);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        let err = &report.errors[0];
        assert!(err.message.contains("malformed"));
        assert_eq!(err.message, "malformed variable: {{1bad}}");
        assert_eq!(err.line, Some(1));
        assert_eq!(err.column, Some(8));
        assert_eq!(err.start_offset, Some(7));
        assert_eq!(err.end_offset, Some(15));
    }

    #[test]
    fn test_well_formed_variable() {
        assert!(validate(r#"{ "a": {{ok_1}} }"#).is_valid);
        assert!(validate(r#"{ "a": {{ spaced }} }"#).is_valid);
    }

    #[test]
    fn test_each_malformed_occurrence_reported() {
        let report = validate(r#"{ "a": {{1var}}, "b": {{var_2}}, "c": {{var-3}}, "d": {{1var}} }"#);
        let malformed: Vec<_> = report
            .errors
            .iter()
            .filter(|e| e.message.starts_with("malformed"))
            .collect();
        assert_eq!(malformed.len(), 3);
        assert!(report.errors.iter().all(|e| !e.message.starts_with("invalid JSON")));
    }

    #[test]
    fn test_nested_braces_malformed_at_outer_level() {
        let report = validate(r#"{ "a": {{ {{x}} }} }"#);
        assert!(!report.is_valid);
        assert!(report.errors[0].message.starts_with("malformed variable"));
    }

    #[test]
    fn test_trailing_comma_is_invalid_json() {
        let report = validate(r#"{ "a": {{ok}}, }"#);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 1);
        let err = &report.errors[0];
        assert!(err.message.starts_with("invalid JSON: "));
        assert!(!err.message.contains(" at line "));
        assert_eq!(err.line, Some(1));
        assert!(err.column.is_some());
    }

    #[test]
    fn test_json_error_position_maps_to_original_text() {
        let text = "{\n  \"a\": {{long_variable_name}},\n  \"b\": [1, 2,]\n}";
        let report = validate(text);
        let err = &report.errors[0];
        assert_eq!(err.line, Some(3));
        let offset = err.start_offset.unwrap();
        assert!(text[offset..].starts_with(']'));
    }

    #[test]
    fn test_malformed_and_json_error_together() {
        let report = validate(r#"{ "a": {{bad-name}}, "b": [1, 2, }"#);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].message.starts_with("malformed"));
        assert!(report.errors[1].message.starts_with("invalid JSON"));
    }

    #[test]
    fn test_neutralize_tokens() {
        assert_eq!(
            neutralize_tokens(r#"{"a": {{x}}, "b": "{{y}}"}"#),
            r#"{"a": 0, "b": "0"}"#
        );
    }
}
