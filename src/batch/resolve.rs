//! Row to request-body resolution

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Number, Value};

use crate::template::{render_payload, token_names, TemplateResult, ValueMap};

use super::types::{AliasField, BatchJob, BatchRow, TITLE_COLUMN};

lazy_static! {
    static ref NUMERIC_CELL: Regex = Regex::new(r"^\d+(?:\.\d+)?$").unwrap();
}

/// Interpret a raw cell. Precedence: JSON object/array, unsigned
/// integer/decimal, `true`/`false`, then the untouched string.
pub fn coerce_cell(raw: &str) -> Value {
    let trimmed = raw.trim();

    let looks_structured = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if looks_structured {
        return serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(raw.to_string()));
    }

    if NUMERIC_CELL.is_match(trimmed) {
        if let Some(number) = parse_number(trimmed) {
            return Value::Number(number);
        }
    }

    match trimmed {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

fn parse_number(s: &str) -> Option<Number> {
    if !s.contains('.') {
        if let Ok(n) = s.parse::<u64>() {
            return Some(Number::from(n));
        }
    }
    s.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Cell values of a row, coerced when `coerce` is set
pub fn coerce_row(row: &BatchRow, coerce: bool) -> ValueMap {
    row.iter()
        .map(|(column, cell)| {
            let value = if coerce {
                coerce_cell(cell)
            } else {
                Value::String(cell.to_string())
            };
            (column.to_string(), value)
        })
        .collect()
}

/// Lowercase and strip everything but ASCII letters and digits
pub fn normalize_key(s: &str) -> String {
    s.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Values for each token name, looked up in order: exact column, a selected
/// request field whose alias or path normalizes to the name, then any column
/// whose normalized name matches. Names with no match are left out.
pub fn build_value_map(names: &[String], cells: &ValueMap, request_fields: &[AliasField]) -> ValueMap {
    let mut values = ValueMap::new();

    for name in names {
        if let Some(value) = cells.get(name) {
            values.insert(name.clone(), value.clone());
            continue;
        }

        let wanted = normalize_key(name);

        let aliased = request_fields
            .iter()
            .find(|f| normalize_key(f.label()) == wanted || normalize_key(&f.path) == wanted)
            .and_then(|f| cells.get(f.label()).filter(|_| f.label() != TITLE_COLUMN));
        if let Some(value) = aliased {
            values.insert(name.clone(), value.clone());
            continue;
        }

        let fallback = cells
            .iter()
            .find(|(column, _)| column.as_str() != TITLE_COLUMN && normalize_key(column) == wanted);
        if let Some((_, value)) = fallback {
            values.insert(name.clone(), value.clone());
        }
    }

    values
}

/// Request body for one row
pub fn resolve_row(job: &BatchJob, row: &BatchRow) -> TemplateResult<Value> {
    let cells = coerce_row(row, job.coerce_loose_types);
    let names = token_names(&job.template);
    let values = build_value_map(&names, &cells, &job.request_fields);
    render_payload(&job.template, &values, job.missing_values)
}
