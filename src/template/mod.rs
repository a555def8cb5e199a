//! Placeholder-templated JSON engine.
//!
//! This module provides:
//! - The `{{variable}}` token grammar and a line/column tracking cursor
//! - Placeholder detection over parsed JSON or raw text
//! - Type-preserving substitution (structured and raw text)
//! - Validation of malformed tokens and JSON structure
//! - Pretty-printing of JSON text containing tokens
//!
//! Everything here is a pure function of its inputs.
//!
//! # Example
//!
//! ```ignore
//! let text = r#"{"userId": "{{uid}}", "n": {{count}}}"#;
//!
//! assert!(validate(text).is_valid);
//! let names = detect_placeholders(text); // uid, count
//!
//! let values = json!({"uid": "42", "count": 3});
//! let payload = render_payload(text, values.as_object().unwrap(), MissingValuePolicy::Null)?;
//! // {"userId": "42", "n": 3}
//! ```

mod editor;
mod extract;
mod format;
mod substitution;
pub mod token;
mod types;
mod validate;

pub use editor::{highlights, markers, EditorMarker, Severity, TokenHighlight};
pub use extract::{detect_placeholders, extract, extract_from_text, extract_from_value};
pub use format::format;
pub use substitution::{
    render_payload, resolve, stringify, substitute, substitute_in_text, unresolved_names,
};
pub use token::{token_names, TokenContext};
pub use types::{
    MissingValuePolicy, PlaceholderMeta, TemplateError, TemplateInput, TemplateResult,
    ValidationError, ValidationReport, ValueMap,
};
pub use validate::{neutralize_tokens, validate};
