//! CSV row source and CSV template generation

use serde::Serialize;
use thiserror::Error;

use super::types::BatchRow;

const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV file is empty")]
    Empty,

    #[error("CSV header has no columns")]
    NoColumns,

    #[error("CSV header repeats column: {0}")]
    DuplicateColumn(String),

    #[error("CSV has {rows} rows, the limit is {limit}")]
    TooManyRows { rows: usize, limit: usize },

    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    #[error("CSV output is not valid UTF-8")]
    Encoding,
}

/// Parsed CSV: rows in file order and the header columns.
/// On failure `rows` is empty and `error` carries a user-facing message.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvImport {
    pub rows: Vec<BatchRow>,
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CsvImport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Parse CSV text; the first record is the header.
///
/// Header names are trimmed and must be distinct. Records with every cell empty are skipped;
/// short records are padded with empty cells and extra cells are dropped.
pub fn parse_rows(text: &str) -> Result<(Vec<String>, Vec<BatchRow>), CsvError> {
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
    if text.trim().is_empty() {
        return Err(CsvError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if columns.iter().all(String::is_empty) {
        return Err(CsvError::NoColumns);
    }
    for (i, column) in columns.iter().enumerate() {
        if !column.is_empty() && columns[..i].contains(column) {
            return Err(CsvError::DuplicateColumn(column.clone()));
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row: BatchRow = columns
            .iter()
            .enumerate()
            .map(|(i, column)| (column.clone(), record.get(i).unwrap_or("").to_string()))
            .collect();
        rows.push(row);
    }

    Ok((columns, rows))
}

/// [`parse_rows`] with failures folded into [`CsvImport::error`]
pub fn import(text: &str, max_rows: usize) -> CsvImport {
    let parsed = parse_rows(text).and_then(|(columns, rows)| {
        if rows.len() > max_rows {
            Err(CsvError::TooManyRows {
                rows: rows.len(),
                limit: max_rows,
            })
        } else {
            Ok((columns, rows))
        }
    });

    match parsed {
        Ok((columns, rows)) => CsvImport {
            rows,
            columns,
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "CSV import failed");
            CsvImport {
                rows: Vec::new(),
                columns: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    }
}

/// Header-only CSV made of the distinct placeholder names, in order
pub fn csv_template<S: AsRef<str>>(names: &[S]) -> Result<String, CsvError> {
    let mut distinct: Vec<&str> = Vec::new();
    for name in names {
        let name = name.as_ref();
        if !distinct.contains(&name) {
            distinct.push(name);
        }
    }
    write_records(std::iter::once(distinct))
}

/// Write records as CSV text
pub(crate) fn write_records<I, R, S>(records: I) -> Result<String, CsvError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.write_record(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::Parse(e.into_error().into()))?;
    String::from_utf8(bytes).map_err(|_| CsvError::Encoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows() {
        let text = "\u{feff}user_id, post_title\n1,Hello\n\n2,\"Quoted, comma\"\n";
        let (columns, rows) = parse_rows(text).unwrap();
        assert_eq!(columns, vec!["user_id", "post_title"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("user_id"), Some("1"));
        assert_eq!(rows[1].get("post_title"), Some("Quoted, comma"));
    }

    #[test]
    fn test_ragged_records() {
        let (_, rows) = parse_rows("a,b,c\n1\n1,2,3,4\n,,\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("c"), Some(""));
        assert_eq!(rows[1].len(), 3);
    }

    #[test]
    fn test_import_failures() {
        let empty = import("   \n", 10);
        assert!(empty.rows.is_empty());
        assert_eq!(empty.error.as_deref(), Some("CSV file is empty"));

        let too_many = import("a\n1\n2\n3\n", 2);
        assert!(too_many.rows.is_empty());
        assert!(too_many.error.unwrap().contains("limit is 2"));

        let ok = import("a\n1\n", 2);
        assert!(ok.is_ok());
        assert_eq!(ok.columns, vec!["a"]);
    }

    #[test]
    fn test_duplicate_header_rejected() {
        let err = parse_rows("a,b, a\n1,2,3\n").unwrap_err();
        assert!(matches!(err, CsvError::DuplicateColumn(ref name) if name == "a"));

        let imported = import("id,id\n1,2\n", 10);
        assert!(imported.rows.is_empty());
        assert_eq!(imported.error.as_deref(), Some("CSV header repeats column: id"));
    }

    #[test]
    fn test_header_only() {
        let imported = import("a,b\n", 10);
        assert!(imported.is_ok());
        assert!(imported.rows.is_empty());
    }

    #[test]
    fn test_csv_template() {
        let names = ["user_id", "post_title", "user_id"];
        assert_eq!(csv_template(&names).unwrap(), "user_id,post_title\n");
    }
}
