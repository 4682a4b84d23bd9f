//! Structural parsing of delimited text.
//!
//! This module turns raw export text into row maps plus structural
//! diagnostics. It deliberately tolerates the mess real CRM exports arrive
//! in: unknown delimiters, ragged rows, quoted fields containing delimiters
//! and newlines, doubled-quote escaping, byte-order marks, and any of the
//! three line-ending conventions.
//!
//! Fatal problems (empty input, header-only input, a missing declared-required
//! column) surface as [`StructuralError`] before any downstream work begins.
//! Per-row problems are reported as non-fatal [`RowIssue`]s so one bad line
//! never blocks the rest of a large file.

mod delimiter;
mod reader;
mod stream;

pub use delimiter::detect_delimiter;
pub use reader::parse;
pub use stream::{AbortFlag, ChunkProgress, StreamSummary, parse_chunked};

use crate::error::StructuralError;
use crate::models::RawRow;
use crate::schema::{self, ValueType};

/// Parser configuration. The delimiter is auto-detected when unset.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub delimiter: Option<u8>,
    pub has_header: bool,
    pub trim: bool,
    pub skip_empty_lines: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            trim: true,
            skip_empty_lines: true,
        }
    }
}

/// A non-fatal, row-addressable diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RowIssue {
    /// 1-based data row number.
    pub row: usize,
    pub column: Option<String>,
    pub message: String,
}

/// Result of a successful structural parse.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    pub issues: Vec<RowIssue>,
}

/// Columns the caller declares about the file ahead of import: names that
/// must be present, and names whose values should spot-check as a type.
#[derive(Debug, Clone, Default)]
pub struct ColumnRequirements {
    pub required: Vec<String>,
    pub typed: Vec<(String, ValueType)>,
}

/// How many leading rows the type spot-check samples.
const SPOT_CHECK_ROWS: usize = 25;

/// Validate parsed output against caller-declared column requirements.
///
/// A missing required column is fatal (the import would be meaningless
/// without it). Type mismatches in the sampled rows are warnings only;
/// row-level validation during import is what actually rejects bad values.
pub fn validate_structure(
    outcome: &ParseOutcome,
    requirements: &ColumnRequirements,
) -> Result<Vec<RowIssue>, StructuralError> {
    for required in &requirements.required {
        if !outcome.headers.iter().any(|h| h == required) {
            return Err(StructuralError::MissingColumn(required.clone()));
        }
    }

    let mut warnings = Vec::new();
    for (column, value_type) in &requirements.typed {
        if !outcome.headers.iter().any(|h| h == column) {
            continue;
        }
        for row in outcome.rows.iter().take(SPOT_CHECK_ROWS) {
            let value = row.get(column).unwrap_or("");
            if !schema::value_matches(*value_type, value) {
                warnings.push(RowIssue {
                    row: row.row,
                    column: Some(column.clone()),
                    message: format!(
                        "value `{}` does not look like a {}",
                        value,
                        type_label(*value_type)
                    ),
                });
            }
        }
    }

    Ok(warnings)
}

fn type_label(value_type: ValueType) -> &'static str {
    match value_type {
        ValueType::Text => "text value",
        ValueType::Number => "number",
        ValueType::Date => "date",
        ValueType::Boolean => "boolean",
    }
}

/// Rename duplicate header names by suffixing: `Name`, `Name_2`, `Name_3`, …
pub(crate) fn disambiguate_headers(raw: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashMap::new();
    let mut headers = Vec::new();
    for name in raw {
        let count = seen.entry(name.clone()).or_insert(0usize);
        *count += 1;
        if *count == 1 {
            headers.push(name);
        } else {
            headers.push(format!("{}_{}", name, count));
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_headers_are_suffixed() {
        let headers = disambiguate_headers(
            ["Name", "Name", "Email", "Name"].iter().map(|s| s.to_string()),
        );
        assert_eq!(headers, vec!["Name", "Name_2", "Email", "Name_3"]);
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let outcome = parse("a,b\n1,2\n", &ParseOptions::default()).unwrap();
        let requirements = ColumnRequirements {
            required: vec!["missing".into()],
            typed: Vec::new(),
        };
        assert_eq!(
            validate_structure(&outcome, &requirements),
            Err(StructuralError::MissingColumn("missing".into()))
        );
    }

    #[test]
    fn type_spot_checks_warn_without_failing() {
        let outcome = parse(
            "id,joined\n1,2024-01-01\n2,yesterday-ish\n",
            &ParseOptions::default(),
        )
        .unwrap();
        let requirements = ColumnRequirements {
            required: vec!["id".into()],
            typed: vec![("joined".into(), ValueType::Date)],
        };
        let warnings = validate_structure(&outcome, &requirements).unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].row, 2);
        assert_eq!(warnings[0].column.as_deref(), Some("joined"));
    }
}
