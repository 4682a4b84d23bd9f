//! Row reading over delimited text.
//!
//! Quoting, escaped quotes, embedded delimiters/newlines and line-ending
//! variants are handled by the csv reader; this layer adds header
//! disambiguation, row numbering and ragged-row diagnostics.

use csv::{ReaderBuilder, StringRecord, Terminator, Trim};

use super::{ParseOptions, ParseOutcome, RowIssue, detect_delimiter, disambiguate_headers};
use crate::error::StructuralError;
use crate::models::RawRow;

/// Parse the whole input into row maps plus structural diagnostics.
///
/// Empty and header-only inputs are fatal; everything else that goes wrong
/// on a given line is reported as a [`RowIssue`] and parsing continues.
pub fn parse(text: &str, options: &ParseOptions) -> Result<ParseOutcome, StructuralError> {
    let mut row_reader = RowReader::open(text, options)?;
    let mut rows = Vec::new();
    let mut issues = Vec::new();

    while let Some(row) = row_reader.next_row(&mut issues) {
        rows.push(row);
    }

    if rows.is_empty() && options.has_header {
        return Err(StructuralError::HeaderOnly);
    }

    Ok(ParseOutcome {
        headers: row_reader.headers,
        rows,
        issues,
    })
}

/// Incremental record reader shared by the eager and chunked entry points.
pub(super) struct RowReader<'t> {
    reader: csv::Reader<&'t [u8]>,
    pub(super) headers: Vec<String>,
    /// First record, buffered when the input has no header row.
    pending: Option<StringRecord>,
    skip_empty_lines: bool,
    next_row: usize,
    total_bytes: usize,
}

impl<'t> RowReader<'t> {
    pub(super) fn open(text: &'t str, options: &ParseOptions) -> Result<Self, StructuralError> {
        // A leading byte-order mark would otherwise glue itself onto the
        // first header name.
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        if text.trim().is_empty() {
            return Err(StructuralError::EmptyInput);
        }

        let delimiter = options.delimiter.unwrap_or_else(|| detect_delimiter(text));

        let mut builder = ReaderBuilder::new();
        builder
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .trim(if options.trim { Trim::All } else { Trim::None });
        // Classic Mac exports terminate lines with a bare CR; the default
        // terminator only understands LF and CRLF.
        if !text.contains('\n') && text.contains('\r') {
            builder.terminator(Terminator::Any(b'\r'));
        }
        let mut reader = builder.from_reader(text.as_bytes());

        let mut first = StringRecord::new();
        let has_first = reader
            .read_record(&mut first)
            .map_err(|_| StructuralError::EmptyInput)?;
        if !has_first {
            return Err(StructuralError::EmptyInput);
        }

        let (headers, pending) = if options.has_header {
            let headers = disambiguate_headers(first.iter().map(|h| h.to_string()));
            (headers, None)
        } else {
            let headers = (1..=first.len()).map(|i| format!("Column_{}", i)).collect();
            (headers, Some(first))
        };

        Ok(Self {
            reader,
            headers,
            pending,
            skip_empty_lines: options.skip_empty_lines,
            next_row: 0,
            total_bytes: text.len(),
        })
    }

    /// Next data row, or `None` at end of input. Malformed and (optionally)
    /// all-empty records are skipped, the former leaving an issue behind.
    pub(super) fn next_row(&mut self, issues: &mut Vec<RowIssue>) -> Option<RawRow> {
        loop {
            let record = match self.pending.take() {
                Some(record) => record,
                None => {
                    let mut record = StringRecord::new();
                    match self.reader.read_record(&mut record) {
                        Ok(true) => record,
                        Ok(false) => return None,
                        Err(err) => {
                            self.next_row += 1;
                            issues.push(RowIssue {
                                row: self.next_row,
                                column: None,
                                message: format!("malformed row: {}", err),
                            });
                            continue;
                        }
                    }
                }
            };

            self.next_row += 1;

            if self.skip_empty_lines && record.iter().all(|v| v.trim().is_empty()) {
                continue;
            }

            if record.len() != self.headers.len() {
                issues.push(RowIssue {
                    row: self.next_row,
                    column: None,
                    message: format!(
                        "row has {} columns, expected {}",
                        record.len(),
                        self.headers.len()
                    ),
                });
            }

            let values = self
                .headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), record.get(i).unwrap_or("").to_string()))
                .collect();

            return Some(RawRow {
                row: self.next_row,
                values,
            });
        }
    }

    /// Integer progress through the input, by byte offset.
    pub(super) fn progress_percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        let consumed = self.reader.position().byte() as f64;
        ((consumed / self.total_bytes as f64) * 100.0).min(100.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_data_row() {
        let text = "name,age,city\nAlice,30,NYC\nBob,25,LA\n";
        let outcome = parse(text, &ParseOptions::default()).unwrap();

        assert_eq!(outcome.headers, vec!["name", "age", "city"]);
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].row, 1);
        assert_eq!(outcome.rows[0].get("name"), Some("Alice"));
        assert_eq!(outcome.rows[1].get("city"), Some("LA"));
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn reparsing_is_idempotent() {
        let text = "a,b\n1,2\n3,4\n5,6\n";
        let first = parse(text, &ParseOptions::default()).unwrap();
        let second = parse(text, &ParseOptions::default()).unwrap();
        assert_eq!(first.rows, second.rows);
        assert_eq!(first.headers, second.headers);
    }

    #[test]
    fn quoted_fields_may_contain_delimiters_newlines_and_quotes() {
        let text = "name,notes\n\"Smith, Jr.\",\"line one\nline two\"\nJones,\"said \"\"hi\"\"\"\n";
        let outcome = parse(text, &ParseOptions::default()).unwrap();

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].get("name"), Some("Smith, Jr."));
        assert_eq!(outcome.rows[0].get("notes"), Some("line one\nline two"));
        assert_eq!(outcome.rows[1].get("notes"), Some("said \"hi\""));
    }

    #[test]
    fn byte_order_mark_and_line_endings_are_tolerated() {
        let bom = "\u{feff}a,b\r\n1,2\r\n";
        let outcome = parse(bom, &ParseOptions::default()).unwrap();
        assert_eq!(outcome.headers, vec!["a", "b"]);
        assert_eq!(outcome.rows.len(), 1);

        let cr_only = "a,b\r1,2\r3,4";
        let outcome = parse(cr_only, &ParseOptions::default()).unwrap();
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[1].get("b"), Some("4"));
    }

    #[test]
    fn ragged_rows_are_reported_not_fatal() {
        let text = "a,b,c\n1,2,3\n4,5\n6,7,8,9\n";
        let outcome = parse(text, &ParseOptions::default()).unwrap();

        assert_eq!(outcome.rows.len(), 3);
        assert_eq!(outcome.issues.len(), 2);
        assert_eq!(outcome.issues[0].row, 2);
        assert_eq!(outcome.issues[1].row, 3);
        // Short row still yields a map with the missing column blank.
        assert_eq!(outcome.rows[1].get("c"), Some(""));
    }

    #[test]
    fn empty_and_header_only_inputs_are_fatal() {
        assert!(matches!(
            parse("", &ParseOptions::default()),
            Err(StructuralError::EmptyInput)
        ));
        assert!(matches!(
            parse("   \n  ", &ParseOptions::default()),
            Err(StructuralError::EmptyInput)
        ));
        assert!(matches!(
            parse("a,b,c\n", &ParseOptions::default()),
            Err(StructuralError::HeaderOnly)
        ));
    }

    #[test]
    fn headerless_input_synthesizes_column_names() {
        let options = ParseOptions {
            has_header: false,
            ..ParseOptions::default()
        };
        let outcome = parse("1,2\n3,4\n", &options).unwrap();
        assert_eq!(outcome.headers, vec!["Column_1", "Column_2"]);
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows[0].get("Column_1"), Some("1"));
    }

    #[test]
    fn all_empty_rows_are_skipped_but_counted() {
        let text = "a,b\n1,2\n,\n3,4\n";
        let outcome = parse(text, &ParseOptions::default()).unwrap();
        assert_eq!(outcome.rows.len(), 2);
        // The blank row consumed source row number 2.
        assert_eq!(outcome.rows[1].row, 3);
    }

    #[test]
    fn semicolon_files_are_autodetected() {
        let outcome = parse("a;b\n1;2\n", &ParseOptions::default()).unwrap();
        assert_eq!(outcome.rows[0].get("b"), Some("2"));
    }
}
