//! Import result accumulation.

use serde::Serialize;

/// One row-addressable problem encountered during an import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based data row number in the source file.
    pub row: usize,
    pub field: Option<String>,
    pub natural_key: Option<String>,
    pub message: String,
}

/// Outcome of one import call: counts plus the ordered, row-addressable
/// error list. Suitable for direct rendering as a table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportResult {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: Vec<RowError>,
}

impl ImportResult {
    /// Merge another result into this one by summing counts and appending
    /// errors. Used to combine per-file results.
    pub fn merge(&mut self, other: ImportResult) {
        self.created += other.created;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.errors.extend(other.errors);
    }
}
