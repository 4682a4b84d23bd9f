use thiserror::Error;

/// Fatal, file-level problems detected before any row-level work begins.
///
/// These abort an import outright; nothing is written when one is returned.
/// Everything row-scoped (validation failures, unresolved references,
/// individual write failures) is accumulated into the import result instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("input is empty")]
    EmptyInput,
    #[error("input has a header row but no data rows")]
    HeaderOnly,
    #[error("required column `{0}` is missing from the header")]
    MissingColumn(String),
}

/// Errors surfaced by a record store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("write rejected: {0}")]
    Rejected(String),
}
