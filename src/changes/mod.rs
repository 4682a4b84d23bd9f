//! Incremental change detection across repeated imports.
//!
//! Two paths exist. The field-level detector compares every imported field
//! with type-aware equality and reports old/new values per change, which is
//! the right tool for interactive review. The fingerprint path hashes a
//! record's normalized content and compares hashes, classifying
//! create/update/skip at batch scale without per-field detail.

mod detector;
mod equality;
mod fingerprint;
mod incremental;

pub use detector::{
    ChangeRecord, ChangeSummary, ChangeType, DetectOptions, FieldChange, detect_changes,
};
pub use equality::{NUMERIC_EPSILON, values_equal};
pub use fingerprint::record_hash;
pub(crate) use fingerprint::unchanged_since;
pub use incremental::{IncrementalPlan, incremental_updates};
