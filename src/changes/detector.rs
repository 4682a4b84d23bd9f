//! Field-level change classification across repeated imports.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::equality::values_equal;
use crate::models::{CanonicalRecord, EntityKind, StoredRecord};
use crate::schema;

#[derive(Debug, Clone, Default)]
pub struct DetectOptions {
    /// Report persisted natural keys absent from the new batch as deleted.
    /// Off by default: it is only meaningful when `existing` covers the
    /// tenant's full key set, which requires a full scan.
    pub detect_deletions: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    New,
    Updated,
    Unchanged,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub old: Option<String>,
    pub new: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeRecord {
    pub natural_key: String,
    pub change_type: ChangeType,
    pub field_changes: Vec<FieldChange>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeSummary {
    pub new_count: usize,
    pub updated_count: usize,
    pub unchanged_count: usize,
    pub deleted_count: usize,
    pub changes: Vec<ChangeRecord>,
}

/// Classify each incoming record as new, updated or unchanged against the
/// existing records, with field-level old/new detail for updates.
///
/// Only fields the incoming record actually carries are compared; fields a
/// partial export omits are never judged. Records without a natural key are
/// necessarily new (nothing to match them against).
pub fn detect_changes(
    kind: EntityKind,
    new_records: &[CanonicalRecord],
    existing: &HashMap<String, StoredRecord>,
    options: &DetectOptions,
) -> ChangeSummary {
    let mut summary = ChangeSummary::default();
    let mut seen_keys = HashSet::new();

    for record in new_records {
        let Some(key) = record.external_id() else {
            summary.new_count += 1;
            summary.changes.push(ChangeRecord {
                natural_key: format!("row:{}", record.row),
                change_type: ChangeType::New,
                field_changes: Vec::new(),
            });
            continue;
        };
        seen_keys.insert(key.to_string());

        let Some(stored) = existing.get(key) else {
            summary.new_count += 1;
            summary.changes.push(ChangeRecord {
                natural_key: key.to_string(),
                change_type: ChangeType::New,
                field_changes: Vec::new(),
            });
            continue;
        };

        let mut field_changes = Vec::new();
        for (field, new_value) in &record.fields {
            let old_value = stored.get(field).unwrap_or("");
            if !values_equal(schema::field_type(kind, field), old_value, new_value) {
                field_changes.push(FieldChange {
                    field: field.clone(),
                    old: (!old_value.is_empty()).then(|| old_value.to_string()),
                    new: (!new_value.trim().is_empty()).then(|| new_value.clone()),
                });
            }
        }

        let change_type = if field_changes.is_empty() {
            summary.unchanged_count += 1;
            ChangeType::Unchanged
        } else {
            summary.updated_count += 1;
            ChangeType::Updated
        };
        summary.changes.push(ChangeRecord {
            natural_key: key.to_string(),
            change_type,
            field_changes,
        });
    }

    if options.detect_deletions {
        for key in existing.keys() {
            if !seen_keys.contains(key) {
                summary.deleted_count += 1;
                summary.changes.push(ChangeRecord {
                    natural_key: key.clone(),
                    change_type: ChangeType::Deleted,
                    field_changes: Vec::new(),
                });
            }
        }
    }

    log::debug!(
        "change detection ({}): {} new, {} updated, {} unchanged, {} deleted",
        kind,
        summary.new_count,
        summary.updated_count,
        summary.unchanged_count,
        summary.deleted_count
    );

    summary
}
