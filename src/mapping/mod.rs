//! Source-column → canonical-field mapping.
//!
//! Unknown-schema exports name their columns dozens of different ways. This
//! module infers a mapping from source columns to the fixed canonical schema
//! with a confidence score per column, validates a mapping (inferred or
//! caller-supplied) for completeness and uniqueness, and applies a confirmed
//! mapping to project raw rows into canonical records.

mod normalize;
mod patterns;
mod suggest;

pub use normalize::{normalize_key, normalize_words};
pub use suggest::{MappingSuggestion, SuggestOptions, score_pair, suggest};

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::models::{CanonicalRecord, EntityKind, RawRow};
use crate::schema;

/// A mapping of source column name → canonical field name. `None` means the
/// column is deliberately skipped. A validated mapping is injective: no two
/// columns target the same field.
pub type FieldMapping = BTreeMap<String, Option<String>>;

#[derive(Debug, Clone, Serialize)]
pub struct MappingIssue {
    pub field: String,
    pub message: String,
}

/// Outcome of validating a mapping. Errors block an import; warnings are
/// advisory only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MappingReport {
    pub errors: Vec<MappingIssue>,
    pub warnings: Vec<MappingIssue>,
}

impl MappingReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate a mapping against an entity kind's canonical schema.
///
/// Fails on unmapped required fields, on unknown target names, and on two
/// columns targeting the same field (only caller-supplied mappings can
/// contain duplicates; inferred ones are injective by construction). Warns
/// on unmapped recommended fields.
pub fn validate(mapping: &FieldMapping, kind: EntityKind) -> MappingReport {
    let mut report = MappingReport::default();

    let mut targets: HashMap<&str, Vec<&str>> = HashMap::new();
    for (column, target) in mapping {
        let Some(field) = target else { continue };
        if schema::field_spec(kind, field).is_none() {
            report.errors.push(MappingIssue {
                field: field.clone(),
                message: format!("column `{}` targets unknown field `{}`", column, field),
            });
            continue;
        }
        targets.entry(field.as_str()).or_default().push(column.as_str());
    }

    for (field, columns) in &targets {
        if columns.len() > 1 {
            report.errors.push(MappingIssue {
                field: (*field).to_string(),
                message: format!(
                    "duplicate mapping: columns {} all target `{}`",
                    columns.join(", "),
                    field
                ),
            });
        }
    }

    for required in schema::required_fields(kind) {
        if !targets.contains_key(required) {
            report.errors.push(MappingIssue {
                field: required.to_string(),
                message: format!("missing required field `{}`", required),
            });
        }
    }

    for spec in schema::fields(kind) {
        if spec.recommended && !targets.contains_key(spec.name) {
            report.warnings.push(MappingIssue {
                field: spec.name.to_string(),
                message: format!("recommended field `{}` is not mapped", spec.name),
            });
        }
    }

    report
}

/// Project one raw row through a confirmed mapping.
///
/// Pure projection: each mapped column's value is copied under its canonical
/// field name; skipped columns and columns absent from the row are omitted.
pub fn apply(row: &RawRow, kind: EntityKind, mapping: &FieldMapping) -> CanonicalRecord {
    let mut record = CanonicalRecord::new(kind, row.row);
    for (column, target) in mapping {
        let Some(field) = target else { continue };
        if let Some(value) = row.get(column) {
            record.fields.insert(field.clone(), value.to_string());
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping_of(pairs: &[(&str, Option<&str>)]) -> FieldMapping {
        pairs
            .iter()
            .map(|(c, f)| (c.to_string(), f.map(str::to_string)))
            .collect()
    }

    #[test]
    fn missing_required_fields_fail_validation() {
        let mapping = mapping_of(&[("KEYID", Some("externalId")), ("CITY", Some("city"))]);
        let report = validate(&mapping, EntityKind::Constituent);

        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.field == "lastName"));
    }

    #[test]
    fn duplicate_targets_fail_validation() {
        let mapping = mapping_of(&[
            ("KEYID", Some("externalId")),
            ("LASTNM", Some("lastName")),
            ("Surname", Some("lastName")),
        ]);
        let report = validate(&mapping, EntityKind::Constituent);

        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.field == "lastName"));
    }

    #[test]
    fn unmapped_recommended_fields_only_warn() {
        let mapping = mapping_of(&[("KEYID", Some("externalId")), ("LASTNM", Some("lastName"))]);
        let report = validate(&mapping, EntityKind::Constituent);

        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.field == "firstName"));
        assert!(report.warnings.iter().any(|w| w.field == "email"));
    }

    #[test]
    fn apply_projects_only_mapped_columns() {
        let row = RawRow {
            row: 7,
            values: [
                ("KEYID".to_string(), "LU-00042".to_string()),
                ("LASTNM".to_string(), "Smith".to_string()),
                ("IGNORED".to_string(), "x".to_string()),
                ("SKIPPED".to_string(), "y".to_string()),
            ]
            .into_iter()
            .collect(),
        };
        let mapping = mapping_of(&[
            ("KEYID", Some("externalId")),
            ("LASTNM", Some("lastName")),
            ("SKIPPED", None),
            ("ABSENT", Some("firstName")),
        ]);

        let record = apply(&row, EntityKind::Constituent, &mapping);
        assert_eq!(record.row, 7);
        assert_eq!(record.external_id(), Some("LU-00042"));
        assert_eq!(record.last_name(), Some("Smith"));
        assert_eq!(record.fields.len(), 2);
    }
}
