//! Shared import engine.
//!
//! One pipeline drives all three entity kinds:
//!
//! 1. Project every raw row through the confirmed mapping.
//! 2. Pre-fetch the tenant's natural-key index, scoped to the keys present
//!    in this import, and (for gift/contact rows) the external-id →
//!    internal-id index of owning constituents.
//! 3. Per batch: validate each row (collecting every violation, not just
//!    the first), resolve references, classify create vs. update, skip
//!    unchanged content on the fingerprint fast path.
//! 4. Write each batch through the bulkhead helpers and report progress.
//!
//! Rows are processed in ordered, fixed-size batches, one batch at a time:
//! persistence transactions stay small and every error is attributable to a
//! definite row.

use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use super::ImportOptions;
use super::bulkhead::{self, PendingCreate, PendingUpdate};
use super::result::{ImportResult, RowError};
use crate::changes;
use crate::error::StoreError;
use crate::mapping::{self, FieldMapping};
use crate::models::{CanonicalRecord, EntityKind, RawRow, StoredRecord};
use crate::schema::{self, ValueType};
use crate::store::{NewRecord, RecordStore, RecordUpdate};

pub(super) async fn run_import<S: RecordStore>(
    store: &S,
    tenant: Uuid,
    kind: EntityKind,
    rows: &[RawRow],
    mapping: &FieldMapping,
    options: &ImportOptions,
    mut progress: Option<&mut dyn FnMut(usize, usize)>,
) -> Result<ImportResult, StoreError> {
    let total = rows.len();
    let mut result = ImportResult::default();

    // Raw rows are discarded once projected.
    let records: Vec<CanonicalRecord> = rows
        .iter()
        .map(|row| mapping::apply(row, kind, mapping))
        .collect();

    let keys: Vec<String> = records
        .iter()
        .filter_map(|r| r.external_id())
        .map(str::to_string)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let existing: HashMap<String, StoredRecord> = store
        .fetch_by_external_ids(tenant, kind, &keys)
        .await?
        .into_iter()
        .filter_map(|record| record.external_id.clone().map(|key| (key, record)))
        .collect();

    let constituent_index: HashMap<String, Uuid> = if kind.references_constituent() {
        let references: Vec<String> = records
            .iter()
            .filter_map(|r| r.constituent_external_id())
            .map(str::to_string)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        store
            .find_ids_by_external_ids(tenant, EntityKind::Constituent, &references)
            .await?
    } else {
        HashMap::new()
    };

    log::info!(
        "importing {} {} rows for tenant {} ({} already known by natural key)",
        total,
        kind,
        tenant,
        existing.len()
    );

    let batch_size = options.batch_size.max(1);
    let mut processed = 0usize;

    for batch in records.chunks(batch_size) {
        let mut creates: Vec<PendingCreate> = Vec::new();
        let mut updates: Vec<PendingUpdate> = Vec::new();

        for record in batch {
            let violations = validate_record(kind, record);
            if !violations.is_empty() {
                result.errors.extend(violations);
                continue;
            }

            let mut constituent_id = None;
            if kind.references_constituent() {
                let Some(reference) = record.constituent_external_id() else {
                    continue;
                };
                match constituent_index.get(reference) {
                    Some(id) => constituent_id = Some(*id),
                    None => {
                        result.errors.push(RowError {
                            row: record.row,
                            field: Some("constituentExternalId".to_string()),
                            natural_key: record.external_id().map(str::to_string),
                            message: format!(
                                "constituent `{}` not found for this tenant",
                                reference
                            ),
                        });
                        continue;
                    }
                }
            }

            match record.external_id().and_then(|key| existing.get(key)) {
                Some(stored) => {
                    if options.skip_unchanged && changes::unchanged_since(record, stored) {
                        result.skipped += 1;
                        continue;
                    }
                    let fields = normalized_fields(kind, record);
                    if fields.is_empty() {
                        result.skipped += 1;
                        continue;
                    }
                    updates.push(PendingUpdate {
                        row: record.row,
                        natural_key: record.external_id().map(str::to_string),
                        update: RecordUpdate {
                            id: stored.id,
                            fields,
                        },
                    });
                }
                None => creates.push(PendingCreate {
                    row: record.row,
                    natural_key: record.external_id().map(str::to_string),
                    record: NewRecord {
                        external_id: record.external_id().map(str::to_string),
                        constituent_id,
                        fields: normalized_fields(kind, record),
                    },
                }),
            }
        }

        let (created, conflict_skipped) =
            bulkhead::insert_with_fallback(store, tenant, kind, &creates, &mut result.errors).await;
        result.created += created;
        result.skipped += conflict_skipped;

        let updated =
            bulkhead::update_with_fallback(store, tenant, kind, &updates, &mut result.errors).await;
        result.updated += updated;

        processed = (processed + batch.len()).min(total);
        if let Some(callback) = progress.as_mut() {
            callback(processed, total);
        }
    }

    log::info!(
        "import complete ({}): {} created, {} updated, {} skipped, {} errors",
        kind,
        result.created,
        result.updated,
        result.skipped,
        result.errors.len()
    );

    Ok(result)
}

/// Every violation for the row, not just the first.
fn validate_record(kind: EntityKind, record: &CanonicalRecord) -> Vec<RowError> {
    let mut violations = Vec::new();
    let natural_key = record.external_id().map(str::to_string);

    for spec in schema::fields(kind) {
        if spec.required && record.value(spec.name).is_none() {
            violations.push(RowError {
                row: record.row,
                field: Some(spec.name.to_string()),
                natural_key: natural_key.clone(),
                message: format!("required field `{}` is missing or empty", spec.name),
            });
        }
    }

    for (field, raw) in &record.fields {
        let Some(spec) = schema::field_spec(kind, field) else {
            continue;
        };
        if raw.trim().is_empty() {
            continue;
        }
        if !schema::value_matches(spec.value_type, raw) {
            violations.push(RowError {
                row: record.row,
                field: Some(field.clone()),
                natural_key: natural_key.clone(),
                message: format!(
                    "`{}` is not a valid {}",
                    raw.trim(),
                    type_label(spec.value_type)
                ),
            });
        }
    }

    violations
}

fn type_label(value_type: ValueType) -> &'static str {
    match value_type {
        ValueType::Text => "text value",
        ValueType::Number => "number",
        ValueType::Date => "date",
        ValueType::Boolean => "boolean",
    }
}

/// Write payload for a record: present, non-empty fields with typed values
/// normalized (dates to ISO, numbers to plain decimals, booleans to
/// true/false). Identity fields live in their own payload slots. An empty
/// string never appears here, which is what makes updates sparse: a blank
/// cell in a partial re-export leaves previously enriched values untouched.
fn normalized_fields(kind: EntityKind, record: &CanonicalRecord) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    for field in record.fields.keys() {
        if field == "externalId" || field == "constituentExternalId" {
            continue;
        }
        let Some(value) = record.value(field) else {
            continue;
        };
        let normalized = match schema::field_type(kind, field) {
            ValueType::Date => schema::parse_date(value)
                .map(|dt| dt.date_naive().to_string())
                .unwrap_or_else(|| value.to_string()),
            ValueType::Number => schema::parse_number(value)
                .map(|n| n.to_string())
                .unwrap_or_else(|| value.to_string()),
            ValueType::Boolean => schema::parse_bool(value)
                .map(|b| b.to_string())
                .unwrap_or_else(|| value.to_string()),
            ValueType::Text => value.to_string(),
        };
        fields.insert(field.clone(), normalized);
    }
    fields
}
