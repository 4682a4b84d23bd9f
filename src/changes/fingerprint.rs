//! Content fingerprints for cheap change detection.
//!
//! A record's hash covers its normalized, non-volatile canonical fields, so
//! two representations of the same content always collide and any real
//! change does not.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::models::{CanonicalRecord, EntityKind, StoredRecord};
use crate::schema::{self, ValueType};

/// Storage-assigned identity and bookkeeping values: excluded from hashing
/// because they churn without the record meaningfully changing.
const VOLATILE_FIELDS: &[&str] = &["id", "tenantId", "createdAt", "updatedAt", "importedAt"];

/// Stable content hash over the full canonical field set of `kind`.
///
/// Values are normalized first (dates to their UTC instant, strings trimmed
/// and lowercased, missing fields to empty) and field names are sorted, so
/// the hash is invariant to field order and representation drift.
pub fn record_hash(kind: EntityKind, fields: &BTreeMap<String, String>) -> String {
    let names: Vec<&str> = schema::fields(kind).iter().map(|f| f.name).collect();
    scoped_hash(kind, &names, fields)
}

/// Hash restricted to a chosen set of canonical fields.
pub(crate) fn scoped_hash(
    kind: EntityKind,
    field_names: &[&str],
    fields: &BTreeMap<String, String>,
) -> String {
    let mut names: Vec<&str> = field_names
        .iter()
        .filter(|name| !VOLATILE_FIELDS.contains(name))
        .copied()
        .collect();
    names.sort_unstable();
    names.dedup();

    let mut hasher = Sha256::new();
    for name in names {
        let raw = fields.get(name).map(String::as_str).unwrap_or("");
        let normalized = normalize_value(schema::field_type(kind, name), raw);
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(normalized.as_bytes());
        hasher.update([0x1f]);
    }

    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Whether an incoming record carries no real change relative to its stored
/// counterpart, judged by hashes scoped to the fields the incoming record
/// actually supplies (sparse imports never compare fields they do not carry).
pub(crate) fn unchanged_since(record: &CanonicalRecord, stored: &StoredRecord) -> bool {
    let scope: Vec<&str> = record
        .fields
        .keys()
        .map(String::as_str)
        .filter(|name| record.value(name).is_some())
        .collect();
    if scope.is_empty() {
        return true;
    }
    scoped_hash(record.kind, &scope, &record.fields)
        == scoped_hash(record.kind, &scope, &stored.fields)
}

fn normalize_value(value_type: ValueType, raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    match value_type {
        ValueType::Date => schema::parse_date(trimmed)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| trimmed.to_lowercase()),
        // Typed columns render `1000` back as `1000.00`; canonicalize so
        // representation drift never looks like change.
        ValueType::Number => schema::parse_number(trimmed)
            .map(|n| n.to_string())
            .unwrap_or_else(|| trimmed.to_lowercase()),
        ValueType::Boolean => schema::parse_bool(trimmed)
            .map(|b| b.to_string())
            .unwrap_or_else(|| trimmed.to_lowercase()),
        ValueType::Text => trimmed.to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn hash_is_invariant_to_case_and_whitespace() {
        let a = fields(&[("externalId", "LU-1"), ("lastName", "Smith")]);
        let b = fields(&[("externalId", "lu-1"), ("lastName", "  SMITH ")]);
        assert_eq!(
            record_hash(EntityKind::Constituent, &a),
            record_hash(EntityKind::Constituent, &b)
        );
    }

    #[test]
    fn hash_is_invariant_to_date_representation() {
        let a = fields(&[("constituentExternalId", "LU-1"), ("amount", "100"), ("giftDate", "2024-03-15")]);
        let b = fields(&[("constituentExternalId", "LU-1"), ("amount", "100"), ("giftDate", "03/15/2024")]);
        assert_eq!(record_hash(EntityKind::Gift, &a), record_hash(EntityKind::Gift, &b));
    }

    #[test]
    fn hash_is_invariant_to_numeric_rendering() {
        let a = fields(&[("externalId", "LU-1"), ("lastName", "Smith"), ("estimatedCapacity", "50000")]);
        let b = fields(&[("externalId", "LU-1"), ("lastName", "Smith"), ("estimatedCapacity", "50000.00")]);
        assert_eq!(
            record_hash(EntityKind::Constituent, &a),
            record_hash(EntityKind::Constituent, &b)
        );
    }

    #[test]
    fn hash_changes_when_a_value_changes() {
        let a = fields(&[("externalId", "LU-1"), ("lastName", "Smith")]);
        let b = fields(&[("externalId", "LU-1"), ("lastName", "Smyth")]);
        assert_ne!(
            record_hash(EntityKind::Constituent, &a),
            record_hash(EntityKind::Constituent, &b)
        );
    }

    #[test]
    fn volatile_fields_are_excluded() {
        let a = fields(&[("externalId", "LU-1"), ("lastName", "Smith"), ("updatedAt", "2024-01-01")]);
        let b = fields(&[("externalId", "LU-1"), ("lastName", "Smith"), ("updatedAt", "2025-06-30")]);
        assert_eq!(
            record_hash(EntityKind::Constituent, &a),
            record_hash(EntityKind::Constituent, &b)
        );
    }

    #[test]
    fn missing_fields_hash_like_empty_ones() {
        let sparse = fields(&[("externalId", "LU-1"), ("lastName", "Smith")]);
        let explicit = fields(&[("externalId", "LU-1"), ("lastName", "Smith"), ("firstName", "")]);
        assert_eq!(
            record_hash(EntityKind::Constituent, &sparse),
            record_hash(EntityKind::Constituent, &explicit)
        );
    }
}
