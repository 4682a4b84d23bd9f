use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// The three entity kinds held by the canonical store.
///
/// Constituents are the anchor records; gifts and contacts reference their
/// owning constituent by its tenant-scoped natural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Constituent,
    Gift,
    Contact,
}

impl EntityKind {
    /// Whether rows of this kind carry a `constituentExternalId` reference
    /// that must resolve to an existing constituent at write time.
    pub fn references_constituent(&self) -> bool {
        !matches!(self, EntityKind::Constituent)
    }

    /// Whether the natural key (`externalId`) is mandatory for this kind.
    /// Gifts and contacts may omit it; such rows can only ever be created,
    /// never matched for update on a later import.
    pub fn natural_key_required(&self) -> bool {
        matches!(self, EntityKind::Constituent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Constituent => "constituent",
            EntityKind::Gift => "gift",
            EntityKind::Contact => "contact",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed source row: the ordered column values of a single data line,
/// keyed by (disambiguated) header name, plus its 1-based row number.
///
/// Raw rows exist only between parsing and mapping; once projected into a
/// [`CanonicalRecord`] they are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub row: usize,
    pub values: BTreeMap<String, String>,
}

impl RawRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

/// A mapped record holding only canonical field names for one entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub kind: EntityKind,
    /// 1-based data row number in the source file.
    pub row: usize,
    pub fields: BTreeMap<String, String>,
}

impl CanonicalRecord {
    pub fn new(kind: EntityKind, row: usize) -> Self {
        Self {
            kind,
            row,
            fields: BTreeMap::new(),
        }
    }

    /// Raw field value as imported, if the field was present at all.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Field value with blank-after-trim treated as absent. Sparse-update
    /// semantics build on this: an empty string never overwrites anything.
    pub fn value(&self, field: &str) -> Option<&str> {
        self.get(field)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn external_id(&self) -> Option<&str> {
        self.value("externalId")
    }

    pub fn constituent_external_id(&self) -> Option<&str> {
        self.value("constituentExternalId")
    }

    pub fn first_name(&self) -> Option<&str> {
        self.value("firstName")
    }

    pub fn last_name(&self) -> Option<&str> {
        self.value("lastName")
    }

    pub fn email(&self) -> Option<&str> {
        self.value("email")
    }
}

/// A record read back from the store: internal id plus its canonical field
/// values rendered as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: Uuid,
    pub external_id: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl StoredRecord {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_treated_as_absent() {
        let mut record = CanonicalRecord::new(EntityKind::Constituent, 1);
        record.fields.insert("firstName".into(), "  ".into());
        record.fields.insert("lastName".into(), "Smith".into());

        assert_eq!(record.first_name(), None);
        assert_eq!(record.last_name(), Some("Smith"));
        assert_eq!(record.get("firstName"), Some("  "));
    }

    #[test]
    fn gift_and_contact_kinds_reference_constituents() {
        assert!(!EntityKind::Constituent.references_constituent());
        assert!(EntityKind::Gift.references_constituent());
        assert!(EntityKind::Contact.references_constituent());
        assert!(EntityKind::Constituent.natural_key_required());
        assert!(!EntityKind::Gift.natural_key_required());
    }
}
