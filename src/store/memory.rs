//! In-memory record store backing tests and dry runs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

use super::{NewRecord, RecordStore, RecordUpdate};
use crate::error::StoreError;
use crate::models::{EntityKind, StoredRecord};

#[derive(Debug, Clone)]
struct MemRecord {
    id: Uuid,
    external_id: Option<String>,
    constituent_id: Option<Uuid>,
    fields: BTreeMap<String, String>,
}

/// Hash-map-backed [`RecordStore`].
///
/// Mirrors the PostgreSQL implementation's observable behavior: natural-key
/// conflicts are skipped on insert, batch updates apply all-or-nothing, and
/// gift/contact rows must carry a resolved constituent id. Locks are held
/// only for the duration of each synchronous map operation.
#[derive(Debug, Default)]
pub struct MemStore {
    records: Mutex<HashMap<(Uuid, EntityKind), Vec<MemRecord>>>,
    rejected_keys: Mutex<HashSet<String>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write touching this natural key fail, simulating a row
    /// that violates a constraint the conflict-skip cannot absorb. Lets
    /// tests exercise the bulkhead fallback path.
    pub fn reject_external_id(&self, external_id: &str) {
        self.rejected_keys
            .lock()
            .unwrap()
            .insert(external_id.to_string());
    }

    /// Number of records held for a tenant/kind.
    pub fn count(&self, tenant: Uuid, kind: EntityKind) -> usize {
        self.records
            .lock()
            .unwrap()
            .get(&(tenant, kind))
            .map_or(0, Vec::len)
    }

    fn to_stored(&self, tenant: Uuid, record: &MemRecord) -> StoredRecord {
        let mut fields = record.fields.clone();
        if let Some(external_id) = &record.external_id {
            fields.insert("externalId".to_string(), external_id.clone());
        }
        // Gifts and contacts expose their owner's natural key the way a
        // joined read would.
        if let Some(constituent_id) = record.constituent_id {
            let records = self.records.lock().unwrap();
            if let Some(constituents) = records.get(&(tenant, EntityKind::Constituent)) {
                if let Some(owner) = constituents.iter().find(|c| c.id == constituent_id) {
                    if let Some(key) = &owner.external_id {
                        fields.insert("constituentExternalId".to_string(), key.clone());
                    }
                }
            }
        }
        StoredRecord {
            id: record.id,
            external_id: record.external_id.clone(),
            fields,
        }
    }

    fn check_writable(&self, record: &NewRecord, kind: EntityKind) -> Result<(), StoreError> {
        if let Some(key) = &record.external_id {
            if self.rejected_keys.lock().unwrap().contains(key) {
                return Err(StoreError::Rejected(format!(
                    "constraint violation on record `{}`",
                    key
                )));
            }
        }
        if kind.references_constituent() && record.constituent_id.is_none() {
            return Err(StoreError::Rejected(format!(
                "{} row is missing its constituent reference",
                kind
            )));
        }
        Ok(())
    }
}

impl RecordStore for MemStore {
    async fn find_id_by_external_id(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        external_id: &str,
    ) -> Result<Option<Uuid>, StoreError> {
        let records = self.records.lock().unwrap();
        Ok(records.get(&(tenant, kind)).and_then(|list| {
            list.iter()
                .find(|r| r.external_id.as_deref() == Some(external_id))
                .map(|r| r.id)
        }))
    }

    async fn find_ids_by_external_ids(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        external_ids: &[String],
    ) -> Result<HashMap<String, Uuid>, StoreError> {
        let wanted: HashSet<&str> = external_ids.iter().map(String::as_str).collect();
        let records = self.records.lock().unwrap();
        let mut found = HashMap::new();
        if let Some(list) = records.get(&(tenant, kind)) {
            for record in list {
                if let Some(key) = &record.external_id {
                    if wanted.contains(key.as_str()) {
                        found.insert(key.clone(), record.id);
                    }
                }
            }
        }
        Ok(found)
    }

    async fn fetch_by_external_ids(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        external_ids: &[String],
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let wanted: HashSet<&str> = external_ids.iter().map(String::as_str).collect();
        let matching: Vec<MemRecord> = {
            let records = self.records.lock().unwrap();
            records
                .get(&(tenant, kind))
                .map(|list| {
                    list.iter()
                        .filter(|r| {
                            r.external_id
                                .as_deref()
                                .is_some_and(|key| wanted.contains(key))
                        })
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };
        Ok(matching
            .iter()
            .map(|r| self.to_stored(tenant, r))
            .collect())
    }

    async fn find_constituents_by_emails(
        &self,
        tenant: Uuid,
        emails: &[String],
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let wanted: HashSet<&str> = emails.iter().map(String::as_str).collect();
        let matching: Vec<MemRecord> = {
            let records = self.records.lock().unwrap();
            records
                .get(&(tenant, EntityKind::Constituent))
                .map(|list| {
                    list.iter()
                        .filter(|r| {
                            r.fields
                                .get("email")
                                .is_some_and(|e| wanted.contains(e.to_lowercase().as_str()))
                        })
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };
        Ok(matching
            .iter()
            .map(|r| self.to_stored(tenant, r))
            .collect())
    }

    async fn find_constituents_by_last_name_prefix(
        &self,
        tenant: Uuid,
        prefix: &str,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let prefix = prefix.to_lowercase();
        let matching: Vec<MemRecord> = {
            let records = self.records.lock().unwrap();
            records
                .get(&(tenant, EntityKind::Constituent))
                .map(|list| {
                    list.iter()
                        .filter(|r| {
                            r.fields
                                .get("lastName")
                                .is_some_and(|l| l.to_lowercase().starts_with(&prefix))
                        })
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };
        Ok(matching
            .iter()
            .map(|r| self.to_stored(tenant, r))
            .collect())
    }

    async fn list_external_ids(
        &self,
        tenant: Uuid,
        kind: EntityKind,
    ) -> Result<Vec<String>, StoreError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .get(&(tenant, kind))
            .map(|list| list.iter().filter_map(|r| r.external_id.clone()).collect())
            .unwrap_or_default())
    }

    async fn insert_batch(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        records: &[NewRecord],
    ) -> Result<usize, StoreError> {
        // A single bad row fails the whole statement, exactly like a bulk
        // insert hitting a constraint violation.
        for record in records {
            self.check_writable(record, kind)?;
        }
        let mut inserted = 0;
        for record in records {
            inserted += self.insert_unchecked(tenant, kind, record);
        }
        Ok(inserted)
    }

    async fn insert_one(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        record: &NewRecord,
    ) -> Result<usize, StoreError> {
        self.check_writable(record, kind)?;
        Ok(self.insert_unchecked(tenant, kind, record))
    }

    async fn update_batch(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        updates: &[RecordUpdate],
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().unwrap();
        let list = records.entry((tenant, kind)).or_default();

        // All-or-nothing, like a transactional group: verify before applying.
        for update in updates {
            if !list.iter().any(|r| r.id == update.id) {
                return Err(StoreError::Rejected(format!(
                    "no {} record {} for this tenant",
                    kind, update.id
                )));
            }
            if let Some(key) = list
                .iter()
                .find(|r| r.id == update.id)
                .and_then(|r| r.external_id.clone())
            {
                if self.rejected_keys.lock().unwrap().contains(&key) {
                    return Err(StoreError::Rejected(format!(
                        "constraint violation on record `{}`",
                        key
                    )));
                }
            }
        }

        for update in updates {
            let record = list.iter_mut().find(|r| r.id == update.id).unwrap();
            for (field, value) in &update.fields {
                record.fields.insert(field.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn update_one(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        update: &RecordUpdate,
    ) -> Result<(), StoreError> {
        self.update_batch(tenant, kind, std::slice::from_ref(update)).await
    }
}

impl MemStore {
    /// Returns 1 on insert, 0 on a natural-key conflict skip.
    fn insert_unchecked(&self, tenant: Uuid, kind: EntityKind, record: &NewRecord) -> usize {
        let mut records = self.records.lock().unwrap();
        let list = records.entry((tenant, kind)).or_default();
        if let Some(key) = &record.external_id {
            if list.iter().any(|r| r.external_id.as_deref() == Some(key)) {
                return 0;
            }
        }
        list.push(MemRecord {
            id: Uuid::new_v4(),
            external_id: record.external_id.clone(),
            constituent_id: record.constituent_id,
            fields: record.fields.clone(),
        });
        1
    }
}
