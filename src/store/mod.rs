//! Tenant-scoped record repositories.
//!
//! The import core is written against [`RecordStore`] and never assumes a
//! concrete storage technology. [`PgStore`] is the PostgreSQL-backed
//! implementation; [`MemStore`] backs tests and dry runs.
//!
//! Every call takes an explicit tenant id. No operation reads or writes
//! across tenants, so concurrent imports for different tenants are fully
//! independent.

pub mod memory;
pub mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{EntityKind, StoredRecord};

/// Insert payload: canonical field values plus pre-resolved identity.
#[derive(Debug, Clone)]
pub struct NewRecord {
    /// Tenant-scoped natural key. Mandatory for constituents; optional for
    /// gifts and contacts.
    pub external_id: Option<String>,
    /// Owning constituent, already resolved from `constituentExternalId`.
    /// Required for gift and contact rows.
    pub constituent_id: Option<Uuid>,
    pub fields: BTreeMap<String, String>,
}

/// Sparse update payload: only the fields present are written.
#[derive(Debug, Clone)]
pub struct RecordUpdate {
    pub id: Uuid,
    pub fields: BTreeMap<String, String>,
}

/// Abstract persistence interface for the canonical record store.
///
/// Batch lookups are set-membership queries, not one query per key. Batch
/// inserts skip natural-key conflicts rather than failing on them.
/// `update_batch` executes as one transactional group where the backend
/// supports it; the per-row variants exist for the fallback write path.
#[allow(async_fn_in_trait)]
pub trait RecordStore {
    async fn find_id_by_external_id(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        external_id: &str,
    ) -> Result<Option<Uuid>, StoreError>;

    async fn find_ids_by_external_ids(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        external_ids: &[String],
    ) -> Result<HashMap<String, Uuid>, StoreError>;

    async fn fetch_by_external_ids(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        external_ids: &[String],
    ) -> Result<Vec<StoredRecord>, StoreError>;

    /// Constituents whose email matches any of the given (lowercased)
    /// addresses.
    async fn find_constituents_by_emails(
        &self,
        tenant: Uuid,
        emails: &[String],
    ) -> Result<Vec<StoredRecord>, StoreError>;

    /// Constituents whose last name starts with the given (lowercased)
    /// prefix. Bounds the fuzzy duplicate search.
    async fn find_constituents_by_last_name_prefix(
        &self,
        tenant: Uuid,
        prefix: &str,
    ) -> Result<Vec<StoredRecord>, StoreError>;

    async fn list_external_ids(
        &self,
        tenant: Uuid,
        kind: EntityKind,
    ) -> Result<Vec<String>, StoreError>;

    /// Insert a batch, skipping natural-key conflicts. Returns the number of
    /// rows actually inserted.
    async fn insert_batch(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        records: &[NewRecord],
    ) -> Result<usize, StoreError>;

    /// Insert one record; returns 1, or 0 on a natural-key conflict.
    async fn insert_one(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        record: &NewRecord,
    ) -> Result<usize, StoreError>;

    async fn update_batch(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        updates: &[RecordUpdate],
    ) -> Result<(), StoreError>;

    async fn update_one(
        &self,
        tenant: Uuid,
        kind: EntityKind,
        update: &RecordUpdate,
    ) -> Result<(), StoreError>;
}
