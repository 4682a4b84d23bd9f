//! Batch-oriented import orchestration.
//!
//! Three importers share one engine: constituents are the anchor records,
//! gifts and contacts resolve their owning constituent by natural key before
//! writing. Each importer consumes parsed rows plus a confirmed field
//! mapping, drives batched create/update persistence with
//! fallback-to-individual-row resilience, and returns an [`ImportResult`]
//! describing exactly what succeeded and what did not. Row-level problems
//! never abort an import: one malformed vendor export row should not block
//! ingestion of the rest of a large file.

mod bulkhead;
mod engine;
mod result;

pub use result::{ImportResult, RowError};

use uuid::Uuid;

use crate::error::StoreError;
use crate::mapping::FieldMapping;
use crate::models::{EntityKind, RawRow};
use crate::store::RecordStore;

/// Rows per persistence batch.
pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub batch_size: usize,
    /// Skip rows whose content fingerprint matches the stored record
    /// instead of issuing no-op updates.
    pub skip_unchanged: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            skip_unchanged: true,
        }
    }
}

/// Imports constituent rows: the tenant's anchor records, keyed by
/// `externalId`.
pub struct ConstituentImporter<'a, S: RecordStore> {
    store: &'a S,
    tenant: Uuid,
    options: ImportOptions,
}

impl<'a, S: RecordStore> ConstituentImporter<'a, S> {
    pub fn new(store: &'a S, tenant: Uuid) -> Self {
        Self::with_options(store, tenant, ImportOptions::default())
    }

    pub fn with_options(store: &'a S, tenant: Uuid, options: ImportOptions) -> Self {
        Self {
            store,
            tenant,
            options,
        }
    }

    /// Run the import. `progress` is invoked after each batch with
    /// `(processed_so_far, total)`.
    pub async fn process(
        &self,
        rows: &[RawRow],
        mapping: &FieldMapping,
        progress: Option<&mut dyn FnMut(usize, usize)>,
    ) -> Result<ImportResult, StoreError> {
        engine::run_import(
            self.store,
            self.tenant,
            EntityKind::Constituent,
            rows,
            mapping,
            &self.options,
            progress,
        )
        .await
    }
}

/// Imports gift rows; each must resolve `constituentExternalId` to an
/// existing constituent in the same tenant.
pub struct GiftImporter<'a, S: RecordStore> {
    store: &'a S,
    tenant: Uuid,
    options: ImportOptions,
}

impl<'a, S: RecordStore> GiftImporter<'a, S> {
    pub fn new(store: &'a S, tenant: Uuid) -> Self {
        Self::with_options(store, tenant, ImportOptions::default())
    }

    pub fn with_options(store: &'a S, tenant: Uuid, options: ImportOptions) -> Self {
        Self {
            store,
            tenant,
            options,
        }
    }

    pub async fn process(
        &self,
        rows: &[RawRow],
        mapping: &FieldMapping,
        progress: Option<&mut dyn FnMut(usize, usize)>,
    ) -> Result<ImportResult, StoreError> {
        engine::run_import(
            self.store,
            self.tenant,
            EntityKind::Gift,
            rows,
            mapping,
            &self.options,
            progress,
        )
        .await
    }
}

/// Imports contact rows; each must resolve `constituentExternalId` to an
/// existing constituent in the same tenant.
pub struct ContactImporter<'a, S: RecordStore> {
    store: &'a S,
    tenant: Uuid,
    options: ImportOptions,
}

impl<'a, S: RecordStore> ContactImporter<'a, S> {
    pub fn new(store: &'a S, tenant: Uuid) -> Self {
        Self::with_options(store, tenant, ImportOptions::default())
    }

    pub fn with_options(store: &'a S, tenant: Uuid, options: ImportOptions) -> Self {
        Self {
            store,
            tenant,
            options,
        }
    }

    pub async fn process(
        &self,
        rows: &[RawRow],
        mapping: &FieldMapping,
        progress: Option<&mut dyn FnMut(usize, usize)>,
    ) -> Result<ImportResult, StoreError> {
        engine::run_import(
            self.store,
            self.tenant,
            EntityKind::Contact,
            rows,
            mapping,
            &self.options,
            progress,
        )
        .await
    }
}
