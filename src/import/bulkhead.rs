//! Batch writes with per-row fallback.
//!
//! One multi-row statement is attempted first. If it fails, the batch
//! degrades to one-row-at-a-time writes, so a single malformed or
//! constraint-violating row cannot sink the rest of its batch: each row
//! that still fails individually is reported and subtracted from the
//! optimistic count, while its siblings land normally. Shared by all three
//! entity-kind importers.

use uuid::Uuid;

use super::result::RowError;
use crate::error::StoreError;
use crate::models::EntityKind;
use crate::store::{NewRecord, RecordStore, RecordUpdate};

pub(super) struct PendingCreate {
    pub row: usize,
    pub natural_key: Option<String>,
    pub record: NewRecord,
}

pub(super) struct PendingUpdate {
    pub row: usize,
    pub natural_key: Option<String>,
    pub update: RecordUpdate,
}

/// Returns `(created, conflict_skipped)`.
pub(super) async fn insert_with_fallback<S: RecordStore>(
    store: &S,
    tenant: Uuid,
    kind: EntityKind,
    pending: &[PendingCreate],
    errors: &mut Vec<RowError>,
) -> (usize, usize) {
    if pending.is_empty() {
        return (0, 0);
    }

    let records: Vec<NewRecord> = pending.iter().map(|p| p.record.clone()).collect();
    match store.insert_batch(tenant, kind, &records).await {
        Ok(inserted) => (inserted, pending.len() - inserted),
        Err(err) => {
            log::warn!(
                "bulk insert of {} {} rows failed, retrying row by row: {}",
                pending.len(),
                kind,
                err
            );
            let mut created = 0;
            let mut skipped = 0;
            for item in pending {
                match store.insert_one(tenant, kind, &item.record).await {
                    Ok(1) => created += 1,
                    Ok(_) => skipped += 1,
                    Err(err) => errors.push(RowError {
                        row: item.row,
                        field: None,
                        natural_key: item.natural_key.clone(),
                        message: err.to_string(),
                    }),
                }
            }
            (created, skipped)
        }
    }
}

/// Returns the number of rows successfully updated.
pub(super) async fn update_with_fallback<S: RecordStore>(
    store: &S,
    tenant: Uuid,
    kind: EntityKind,
    pending: &[PendingUpdate],
    errors: &mut Vec<RowError>,
) -> usize {
    if pending.is_empty() {
        return 0;
    }

    let updates: Vec<RecordUpdate> = pending.iter().map(|p| p.update.clone()).collect();
    match store.update_batch(tenant, kind, &updates).await {
        Ok(()) => pending.len(),
        Err(err) => {
            log::warn!(
                "transactional update of {} {} rows failed, retrying row by row: {}",
                pending.len(),
                kind,
                err
            );
            let mut updated = 0;
            for item in pending {
                match store.update_one(tenant, kind, &item.update).await {
                    Ok(()) => updated += 1,
                    Err(err) => errors.push(RowError {
                        row: item.row,
                        field: None,
                        natural_key: item.natural_key.clone(),
                        message: err.to_string(),
                    }),
                }
            }
            updated
        }
    }
}
