//! Entity resolution against the existing record store.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::similarity::name_similarity;
use crate::error::StoreError;
use crate::models::{CanonicalRecord, EntityKind};
use crate::store::RecordStore;

#[derive(Debug, Clone)]
pub struct MatchOptions {
    /// Minimum similarity for a candidate to count as a duplicate.
    pub min_score: f64,
    /// Maximum candidates returned per check, best first.
    pub max_candidates: usize,
    /// Length of the shared leading last-name substring that bounds the
    /// fuzzy search.
    pub prefix_len: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            min_score: 0.7,
            max_candidates: 5,
            prefix_len: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchCandidate {
    pub id: Uuid,
    /// Similarity in [0, 1].
    pub score: f64,
    pub match_type: MatchType,
    pub matched_fields: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateCheck {
    pub is_duplicate: bool,
    pub candidates: Vec<MatchCandidate>,
    pub best_match: Option<MatchCandidate>,
}

/// Exact duplicates for a whole batch, keyed by the value that matched.
#[derive(Debug, Default)]
pub struct BatchDuplicates {
    pub by_external_id: HashMap<String, Uuid>,
    pub by_email: HashMap<String, Vec<Uuid>>,
}

/// Finds existing constituents that are plausibly the same person as an
/// incoming record. All lookups are scoped to one tenant.
pub struct DuplicateMatcher<'a, S: RecordStore> {
    store: &'a S,
    tenant: Uuid,
    options: MatchOptions,
}

impl<'a, S: RecordStore> DuplicateMatcher<'a, S> {
    pub fn new(store: &'a S, tenant: Uuid) -> Self {
        Self {
            store,
            tenant,
            options: MatchOptions::default(),
        }
    }

    pub fn with_options(store: &'a S, tenant: Uuid, options: MatchOptions) -> Self {
        Self {
            store,
            tenant,
            options,
        }
    }

    /// Check one incoming record against the store.
    ///
    /// The cascade short-circuits on decisive hits: an exact natural-key
    /// match wins outright regardless of any name-field mismatch; exact
    /// email matches are decisive next; only then does the fuzzy name pass
    /// run, bounded to candidates sharing a leading last-name substring.
    pub async fn check(&self, record: &CanonicalRecord) -> Result<DuplicateCheck, StoreError> {
        if let Some(external_id) = record.external_id() {
            if let Some(id) = self
                .store
                .find_id_by_external_id(self.tenant, EntityKind::Constituent, external_id)
                .await?
            {
                return Ok(self.finalize(vec![MatchCandidate {
                    id,
                    score: 1.0,
                    match_type: MatchType::Exact,
                    matched_fields: vec!["externalId"],
                }]));
            }
        }

        if let Some(email) = record.email() {
            let holders = self
                .store
                .find_constituents_by_emails(self.tenant, &[email.to_lowercase()])
                .await?;
            if !holders.is_empty() {
                let candidates = holders
                    .into_iter()
                    .map(|existing| MatchCandidate {
                        id: existing.id,
                        score: 0.95,
                        match_type: MatchType::Exact,
                        matched_fields: vec!["email"],
                    })
                    .collect();
                return Ok(self.finalize(candidates));
            }
        }

        let Some(last_name) = record.last_name() else {
            return Ok(self.finalize(Vec::new()));
        };
        let prefix: String = last_name
            .to_lowercase()
            .chars()
            .take(self.options.prefix_len)
            .collect();
        let first_name = record.first_name().unwrap_or("");

        let pool = self
            .store
            .find_constituents_by_last_name_prefix(self.tenant, &prefix)
            .await?;
        log::trace!(
            "fuzzy check: {} candidates share last-name prefix `{}`",
            pool.len(),
            prefix
        );

        let candidates = pool
            .into_iter()
            .filter_map(|existing| {
                let score = name_similarity(
                    first_name,
                    last_name,
                    existing.get("firstName").unwrap_or(""),
                    existing.get("lastName").unwrap_or(""),
                );
                (score >= self.options.min_score).then(|| MatchCandidate {
                    id: existing.id,
                    score,
                    match_type: MatchType::Fuzzy,
                    matched_fields: vec!["firstName", "lastName"],
                })
            })
            .collect();

        Ok(self.finalize(candidates))
    }

    /// Exact-only duplicate detection for a whole batch.
    ///
    /// Uses at most two set-membership queries (natural keys, emails) so
    /// round-trips stay sub-linear in batch size. The fuzzy leading-substring
    /// pass that [`check`](Self::check) performs is deliberately not run
    /// here: at batch scale it is a performance trade-off, which means large
    /// imports can admit near-duplicate persons an interactive single check
    /// would flag. Callers wanting fuzzy coverage must check rows one at a
    /// time.
    pub async fn check_batch(
        &self,
        records: &[CanonicalRecord],
    ) -> Result<BatchDuplicates, StoreError> {
        let external_ids: Vec<String> = records
            .iter()
            .filter_map(|r| r.external_id())
            .map(str::to_string)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let emails: Vec<String> = records
            .iter()
            .filter_map(|r| r.email())
            .map(str::to_lowercase)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let by_external_id = if external_ids.is_empty() {
            HashMap::new()
        } else {
            self.store
                .find_ids_by_external_ids(self.tenant, EntityKind::Constituent, &external_ids)
                .await?
        };

        let mut by_email: HashMap<String, Vec<Uuid>> = HashMap::new();
        if !emails.is_empty() {
            let holders = self
                .store
                .find_constituents_by_emails(self.tenant, &emails)
                .await?;
            for existing in holders {
                if let Some(email) = existing.get("email") {
                    by_email.entry(email.to_lowercase()).or_default().push(existing.id);
                }
            }
        }

        Ok(BatchDuplicates {
            by_external_id,
            by_email,
        })
    }

    fn finalize(&self, mut candidates: Vec<MatchCandidate>) -> DuplicateCheck {
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        candidates.truncate(self.options.max_candidates);
        let best_match = candidates.first().cloned();
        let is_duplicate = best_match
            .as_ref()
            .is_some_and(|best| best.score >= self.options.min_score);
        DuplicateCheck {
            is_duplicate,
            candidates,
            best_match,
        }
    }
}
