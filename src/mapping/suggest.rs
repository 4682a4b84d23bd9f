//! Mapping inference with per-column confidence.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use super::normalize::{normalize_key, normalize_words, tokens};
use super::{FieldMapping, patterns};
use crate::models::EntityKind;
use crate::schema;

/// Confidence for an exact match after normalization.
const EXACT_SCORE: f64 = 1.0;
/// Confidence for a known legacy naming convention.
const PATTERN_SCORE: f64 = 0.95;
/// Confidence for substring containment in either direction.
const CONTAINMENT_SCORE: f64 = 0.7;
/// Token-overlap scores are scaled into this band.
const TOKEN_SCORE_FLOOR: f64 = 0.3;
const TOKEN_SCORE_SPAN: f64 = 0.3;

/// Assignment thresholds. Two passes are run: the first only assigns
/// strong candidates, the second fills remaining targets from weaker
/// ones, so near-exact matches always win priority over vague ones
/// regardless of column order.
#[derive(Debug, Clone)]
pub struct SuggestOptions {
    pub strong_threshold: f64,
    pub weak_threshold: f64,
}

impl Default for SuggestOptions {
    fn default() -> Self {
        Self {
            strong_threshold: 0.7,
            weak_threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MappingSuggestion {
    /// Every source column, mapped to a canonical field or left unmapped.
    pub mapping: FieldMapping,
    /// Confidence per mapped column.
    pub confidence: BTreeMap<String, f64>,
    pub unmapped_columns: Vec<String>,
    pub required_fields: Vec<&'static str>,
    pub optional_fields: Vec<&'static str>,
}

/// Score one (column, canonical field) pair.
///
/// Precedence: exact normalized match, known legacy convention, substring
/// containment, token overlap. The first tier that applies decides the
/// score.
pub fn score_pair(kind: EntityKind, column: &str, field: &str) -> f64 {
    let column_key = normalize_key(column);
    let field_key = normalize_key(field);
    if column_key.is_empty() {
        return 0.0;
    }
    if column_key == field_key {
        return EXACT_SCORE;
    }
    if patterns::matches_known_convention(kind, field, &normalize_words(column)) {
        return PATTERN_SCORE;
    }
    // Containment of a tiny key proves nothing; require some substance.
    let shorter = column_key.len().min(field_key.len());
    if shorter >= 3 && (column_key.contains(&field_key) || field_key.contains(&column_key)) {
        return CONTAINMENT_SCORE;
    }

    let column_tokens: HashSet<String> = tokens(column).into_iter().collect();
    let field_tokens: HashSet<String> = tokens(field).into_iter().collect();
    let overlap = column_tokens.intersection(&field_tokens).count();
    if overlap == 0 {
        return 0.0;
    }
    let union = column_tokens.union(&field_tokens).count();
    TOKEN_SCORE_FLOOR + TOKEN_SCORE_SPAN * (overlap as f64 / union as f64)
}

/// Infer a column → canonical-field mapping for one entity kind.
///
/// All (column, field, score) triples are computed, sorted by score, and
/// assigned greedily: each column claims its best still-unclaimed target.
/// The result is injective by construction.
pub fn suggest(columns: &[String], kind: EntityKind, options: &SuggestOptions) -> MappingSuggestion {
    let fields = schema::fields(kind);

    let mut triples: Vec<(usize, usize, f64)> = Vec::new();
    for (c, column) in columns.iter().enumerate() {
        for (f, field) in fields.iter().enumerate() {
            let score = score_pair(kind, column, field.name);
            if score >= options.weak_threshold {
                triples.push((c, f, score));
            }
        }
    }
    triples.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));

    let mut assigned: BTreeMap<usize, (usize, f64)> = BTreeMap::new();
    let mut claimed: HashSet<usize> = HashSet::new();
    for threshold in [options.strong_threshold, options.weak_threshold] {
        for &(c, f, score) in &triples {
            if score < threshold || assigned.contains_key(&c) || claimed.contains(&f) {
                continue;
            }
            assigned.insert(c, (f, score));
            claimed.insert(f);
        }
    }

    let mut mapping = FieldMapping::new();
    let mut confidence = BTreeMap::new();
    let mut unmapped_columns = Vec::new();
    for (c, column) in columns.iter().enumerate() {
        match assigned.get(&c) {
            Some(&(f, score)) => {
                mapping.insert(column.clone(), Some(fields[f].name.to_string()));
                confidence.insert(column.clone(), score);
            }
            None => {
                mapping.insert(column.clone(), None);
                unmapped_columns.push(column.clone());
            }
        }
    }

    log::debug!(
        "suggested mapping for {} columns ({}): {} mapped, {} unmapped",
        columns.len(),
        kind,
        confidence.len(),
        unmapped_columns.len()
    );

    MappingSuggestion {
        mapping,
        confidence,
        unmapped_columns,
        required_fields: schema::required_fields(kind),
        optional_fields: schema::optional_fields(kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn legacy_export_headers_map_to_canonical_fields() {
        let suggestion = suggest(
            &cols(&["KEYID", "FIRSTNM", "LASTNM"]),
            EntityKind::Constituent,
            &SuggestOptions::default(),
        );

        assert_eq!(
            suggestion.mapping.get("KEYID").unwrap().as_deref(),
            Some("externalId")
        );
        assert_eq!(
            suggestion.mapping.get("FIRSTNM").unwrap().as_deref(),
            Some("firstName")
        );
        assert_eq!(
            suggestion.mapping.get("LASTNM").unwrap().as_deref(),
            Some("lastName")
        );
        let keyid_confidence = suggestion.confidence["KEYID"];
        assert!((keyid_confidence - 0.95).abs() < f64::EPSILON);
        assert!(suggestion.unmapped_columns.is_empty());
    }

    #[test]
    fn exact_matches_outrank_pattern_matches() {
        assert_eq!(
            score_pair(EntityKind::Constituent, "external_id", "externalId"),
            1.0
        );
        assert_eq!(score_pair(EntityKind::Constituent, "KEYID", "externalId"), 0.95);
        assert_eq!(
            score_pair(EntityKind::Constituent, "email_address_home", "email"),
            0.7
        );
        assert_eq!(
            score_pair(EntityKind::Constituent, "gibberish", "lastName"),
            0.0
        );
    }

    #[test]
    fn token_overlap_lands_in_the_weak_band() {
        let score = score_pair(EntityKind::Constituent, "wealth capacity band", "estimatedCapacity");
        assert!(score >= 0.3 && score <= 0.6, "score was {score}");
    }

    #[test]
    fn suggested_mappings_are_injective() {
        let suggestion = suggest(
            &cols(&["Last Name", "Surname", "LASTNM", "lname"]),
            EntityKind::Constituent,
            &SuggestOptions::default(),
        );

        let mut seen = HashSet::new();
        for target in suggestion.mapping.values().flatten() {
            assert!(seen.insert(target.clone()), "field {target} claimed twice");
        }
        // The exact match won the contested target.
        assert_eq!(
            suggestion.mapping.get("Last Name").unwrap().as_deref(),
            Some("lastName")
        );
    }

    #[test]
    fn gift_reference_column_beats_gift_key() {
        let suggestion = suggest(
            &cols(&["gift_id", "constituent_id", "amount", "gift_date"]),
            EntityKind::Gift,
            &SuggestOptions::default(),
        );

        assert_eq!(
            suggestion.mapping.get("constituent_id").unwrap().as_deref(),
            Some("constituentExternalId")
        );
        assert_eq!(
            suggestion.mapping.get("gift_id").unwrap().as_deref(),
            Some("externalId")
        );
        assert_eq!(
            suggestion.mapping.get("amount").unwrap().as_deref(),
            Some("amount")
        );
        assert_eq!(
            suggestion.mapping.get("gift_date").unwrap().as_deref(),
            Some("giftDate")
        );
    }
}
