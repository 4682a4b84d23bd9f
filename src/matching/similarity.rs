//! Name similarity scoring.

use strsim::levenshtein;

use super::nicknames::is_nickname_pair;

const LAST_NAME_WEIGHT: f64 = 0.7;
const FIRST_NAME_WEIGHT: f64 = 0.3;
/// Added when the two first names are a known formal/nickname pair.
pub const NICKNAME_BONUS: f64 = 0.2;

/// Edit-distance similarity in [0, 1]: `1 - distance / max_len`,
/// case-insensitive. Two empty strings are identical.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / max_len as f64
}

/// Weighted full-name similarity in [0, 1].
///
/// Last names dominate because they are the more stable signal; first names
/// drift across exports (initials, nicknames, misspellings). A known
/// nickname pair earns a bonus, and an exact full-name match short-circuits
/// to 1.0 regardless of the weighted formula.
pub fn name_similarity(first_a: &str, last_a: &str, first_b: &str, last_b: &str) -> f64 {
    let full_a = format!("{} {}", first_a.trim(), last_a.trim()).to_lowercase();
    let full_b = format!("{} {}", first_b.trim(), last_b.trim()).to_lowercase();
    if !full_a.trim().is_empty() && full_a == full_b {
        return 1.0;
    }

    let mut score = LAST_NAME_WEIGHT * string_similarity(last_a, last_b)
        + FIRST_NAME_WEIGHT * string_similarity(first_a, first_b);
    if is_nickname_pair(first_a, first_b) {
        score += NICKNAME_BONUS;
    }
    score.clamp(0.0, 1.0)
}
