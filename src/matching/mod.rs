//! Duplicate detection and entity resolution.
//!
//! Given a mapped candidate record, finds existing constituents that are
//! plausibly the same person. Exact signals (natural key, email) are checked
//! first and decide immediately; a fuzzy name comparison with a nickname
//! table handles the noisy rest. Matching never crosses tenant boundaries.

mod matcher;
mod nicknames;
mod similarity;

pub use matcher::{
    BatchDuplicates, DuplicateCheck, DuplicateMatcher, MatchCandidate, MatchOptions, MatchType,
};
pub use nicknames::is_nickname_pair;
pub use similarity::{NICKNAME_BONUS, name_similarity, string_similarity};
