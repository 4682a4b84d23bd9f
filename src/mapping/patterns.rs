//! Known legacy naming conventions per canonical field.
//!
//! Each entry pairs a canonical field with the header spellings observed
//! across real CRM exports (Raiser's Edge style `KEYID`/`FIRSTNM`, plain
//! snake_case dumps, spreadsheet headings). Patterns are matched against the
//! normalized (`normalize_words`) form of a column name, so they only need
//! to cover lowercase words separated by optional underscores.
//!
//! The tables are immutable static data, safe to share across concurrent
//! imports.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::models::EntityKind;

const CONSTITUENT_PATTERNS: &[(&str, &[&str])] = &[
    (
        "externalId",
        &[
            "^key_?id$",
            "^(constituent|donor|cust(omer)?|member|account|acct|client|record|entity)_?(id|no|num(ber)?|key)$",
            "^id$",
            "^id_?(no|num(ber)?)$",
            "^unique_?id$",
            "^alt(ernate)?_?id$",
        ],
    ),
    (
        "firstName",
        &["^first_?nm$", "^f_?name$", "^first$", "^given_?name$", "^fore_?name$"],
    ),
    (
        "lastName",
        &["^last_?nm$", "^l_?name$", "^last$", "^sur_?name$", "^family_?name$"],
    ),
    (
        "middleName",
        &["^middle_?nm$", "^m_?name$", "^middle$", "^middle_?initial$", "^mi$"],
    ),
    ("prefix", &["^title$", "^salutation$", "^name_?prefix$", "^honorific$"]),
    ("suffix", &["^name_?suffix$", "^generational(_?suffix)?$"]),
    (
        "email",
        &["^e_?mail$", "^e_?mail_?(address|addr)$", "^email_?1$", "^preferred_?e_?mail$"],
    ),
    (
        "phone",
        &[
            "^phone_?(no|num(ber)?)?$",
            "^telephone$",
            "^tel$",
            "^home_?phone$",
            "^cell(_?phone)?$",
            "^mobile(_?phone)?$",
            "^phone_?1$",
        ],
    ),
    (
        "addressLine1",
        &[
            "^add?r(ess)?_?(line)?_?1$",
            "^street(_?address)?(_?1)?$",
            "^mailing_?address(_?1)?$",
            "^address$",
        ],
    ),
    (
        "addressLine2",
        &["^add?r(ess)?_?(line)?_?2$", "^street(_?address)?_?2$", "^apt$", "^unit$", "^suite$"],
    ),
    ("city", &["^town$", "^municipality$", "^city_?name$"]),
    ("state", &["^st$", "^state_?(code|province)$", "^province$", "^region$"]),
    ("postalCode", &["^zip(_?code)?$", "^post_?code$", "^postal$"]),
    ("country", &["^country_?code$", "^nation$"]),
    (
        "constituentType",
        &["^(constituent|donor|record|const)_?type$", "^type$"],
    ),
    (
        "classYear",
        &[
            "^class(_?year|_?of)?$",
            "^grad(uation)?_?(year|yr)$",
            "^year_?graduated$",
            "^class_?yr$",
            "^cohort$",
        ],
    ),
    (
        "schoolCollege",
        &["^school(_?college|_?name)?$", "^college$", "^division$"],
    ),
    (
        "estimatedCapacity",
        &[
            "^(estimated_?)?capacity(_?rating|_?amount)?$",
            "^wealth_?(rating|capacity|estimate)$",
            "^gift_?capacity$",
        ],
    ),
    (
        "capacitySource",
        &["^capacity_?source$", "^wealth_?(screening_?)?source$", "^rating_?source$", "^screening_?source$"],
    ),
    (
        "assignedOfficerId",
        &[
            "^(assigned_?)?officer(_?id)?$",
            "^gift_?officer(_?id)?$",
            "^solicitor(_?id)?$",
            "^manager_?id$",
            "^primary_?manager$",
        ],
    ),
    (
        "portfolioTier",
        &["^portfolio(_?tier|_?level)?$", "^tier$", "^donor_?level$", "^giving_?level$"],
    ),
];

const GIFT_PATTERNS: &[(&str, &[&str])] = &[
    (
        "constituentExternalId",
        &[
            "^(constituent|donor|cust(omer)?|member|client)_?(id|no|num(ber)?|key)$",
            "^key_?id$",
            "^const_?id$",
        ],
    ),
    (
        "externalId",
        &["^gift_?(id|no|num(ber)?|key)$", "^transaction_?(id|no)$", "^receipt_?(no|num(ber)?)$", "^id$"],
    ),
    (
        "amount",
        &["^(gift_?)?amount$", "^amt$", "^gift_?amt$", "^donation(_?amount)?$", "^payment_?amount$", "^total_?amount$"],
    ),
    (
        "giftDate",
        &[
            "^(gift_?)?date$",
            "^date_?of_?gift$",
            "^donation_?date$",
            "^gift_?dt$",
            "^transaction_?date$",
            "^posted_?date$",
            "^received_?date$",
        ],
    ),
    (
        "giftType",
        &["^gift_?type$", "^payment_?(type|method)$", "^donation_?type$", "^tender(_?type)?$"],
    ),
    ("fundName", &["^fund(_?name)?$", "^designation(_?name)?$", "^allocation$"]),
    ("fundCode", &["^fund_?(code|id)$", "^designation_?code$", "^allocation_?code$"]),
    ("campaign", &["^campaign_?(name|code)$", "^initiative$"]),
    ("appeal", &["^appeal_?(name|code)$", "^solicitation(_?code)?$", "^source_?code$"]),
    (
        "recognitionAmount",
        &["^recognition_?(amount|amt|credit)$", "^soft_?credit(_?amount)?$", "^credit_?amount$"],
    ),
    ("isAnonymous", &["^(is_?)?anon(ymous)?(_?flag|_?gift)?$"]),
    ("isMatching", &["^(is_?)?match(ing)?(_?gift)?(_?flag)?$"]),
    (
        "matchingCompany",
        &["^match(ing)?_?(gift_?)?company$", "^employer_?match$", "^matching_?org(anization)?$"],
    ),
    ("tributeType", &["^tribute_?type$", "^memorial_?type$", "^honor_?type$"]),
    (
        "tributeName",
        &["^tribute(_?name)?$", "^in_?memory_?of$", "^in_?honor_?of$", "^memorial_?name$", "^honoree$"],
    ),
];

const CONTACT_PATTERNS: &[(&str, &[&str])] = &[
    (
        "constituentExternalId",
        &[
            "^(constituent|donor|cust(omer)?|member|client)_?(id|no|num(ber)?|key)$",
            "^key_?id$",
            "^const_?id$",
        ],
    ),
    (
        "externalId",
        &["^contact_?(id|no)$", "^activity_?id$", "^interaction_?id$", "^id$"],
    ),
    (
        "contactDate",
        &[
            "^(contact_?)?date$",
            "^date_?of_?contact$",
            "^activity_?date$",
            "^interaction_?date$",
            "^touch_?date$",
        ],
    ),
    (
        "contactType",
        &["^contact_?(type|method)$", "^activity_?type$", "^interaction_?type$", "^method$", "^channel$"],
    ),
    ("subject", &["^subject_?line$", "^topic$", "^summary$", "^re$"]),
    ("notes", &["^note$", "^comment(s)?$", "^description$", "^detail(s)?$", "^memo$", "^narrative$"]),
    ("outcome", &["^result$", "^disposition$", "^contact_?outcome$"]),
    (
        "nextAction",
        &["^next_?action$", "^next_?step(s)?$", "^follow_?up(_?action)?$", "^action_?item$"],
    ),
    (
        "nextActionDate",
        &["^next_?action_?date$", "^follow_?up_?date$", "^action_?date$", "^due_?date$", "^next_?step_?date$"],
    ),
];

type PatternIndex = HashMap<&'static str, Vec<Regex>>;

fn compile(table: &[(&'static str, &[&str])]) -> PatternIndex {
    table
        .iter()
        .map(|(field, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).expect("static pattern compiles"))
                .collect();
            (*field, compiled)
        })
        .collect()
}

static CONSTITUENT_INDEX: LazyLock<PatternIndex> = LazyLock::new(|| compile(CONSTITUENT_PATTERNS));
static GIFT_INDEX: LazyLock<PatternIndex> = LazyLock::new(|| compile(GIFT_PATTERNS));
static CONTACT_INDEX: LazyLock<PatternIndex> = LazyLock::new(|| compile(CONTACT_PATTERNS));

/// Whether the normalized column name matches a known legacy spelling of
/// the given canonical field.
pub fn matches_known_convention(kind: EntityKind, field: &str, normalized_column: &str) -> bool {
    let index = match kind {
        EntityKind::Constituent => &*CONSTITUENT_INDEX,
        EntityKind::Gift => &*GIFT_INDEX,
        EntityKind::Contact => &*CONTACT_INDEX,
    };
    index
        .get(field)
        .is_some_and(|patterns| patterns.iter().any(|p| p.is_match(normalized_column)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_constituent_headers_are_recognized() {
        assert!(matches_known_convention(EntityKind::Constituent, "externalId", "keyid"));
        assert!(matches_known_convention(EntityKind::Constituent, "externalId", "donor_id"));
        assert!(matches_known_convention(EntityKind::Constituent, "firstName", "firstnm"));
        assert!(matches_known_convention(EntityKind::Constituent, "lastName", "surname"));
        assert!(matches_known_convention(EntityKind::Constituent, "postalCode", "zip"));
        assert!(!matches_known_convention(EntityKind::Constituent, "lastName", "city"));
    }

    #[test]
    fn gift_reference_and_key_do_not_collide() {
        assert!(matches_known_convention(EntityKind::Gift, "constituentExternalId", "constituent_id"));
        assert!(!matches_known_convention(EntityKind::Gift, "externalId", "constituent_id"));
        assert!(matches_known_convention(EntityKind::Gift, "externalId", "gift_id"));
        assert!(matches_known_convention(EntityKind::Gift, "amount", "gift_amount"));
    }

    #[test]
    fn contact_conventions_resolve() {
        assert!(matches_known_convention(EntityKind::Contact, "contactDate", "activity_date"));
        assert!(matches_known_convention(EntityKind::Contact, "notes", "comments"));
        assert!(matches_known_convention(EntityKind::Contact, "outcome", "disposition"));
    }
}
