//! Canonical schema definitions.
//!
//! Every source column mapping ultimately targets one of the fixed canonical
//! fields defined here. The per-kind field sets are partitioned into required
//! and optional; a handful of optional fields are additionally marked
//! recommended, which only affects mapping-validation warnings.
//!
//! The tables are immutable static data and are shared freely across
//! concurrent tenant imports.

use crate::models::EntityKind;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Value type of a canonical field, used for row validation and for
/// type-aware change detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Text,
    Number,
    Date,
    Boolean,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub value_type: ValueType,
    pub required: bool,
    pub recommended: bool,
}

impl FieldSpec {
    const fn required(name: &'static str, value_type: ValueType) -> Self {
        Self {
            name,
            value_type,
            required: true,
            recommended: false,
        }
    }

    const fn recommended(name: &'static str, value_type: ValueType) -> Self {
        Self {
            name,
            value_type,
            required: false,
            recommended: true,
        }
    }

    const fn optional(name: &'static str, value_type: ValueType) -> Self {
        Self {
            name,
            value_type,
            required: false,
            recommended: false,
        }
    }
}

pub const CONSTITUENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("externalId", ValueType::Text),
    FieldSpec::required("lastName", ValueType::Text),
    FieldSpec::recommended("firstName", ValueType::Text),
    FieldSpec::recommended("email", ValueType::Text),
    FieldSpec::optional("middleName", ValueType::Text),
    FieldSpec::optional("prefix", ValueType::Text),
    FieldSpec::optional("suffix", ValueType::Text),
    FieldSpec::optional("phone", ValueType::Text),
    FieldSpec::optional("addressLine1", ValueType::Text),
    FieldSpec::optional("addressLine2", ValueType::Text),
    FieldSpec::optional("city", ValueType::Text),
    FieldSpec::optional("state", ValueType::Text),
    FieldSpec::optional("postalCode", ValueType::Text),
    FieldSpec::optional("country", ValueType::Text),
    FieldSpec::optional("constituentType", ValueType::Text),
    FieldSpec::optional("classYear", ValueType::Number),
    FieldSpec::optional("schoolCollege", ValueType::Text),
    FieldSpec::optional("estimatedCapacity", ValueType::Number),
    FieldSpec::optional("capacitySource", ValueType::Text),
    FieldSpec::optional("assignedOfficerId", ValueType::Text),
    FieldSpec::optional("portfolioTier", ValueType::Text),
];

pub const GIFT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("constituentExternalId", ValueType::Text),
    FieldSpec::required("amount", ValueType::Number),
    FieldSpec::required("giftDate", ValueType::Date),
    FieldSpec::recommended("externalId", ValueType::Text),
    FieldSpec::optional("giftType", ValueType::Text),
    FieldSpec::optional("fundName", ValueType::Text),
    FieldSpec::optional("fundCode", ValueType::Text),
    FieldSpec::optional("campaign", ValueType::Text),
    FieldSpec::optional("appeal", ValueType::Text),
    FieldSpec::optional("recognitionAmount", ValueType::Number),
    FieldSpec::optional("isAnonymous", ValueType::Boolean),
    FieldSpec::optional("isMatching", ValueType::Boolean),
    FieldSpec::optional("matchingCompany", ValueType::Text),
    FieldSpec::optional("tributeType", ValueType::Text),
    FieldSpec::optional("tributeName", ValueType::Text),
];

pub const CONTACT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("constituentExternalId", ValueType::Text),
    FieldSpec::required("contactDate", ValueType::Date),
    FieldSpec::required("contactType", ValueType::Text),
    FieldSpec::recommended("externalId", ValueType::Text),
    FieldSpec::optional("subject", ValueType::Text),
    FieldSpec::optional("notes", ValueType::Text),
    FieldSpec::optional("outcome", ValueType::Text),
    FieldSpec::optional("nextAction", ValueType::Text),
    FieldSpec::optional("nextActionDate", ValueType::Date),
];

/// Canonical field set for one entity kind.
pub fn fields(kind: EntityKind) -> &'static [FieldSpec] {
    match kind {
        EntityKind::Constituent => CONSTITUENT_FIELDS,
        EntityKind::Gift => GIFT_FIELDS,
        EntityKind::Contact => CONTACT_FIELDS,
    }
}

pub fn field_spec(kind: EntityKind, name: &str) -> Option<&'static FieldSpec> {
    fields(kind).iter().find(|f| f.name == name)
}

/// Value type of a canonical field, defaulting to text for unknown names.
pub fn field_type(kind: EntityKind, name: &str) -> ValueType {
    field_spec(kind, name)
        .map(|f| f.value_type)
        .unwrap_or(ValueType::Text)
}

pub fn required_fields(kind: EntityKind) -> Vec<&'static str> {
    fields(kind)
        .iter()
        .filter(|f| f.required)
        .map(|f| f.name)
        .collect()
}

pub fn optional_fields(kind: EntityKind) -> Vec<&'static str> {
    fields(kind)
        .iter()
        .filter(|f| !f.required)
        .map(|f| f.name)
        .collect()
}

/// Permissive date parsing: ISO and the common US export formats, with
/// bare dates interpreted as midnight UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Utc
                .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
                .single();
        }
    }
    dateparser::parse(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

/// Permissive numeric parsing: tolerates a leading currency symbol and
/// thousands separators, both routine in real-world CRM exports.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().trim_start_matches('$').replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Whether a raw value is acceptable for the given type. Empty values are
/// acceptable everywhere; required-ness is checked separately.
pub fn value_matches(value_type: ValueType, raw: &str) -> bool {
    if raw.trim().is_empty() {
        return true;
    }
    match value_type {
        ValueType::Text => true,
        ValueType::Number => parse_number(raw).is_some(),
        ValueType::Date => parse_date(raw).is_some(),
        ValueType::Boolean => parse_bool(raw).is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_and_optional_partition_the_field_set() {
        for kind in [EntityKind::Constituent, EntityKind::Gift, EntityKind::Contact] {
            let required = required_fields(kind);
            let optional = optional_fields(kind);
            assert_eq!(required.len() + optional.len(), fields(kind).len());
            assert!(required.iter().all(|f| !optional.contains(f)));
        }
    }

    #[test]
    fn constituent_requires_external_id_and_last_name() {
        let required = required_fields(EntityKind::Constituent);
        assert_eq!(required, vec!["externalId", "lastName"]);
    }

    #[test]
    fn parse_date_accepts_common_formats() {
        let iso = parse_date("2024-03-15").unwrap();
        let us = parse_date("03/15/2024").unwrap();
        assert_eq!(iso, us);
        assert!(parse_date("not a date").is_none());
    }

    #[test]
    fn parse_number_tolerates_currency_formatting() {
        assert_eq!(parse_number("$1,250.50"), Some(1250.50));
        assert_eq!(parse_number(" 42 "), Some(42.0));
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn value_matches_checks_typed_values() {
        assert!(value_matches(ValueType::Date, "2024-01-01"));
        assert!(!value_matches(ValueType::Date, "soon"));
        assert!(value_matches(ValueType::Number, ""));
        assert!(value_matches(ValueType::Boolean, "Yes"));
        assert!(!value_matches(ValueType::Boolean, "maybe"));
    }
}
