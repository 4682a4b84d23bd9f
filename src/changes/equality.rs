//! Type-aware field equality.
//!
//! Repeated exports of unchanged data drift in representation: dates get
//! reformatted, numbers gain decimals, strings gain whitespace. Naive string
//! equality would classify all of that as change, so comparison is driven by
//! the canonical field's type.

use crate::schema::{self, ValueType};

/// Tolerance for numeric comparison.
pub const NUMERIC_EPSILON: f64 = 1e-4;

/// Compare two raw field values by canonical type.
///
/// Missing and empty values are mutually equivalent; date fields compare by
/// instant regardless of representation; numeric fields tolerate float
/// noise; strings compare case-insensitively after trimming. Values that
/// fail to parse as their declared type fall back to the string rule.
pub fn values_equal(value_type: ValueType, a: &str, b: &str) -> bool {
    let a = a.trim();
    let b = b.trim();
    if a.is_empty() || b.is_empty() {
        return a.is_empty() && b.is_empty();
    }

    match value_type {
        ValueType::Date => match (schema::parse_date(a), schema::parse_date(b)) {
            (Some(x), Some(y)) => x == y,
            _ => text_equal(a, b),
        },
        ValueType::Number => match (schema::parse_number(a), schema::parse_number(b)) {
            (Some(x), Some(y)) => (x - y).abs() <= NUMERIC_EPSILON,
            _ => text_equal(a, b),
        },
        ValueType::Boolean => match (schema::parse_bool(a), schema::parse_bool(b)) {
            (Some(x), Some(y)) => x == y,
            _ => text_equal(a, b),
        },
        ValueType::Text => text_equal(a, b),
    }
}

fn text_equal(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
