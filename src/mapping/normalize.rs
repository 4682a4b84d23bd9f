//! Column-name normalization.
//!
//! Source headers arrive in every convention imaginable: `KEYID`,
//! `First Name`, `constituent_id`, `estimatedCapacity`. Everything is
//! compared in a normalized space so the scoring logic never sees the
//! original casing or punctuation.

/// Lowercase a name, collapsing punctuation runs and camelCase humps into
/// single underscores: `"Constituent ID"` → `"constituent_id"`,
/// `"estimatedCapacity"` → `"estimated_capacity"`, `"KEYID"` → `"keyid"`.
pub fn normalize_words(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    let mut pending_sep = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if c.is_uppercase() && prev_lower {
                pending_sep = true;
            }
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(c.to_lowercase());
            prev_lower = c.is_lowercase() || c.is_numeric();
        } else {
            pending_sep = true;
            prev_lower = false;
        }
    }

    out
}

/// Bare comparison key: the normalized form with separators removed.
/// `"First Name"`, `"first_name"` and `"firstName"` all collapse to
/// `"firstname"`.
pub fn normalize_key(name: &str) -> String {
    normalize_words(name).replace('_', "")
}

/// Word tokens of a name in normalized form.
pub fn tokens(name: &str) -> Vec<String> {
    normalize_words(name)
        .split('_')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conventions_collapse_to_one_key() {
        for name in ["First Name", "first_name", "firstName", "FIRST-NAME", "First  Name "] {
            assert_eq!(normalize_key(name), "firstname", "input: {name:?}");
        }
    }

    #[test]
    fn camel_case_humps_become_word_boundaries() {
        assert_eq!(normalize_words("estimatedCapacity"), "estimated_capacity");
        assert_eq!(normalize_words("addressLine1"), "address_line1");
        assert_eq!(normalize_words("KEYID"), "keyid");
        assert_eq!(normalize_words("Constituent ID"), "constituent_id");
    }

    #[test]
    fn tokens_split_on_boundaries() {
        assert_eq!(tokens("externalId"), vec!["external", "id"]);
        assert_eq!(tokens("gift_date"), vec!["gift", "date"]);
        assert_eq!(tokens("  "), Vec::<String>::new());
    }
}
