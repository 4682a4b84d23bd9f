//! Formal-name ↔ nickname equivalences.
//!
//! Static, bidirectional lookup table. Read-only, so it is shared freely
//! across concurrent tenant imports.

use std::collections::HashMap;
use std::sync::LazyLock;

const NICKNAME_PAIRS: &[(&str, &str)] = &[
    ("abigail", "abby"),
    ("albert", "al"),
    ("alexander", "alex"),
    ("alfred", "al"),
    ("amanda", "mandy"),
    ("andrew", "andy"),
    ("andrew", "drew"),
    ("angela", "angie"),
    ("anthony", "tony"),
    ("arthur", "art"),
    ("barbara", "barb"),
    ("benjamin", "ben"),
    ("beverly", "bev"),
    ("carolyn", "carrie"),
    ("catherine", "cathy"),
    ("catherine", "kate"),
    ("charles", "charlie"),
    ("charles", "chuck"),
    ("christine", "chris"),
    ("christopher", "chris"),
    ("cynthia", "cindy"),
    ("daniel", "dan"),
    ("daniel", "danny"),
    ("deborah", "deb"),
    ("deborah", "debbie"),
    ("donald", "don"),
    ("dorothy", "dot"),
    ("edward", "ed"),
    ("edward", "eddie"),
    ("edward", "ted"),
    ("eleanor", "ellie"),
    ("elizabeth", "beth"),
    ("elizabeth", "betty"),
    ("elizabeth", "liz"),
    ("eugene", "gene"),
    ("frances", "fran"),
    ("francis", "frank"),
    ("frederick", "fred"),
    ("gerald", "jerry"),
    ("gregory", "greg"),
    ("harold", "harry"),
    ("henry", "hank"),
    ("henry", "harry"),
    ("isabella", "bella"),
    ("jacob", "jake"),
    ("jacqueline", "jackie"),
    ("james", "jamie"),
    ("james", "jim"),
    ("james", "jimmy"),
    ("jennifer", "jen"),
    ("jennifer", "jenny"),
    ("jessica", "jess"),
    ("john", "jack"),
    ("john", "johnny"),
    ("jonathan", "jon"),
    ("joseph", "joe"),
    ("joseph", "joey"),
    ("joshua", "josh"),
    ("judith", "judy"),
    ("katherine", "kate"),
    ("katherine", "kathy"),
    ("katherine", "katie"),
    ("kenneth", "ken"),
    ("kimberly", "kim"),
    ("lawrence", "larry"),
    ("leonard", "leo"),
    ("louis", "lou"),
    ("margaret", "maggie"),
    ("margaret", "meg"),
    ("margaret", "peggy"),
    ("matthew", "matt"),
    ("melissa", "mel"),
    ("michael", "mike"),
    ("nancy", "nan"),
    ("nathan", "nate"),
    ("nathaniel", "nate"),
    ("nicholas", "nick"),
    ("pamela", "pam"),
    ("patricia", "pat"),
    ("patricia", "patty"),
    ("patricia", "trish"),
    ("patrick", "pat"),
    ("peter", "pete"),
    ("philip", "phil"),
    ("phillip", "phil"),
    ("randall", "randy"),
    ("raymond", "ray"),
    ("rebecca", "becky"),
    ("richard", "dick"),
    ("richard", "rich"),
    ("richard", "rick"),
    ("robert", "bob"),
    ("robert", "bobby"),
    ("robert", "rob"),
    ("ronald", "ron"),
    ("russell", "russ"),
    ("samantha", "sam"),
    ("samuel", "sam"),
    ("sandra", "sandy"),
    ("stephanie", "steph"),
    ("stephen", "steve"),
    ("steven", "steve"),
    ("susan", "sue"),
    ("theodore", "ted"),
    ("thomas", "tom"),
    ("thomas", "tommy"),
    ("timothy", "tim"),
    ("victoria", "vicky"),
    ("vincent", "vince"),
    ("virginia", "ginny"),
    ("walter", "walt"),
    ("william", "bill"),
    ("william", "billy"),
    ("william", "will"),
    ("zachary", "zach"),
];

static NICKNAME_INDEX: LazyLock<HashMap<&'static str, Vec<&'static str>>> = LazyLock::new(|| {
    let mut index: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
    for &(formal, nick) in NICKNAME_PAIRS {
        index.entry(formal).or_default().push(nick);
        index.entry(nick).or_default().push(formal);
    }
    index
});

/// Whether two first names are a known formal/nickname pair, in either
/// direction. Case-insensitive.
pub fn is_nickname_pair(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || a == b {
        return false;
    }
    NICKNAME_INDEX
        .get(a.as_str())
        .is_some_and(|equivalents| equivalents.contains(&b.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_bidirectional_and_case_insensitive() {
        assert!(is_nickname_pair("Robert", "Bob"));
        assert!(is_nickname_pair("bob", "ROBERT"));
        assert!(is_nickname_pair("Margaret", "Peggy"));
        assert!(!is_nickname_pair("Robert", "Carol"));
        assert!(!is_nickname_pair("Robert", "Robert"));
        assert!(!is_nickname_pair("", "Bob"));
    }
}
