// =====================================================================================
// File: core-screening/src/matcher.rs
// Description: Name, address, and identifier similarity primitives
// Author: ClearLedger Engineering (eng@clearledger.io)
// =====================================================================================

//! Similarity primitives shared by sanctions screening and entity
//! resolution. All functions here are pure: no I/O, no state.

use std::collections::HashSet;

/// Borrowed view of the address fields that participate in matching
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressFields<'a> {
    pub country: Option<&'a str>,
    pub city: Option<&'a str>,
    pub postal_code: Option<&'a str>,
    pub street1: Option<&'a str>,
}

/// Borrowed view of the identifier fields that participate in matching
#[derive(Debug, Clone, Copy)]
pub struct IdentifierFields<'a> {
    pub kind: &'a str,
    pub value: &'a str,
    pub issuing_country: Option<&'a str>,
}

/// Lowercase a name, strip everything but letters and spaces, and tokenize
pub fn normalize_name(name: &str) -> Vec<String> {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphabetic() { c } else { ' ' })
        .collect();
    cleaned
        .split_whitespace()
        .map(|t| t.to_string())
        .collect()
}

/// Token-set similarity between two names, in [0, 1].
///
/// Exact post-normalization equality scores 1.0; disjoint token sets score
/// 0.0; otherwise the Jaccard index of the token sets. Symmetric in its
/// arguments.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let tokens_a = normalize_name(a);
    let tokens_b = normalize_name(b);

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    if tokens_a == tokens_b {
        return 1.0;
    }

    let set_a: HashSet<&str> = tokens_a.iter().map(String::as_str).collect();
    let set_b: HashSet<&str> = tokens_b.iter().map(String::as_str).collect();

    if set_a == set_b {
        return 1.0;
    }

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Mean of per-field address scores, averaging only fields present in both.
///
/// Country and postal code compare exactly, city case-insensitively, and
/// street line one through `name_similarity`. Returns 0.0 when no field is
/// present on both sides.
pub fn address_similarity(a: &AddressFields<'_>, b: &AddressFields<'_>) -> f64 {
    let mut score = 0.0;
    let mut compared = 0u32;

    if let (Some(ca), Some(cb)) = (a.country, b.country) {
        if ca == cb {
            score += 1.0;
        }
        compared += 1;
    }

    if let (Some(ca), Some(cb)) = (a.city, b.city) {
        if ca.eq_ignore_ascii_case(cb) {
            score += 1.0;
        }
        compared += 1;
    }

    if let (Some(pa), Some(pb)) = (a.postal_code, b.postal_code) {
        if pa == pb {
            score += 1.0;
        }
        compared += 1;
    }

    if let (Some(sa), Some(sb)) = (a.street1, b.street1) {
        score += name_similarity(sa, sb);
        compared += 1;
    }

    if compared == 0 {
        0.0
    } else {
        score / compared as f64
    }
}

/// Whether two identifiers denote the same document.
///
/// True iff the type, the value (case-insensitively), and the issuing
/// country all agree.
pub fn identifier_match(a: &IdentifierFields<'_>, b: &IdentifierFields<'_>) -> bool {
    a.kind == b.kind
        && a.value.eq_ignore_ascii_case(b.value)
        && a.issuing_country == b.issuing_country
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(normalize_name("J. Smith-Doe"), vec!["j", "smith", "doe"]);
        assert_eq!(normalize_name("  "), Vec::<String>::new());
        assert_eq!(normalize_name("O'Brien"), vec!["o", "brien"]);
    }

    #[test]
    fn test_exact_name_scores_one() {
        assert_eq!(name_similarity("John Smith Doe", "john smith doe"), 1.0);
        assert_eq!(name_similarity("John  Smith", "John Smith"), 1.0);
    }

    #[test]
    fn test_disjoint_names_score_zero() {
        assert_eq!(name_similarity("Alice Cooper", "Bob Dylan"), 0.0);
    }

    #[test]
    fn test_partial_overlap_is_jaccard() {
        // {john, smith} vs {john, doe}: 1 shared of 3 total
        let score = name_similarity("John Smith", "John Doe");
        assert!((score - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_name_similarity_is_symmetric() {
        let pairs = [
            ("John Smith Doe", "J. Smith"),
            ("Evil Corp Ltd", "Evil Corporation"),
            ("Ivan Petrov", "Vanya Petrov"),
        ];
        for (a, b) in pairs {
            assert_eq!(name_similarity(a, b), name_similarity(b, a));
        }
    }

    #[test]
    fn test_more_shared_tokens_scores_higher() {
        let low = name_similarity("John Smith Doe", "John Miller");
        let high = name_similarity("John Smith Doe", "John Smith Miller");
        assert!(high > low);
    }

    #[test]
    fn test_address_similarity_averages_present_fields() {
        let a = AddressFields {
            country: Some("US"),
            city: Some("New York"),
            postal_code: Some("10001"),
            street1: Some("123 Main St"),
        };
        let b = AddressFields {
            country: Some("US"),
            city: Some("new york"),
            postal_code: None,
            street1: Some("123 Main St"),
        };
        // country 1.0, city 1.0, street 1.0; postal skipped
        assert_eq!(address_similarity(&a, &b), 1.0);
    }

    #[test]
    fn test_address_similarity_no_common_fields() {
        let a = AddressFields {
            country: Some("US"),
            ..Default::default()
        };
        let b = AddressFields {
            city: Some("Boston"),
            ..Default::default()
        };
        assert_eq!(address_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_identifier_match_case_insensitive_value() {
        let a = IdentifierFields {
            kind: "passport",
            value: "AB1234",
            issuing_country: Some("US"),
        };
        let b = IdentifierFields {
            kind: "passport",
            value: "ab1234",
            issuing_country: Some("US"),
        };
        assert!(identifier_match(&a, &b));
    }

    #[test]
    fn test_identifier_match_requires_all_fields() {
        let base = IdentifierFields {
            kind: "passport",
            value: "AB1234",
            issuing_country: Some("US"),
        };
        let wrong_kind = IdentifierFields { kind: "tax_id", ..base };
        let wrong_country = IdentifierFields {
            issuing_country: Some("GB"),
            ..base
        };
        assert!(!identifier_match(&base, &wrong_kind));
        assert!(!identifier_match(&base, &wrong_country));
    }
}
