//! Phone number canonicalization for the Salvadoran numbering plan.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Rewrites `+503` + 8 digits (optional whitespace in between) into the
    /// canonical `+503 XXXX-XXXX` form.
    static ref PHONE_CANON_REGEX: Regex = Regex::new(r"(\+503)\s?(\d{4})(\d{4})").unwrap();

    /// Accepted submission shapes: 8 digits, with or without the country
    /// prefix, with or without the middle dash.
    static ref PHONE_SHAPE_REGEX: Regex = Regex::new(r"^(\+503\s?)?\d{4}-?\d{4}$").unwrap();
}

/// Canonicalize a raw phone string to `+503 XXXX-XXXX`.
///
/// The country prefix is prepended when missing. Inputs whose digits don't
/// match the 8-digit national shape pass through with only the prefix change;
/// format enforcement belongs to the validation rule, not here.
pub fn normalize(raw: &str) -> String {
    let prefixed = if raw.starts_with("+503") {
        raw.to_string()
    } else {
        format!("+503 {}", raw)
    };
    PHONE_CANON_REGEX.replace(&prefixed, "$1 $2-$3").into_owned()
}

/// Shape check used by the `Phone` validation rule.
pub fn is_valid_shape(raw: &str) -> bool {
    PHONE_SHAPE_REGEX.is_match(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bare_digits() {
        assert_eq!(normalize("71234567"), "+503 7123-4567");
    }

    #[test]
    fn test_normalize_prefixed_digits() {
        assert_eq!(normalize("+50371234567"), "+503 7123-4567");
        assert_eq!(normalize("+503 71234567"), "+503 7123-4567");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let canonical = normalize("71234567");
        assert_eq!(normalize(&canonical), canonical);
    }

    #[test]
    fn test_normalize_passes_through_non_matching_input() {
        // Too few digits: only the prefix is added, nothing else changes.
        assert_eq!(normalize("123"), "+503 123");
        // Already dashed input has no 8-digit run to rewrite.
        assert_eq!(normalize("7123-4567"), "+503 7123-4567");
    }

    #[test]
    fn test_shape_accepts_national_forms() {
        assert!(is_valid_shape("71234567"));
        assert!(is_valid_shape("7123-4567"));
        assert!(is_valid_shape("+50371234567"));
        assert!(is_valid_shape("+503 7123-4567"));
    }

    #[test]
    fn test_shape_rejects_other_forms() {
        assert!(!is_valid_shape(""));
        assert!(!is_valid_shape("123"));
        assert!(!is_valid_shape("712345678"));
        assert!(!is_valid_shape("+1 555 01234"));
    }
}
