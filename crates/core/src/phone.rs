//! Phone number normalization.
//!
//! Callers arrive in a mix of formats (`+61 412 345 678`, `0412345678`);
//! the staff grid stores yet another. Comparison happens on the
//! normalized form.

/// Normalize a phone number for comparison.
///
/// Removes `+`, `-` and spaces, and converts a leading `0` to the `61`
/// country prefix (Australian numbers).
pub fn normalize_phone(phone: &str) -> String {
    let stripped: String = phone
        .chars()
        .filter(|c| !matches!(c, '+' | '-' | ' '))
        .collect();

    if let Some(rest) = stripped.strip_prefix('0') {
        format!("61{rest}")
    } else {
        stripped
    }
}

/// Check whether two phone numbers refer to the same line.
pub fn phones_match(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && normalize_phone(a) == normalize_phone(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_variants() {
        assert_eq!(normalize_phone("+61 412 345 678"), "61412345678");
        assert_eq!(normalize_phone("0412 345 678"), "61412345678");
        assert_eq!(normalize_phone("+61412345678"), "61412345678");
        assert_eq!(normalize_phone("0412-345-678"), "61412345678");
    }

    #[test]
    fn test_phones_match() {
        assert!(phones_match("0431256441", "+61 431 256 441"));
        assert!(!phones_match("0431256441", "0431256442"));
        assert!(!phones_match("", "0431256441"));
    }
}
