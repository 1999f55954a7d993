//! Staff identity records returned by the roster staff search.

use serde::{Deserialize, Serialize};

/// Identity payload for one staff member, as read from the staff grid.
///
/// Owned exclusively by the session that looked it up; never shared
/// across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRecord {
    pub id: String,
    /// Full name with any title prefix removed.
    pub full_name: String,
    pub email: String,
    pub team: String,
    pub mobile: String,
}

/// Titles the roster site prefixes onto staff names.
const TITLES: &[&str] = &[
    "Ms.", "Ms", "Mr.", "Mr", "Mrs.", "Mrs", "Miss.", "Miss", "Mx.", "Mx",
    "Dr.", "Dr", "Prof.", "Prof", "Sir", "Dame", "Rev.", "Rev", "Fr.", "Fr",
];

/// Remove a leading title from a raw staff name.
///
/// `"Ms Alannah Courtnay"` becomes `"Alannah Courtnay"`; names without a
/// recognized title pass through unchanged.
pub fn strip_title(full_name: &str) -> String {
    let trimmed = full_name.trim();
    let mut parts = trimmed.split_whitespace();
    match parts.next() {
        Some(first) if TITLES.contains(&first) => parts.collect::<Vec<_>>().join(" "),
        _ => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_common_titles() {
        assert_eq!(strip_title("Ms Alannah Courtnay"), "Alannah Courtnay");
        assert_eq!(strip_title("Mr John Smith"), "John Smith");
        assert_eq!(strip_title("Mrs Jane Doe"), "Jane Doe");
        assert_eq!(strip_title("Dr Jane Doe"), "Jane Doe");
        assert_eq!(strip_title("Prof Robert Johnson"), "Robert Johnson");
    }

    #[test]
    fn test_strip_dotted_titles() {
        assert_eq!(strip_title("Prof. Robert Johnson"), "Robert Johnson");
        assert_eq!(strip_title("Ms. Adaelia Thomas"), "Adaelia Thomas");
    }

    #[test]
    fn test_no_title_passthrough() {
        assert_eq!(strip_title("Alannah Courtnay"), "Alannah Courtnay");
        assert_eq!(strip_title("  Alannah Courtnay "), "Alannah Courtnay");
    }

    #[test]
    fn test_title_like_first_name_kept() {
        // Only exact title tokens are stripped.
        assert_eq!(strip_title("Missy Elliot"), "Missy Elliot");
        assert_eq!(strip_title("Drew Barry"), "Drew Barry");
    }
}
