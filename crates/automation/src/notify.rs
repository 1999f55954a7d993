//! Cancellation notification email body.
//!
//! The rostering team parses this layout; indentation and blank lines
//! are part of the contract.

use call_assistant_core::{ShiftRecord, StaffRecord};

/// Render the plaintext notification body.
///
/// The `REASON:` block is omitted entirely when no reason is supplied
/// (a view-only workflow never has one).
pub fn format_cancellation_email(
    staff: &StaffRecord,
    shifts: &[ShiftRecord],
    reason: Option<&str>,
) -> String {
    let mut body = String::from("Requested cancellation of shift.\n\n");

    body.push_str(&format!(
        "    STAFF:\n        · Name: {}\n        · ID: {}\n        · Email: {}\n\n",
        staff.full_name, staff.id, staff.email
    ));

    body.push_str("    SHIFT(S):\n");
    for shift in shifts {
        body.push_str(&format!(
            "        · {} at {} {}\n",
            shift.client_name,
            shift.time,
            shift.date_display()
        ));
    }

    if let Some(reason) = reason {
        body.push_str(&format!("\n    REASON:\n        {reason}\n"));
    }

    body.push_str("\nThis is an auto-generated email. Please do not reply.");
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn staff() -> StaffRecord {
        StaffRecord {
            id: "1728".into(),
            full_name: "Adaelia Thomas".into(),
            email: "adaeliathomas@gmail.com".into(),
            team: "VIC Team".into(),
            mobile: "0490024573".into(),
        }
    }

    fn shift() -> ShiftRecord {
        ShiftRecord {
            shift_id: "207414".into(),
            client_name: "Zak James".into(),
            date: NaiveDate::from_ymd_opt(2025, 12, 18),
            time: "02:00 PM".into(),
            shift_type: "Shift".into(),
        }
    }

    #[test]
    fn test_layout_with_reason() {
        let body = format_cancellation_email(&staff(), &[shift()], Some("She is sick."));

        let expected = "Requested cancellation of shift.\n\
            \n\
            \x20   STAFF:\n\
            \x20       · Name: Adaelia Thomas\n\
            \x20       · ID: 1728\n\
            \x20       · Email: adaeliathomas@gmail.com\n\
            \n\
            \x20   SHIFT(S):\n\
            \x20       · Zak James at 02:00 PM 18-12-2025\n\
            \n\
            \x20   REASON:\n\
            \x20       She is sick.\n\
            \n\
            This is an auto-generated email. Please do not reply.";
        assert_eq!(body, expected);
    }

    #[test]
    fn test_reason_block_omitted_without_reason() {
        let body = format_cancellation_email(&staff(), &[shift()], None);

        assert!(!body.contains("REASON:"));
        assert!(body.contains("    SHIFT(S):\n        · Zak James at 02:00 PM 18-12-2025\n\nThis is an auto-generated email."));
    }

    #[test]
    fn test_multiple_shifts_listed() {
        let second = ShiftRecord {
            shift_id: "207415".into(),
            client_name: "Anthea Bassi".into(),
            date: None,
            time: "09:00 AM".into(),
            shift_type: "Shift".into(),
        };
        let body = format_cancellation_email(&staff(), &[shift(), second], Some("Family emergency"));

        assert!(body.contains("        · Zak James at 02:00 PM 18-12-2025\n"));
        assert!(body.contains("        · Anthea Bassi at 09:00 AM unknown\n"));
    }
}
