//! Per-session working memory for the action-tag handlers.

use call_assistant_core::{ShiftRecord, StaffRecord};

/// Cleared on session start, on every successful cancellation, and on
/// any handler failure that resets the conversation.
#[derive(Debug, Default)]
pub struct ConversationContext {
    /// Shifts returned by the most recent lookup.
    pub current_shifts: Vec<ShiftRecord>,
    /// Target of a pending cancellation.
    pub selected_shift: Option<ShiftRecord>,
    /// Populated after a successful staff lookup.
    pub staff_info: Option<StaffRecord>,
    /// Cancel vs. view, from the date reasoner's classification.
    pub is_cancellation: bool,
}

impl ConversationContext {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Find a loaded shift by id; with exactly one shift loaded, an
    /// unrecognized id still resolves to it (the model mangles ids on
    /// the single-shift path).
    pub fn find_shift(&self, shift_id: &str) -> Option<&ShiftRecord> {
        self.current_shifts
            .iter()
            .find(|s| s.shift_id == shift_id)
            .or_else(|| match self.current_shifts.as_slice() {
                [only] => Some(only),
                _ => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(id: &str) -> ShiftRecord {
        ShiftRecord {
            shift_id: id.to_string(),
            client_name: "ABC".into(),
            date: None,
            time: "02:00 PM".into(),
            shift_type: "Shift".into(),
        }
    }

    #[test]
    fn test_find_shift_by_id() {
        let mut context = ConversationContext::default();
        context.current_shifts = vec![shift("1"), shift("2")];

        assert_eq!(context.find_shift("2").unwrap().shift_id, "2");
        assert!(context.find_shift("3").is_none());
    }

    #[test]
    fn test_single_shift_fallback() {
        let mut context = ConversationContext::default();
        context.current_shifts = vec![shift("1")];

        assert_eq!(context.find_shift("garbled").unwrap().shift_id, "1");
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut context = ConversationContext::default();
        context.current_shifts = vec![shift("1")];
        context.selected_shift = Some(shift("1"));
        context.is_cancellation = true;

        context.reset();
        assert!(context.current_shifts.is_empty());
        assert!(context.selected_shift.is_none());
        assert!(!context.is_cancellation);
    }
}
