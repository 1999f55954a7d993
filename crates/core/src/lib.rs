//! Core domain types for the call assistant
//!
//! Shared by every other crate:
//! - Staff and shift records as read from the roster site
//! - Closed calendar-date intervals
//! - Phone number normalization

pub mod interval;
pub mod phone;
pub mod shift;
pub mod staff;

pub use interval::{parse_site_date, format_site_date, DateInterval, InvalidInterval};
pub use phone::{normalize_phone, phones_match};
pub use shift::{ShiftId, ShiftRecord};
pub use staff::{strip_title, StaffRecord};
