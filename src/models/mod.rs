use chrono::{DateTime, SubsecRound, Utc};

pub mod badge;
pub mod ticket;

pub use badge::{Badge, BadgeType, BadgeView, CheckIn, EVENT_DAYS};
pub use ticket::{HistoryAction, HistoryEntry, Ticket, TicketAction, TicketStatus, ValidDay};

/// Current time at millisecond precision, the resolution stored in the sheet.
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
