use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use super::{Row, StoreError};
use crate::models::{
    Badge, BadgeType, CheckIn, HistoryEntry, Ticket, TicketStatus, ValidDay, EVENT_DAYS,
};

pub const TICKET_COLUMNS: u32 = 7;
pub const TICKET_HEADER: [&str; 7] = [
    "ID",
    "Status",
    "CreatedAt",
    "RedeemedAt",
    "ResetAt",
    "History",
    "ValidDay",
];

/// Columns A-D are the original badge layout; E-H were added later.
pub const BADGE_COLUMNS: u32 = 8;
pub const BADGE_HEADER: [&str; 8] = [
    "BadgeID",
    "Name",
    "Department",
    "CheckInHistory",
    "Type",
    "Days",
    "Email",
    "Companion",
];

pub fn header_row(header: &[&str]) -> Row {
    header.iter().map(|h| h.to_string()).collect()
}

/// A row with no id in column A carries no record.
pub fn is_blank(row: &[String]) -> bool {
    row.first().map_or(true, |id| id.trim().is_empty())
}

/// Data rows with their one-based sheet row numbers, skipping the header row
/// and blank rows.
pub fn records<'a>(
    rows: &'a [Row],
    header: &'a [&str],
) -> impl Iterator<Item = (u32, &'a Row)> + 'a {
    rows.iter()
        .enumerate()
        .filter(move |(idx, row)| !(*idx == 0 && is_header(row, header)))
        .filter(|(_, row)| !is_blank(row))
        .map(|(idx, row)| (idx as u32 + 1, row))
}

pub fn is_header(row: &[String], header: &[&str]) -> bool {
    row.first().map(|c| c.trim()) == header.first().copied()
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

fn optional_cell(row: &[String], idx: usize) -> Option<String> {
    let value = cell(row, idx);
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_timestamp(value: &str, row: u32, column: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Malformed {
            row,
            reason: format!("{column} '{value}': {e}"),
        })
}

fn parse_optional_timestamp(
    value: &str,
    row: u32,
    column: &str,
) -> Result<Option<DateTime<Utc>>, StoreError> {
    if value.is_empty() {
        Ok(None)
    } else {
        parse_timestamp(value, row, column).map(Some)
    }
}

fn parse_json<T: for<'de> Deserialize<'de> + Default>(
    value: &str,
    row: u32,
    column: &str,
) -> Result<T, StoreError> {
    if value.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(value).map_err(|e| StoreError::Malformed {
        row,
        reason: format!("{column}: {e}"),
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}

pub fn ticket_to_row(ticket: &Ticket) -> Row {
    vec![
        ticket.id.clone(),
        ticket.status.as_str().to_string(),
        format_timestamp(&ticket.created_at),
        ticket.redeemed_at.as_ref().map(format_timestamp).unwrap_or_default(),
        ticket.reset_at.as_ref().map(format_timestamp).unwrap_or_default(),
        to_json(&ticket.history),
        ticket.valid_day.as_str().to_string(),
    ]
}

/// Decodes a ticket row; `row_number` is the one-based sheet row used in errors.
pub fn ticket_from_row(row: &[String], row_number: u32) -> Result<Ticket, StoreError> {
    let malformed = |reason: String| StoreError::Malformed {
        row: row_number,
        reason,
    };

    let status = match cell(row, 1) {
        "" => TicketStatus::Unredeemed,
        s => s.parse().map_err(malformed)?,
    };
    let valid_day = match cell(row, 6) {
        "" => ValidDay::Day1,
        s => s.parse().map_err(malformed)?,
    };
    let history: Vec<HistoryEntry> = parse_json(cell(row, 5), row_number, "History")?;

    Ok(Ticket {
        id: cell(row, 0).to_string(),
        status,
        created_at: parse_timestamp(cell(row, 2), row_number, "CreatedAt")?,
        redeemed_at: parse_optional_timestamp(cell(row, 3), row_number, "RedeemedAt")?,
        reset_at: parse_optional_timestamp(cell(row, 4), row_number, "ResetAt")?,
        valid_day,
        history,
    })
}

/// Pads a legacy ticket row out to the full width, defaulting the valid day.
pub fn migrate_ticket_row(mut row: Row) -> Row {
    row.resize(TICKET_COLUMNS as usize, String::new());
    if row[6].trim().is_empty() {
        row[6] = ValidDay::Day1.as_str().to_string();
    }
    row
}

/// Fills in type and days on badge rows written before those columns existed.
/// Email and companion stay empty.
pub fn migrate_badge_row(mut row: Row) -> Row {
    if row.len() < 6 {
        row.resize(6, String::new());
    }
    if row[4].trim().is_empty() {
        row[4] = BadgeType::Badge.as_str().to_string();
    }
    if row[5].trim().is_empty() {
        row[5] = to_json(&EVENT_DAYS);
    }
    row
}

/// Check-ins were once stored as bare timestamps.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCheckIn {
    Full(CheckIn),
    Bare(DateTime<Utc>),
}

impl From<StoredCheckIn> for CheckIn {
    fn from(stored: StoredCheckIn) -> Self {
        match stored {
            StoredCheckIn::Full(check_in) => check_in,
            StoredCheckIn::Bare(timestamp) => CheckIn {
                timestamp,
                day: None,
            },
        }
    }
}

pub fn badge_to_row(badge: &Badge) -> Row {
    vec![
        badge.badge_id.clone(),
        badge.name.clone(),
        badge.department.clone(),
        to_json(&badge.check_in_history),
        badge.badge_type.as_str().to_string(),
        to_json(&badge.days),
        badge.email.clone().unwrap_or_default(),
        badge.companion.clone().unwrap_or_default(),
    ]
}

pub fn badge_from_row(row: &[String], row_number: u32) -> Result<Badge, StoreError> {
    let malformed = |reason: String| StoreError::Malformed {
        row: row_number,
        reason,
    };

    let history: Vec<StoredCheckIn> = parse_json(cell(row, 3), row_number, "CheckInHistory")?;
    let badge_type = match cell(row, 4) {
        "" => BadgeType::Badge,
        s => s.parse().map_err(malformed)?,
    };
    let mut days: Vec<u8> = parse_json(cell(row, 5), row_number, "Days")?;
    if days.is_empty() {
        days = EVENT_DAYS.to_vec();
    }

    Ok(Badge {
        badge_id: cell(row, 0).to_string(),
        name: cell(row, 1).to_string(),
        department: cell(row, 2).to_string(),
        email: optional_cell(row, 6),
        badge_type,
        days,
        companion: optional_cell(row, 7),
        check_in_history: history.into_iter().map(CheckIn::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TicketAction;
    use chrono::TimeZone;

    fn strings(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_ticket_row_layout() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let mut ticket = Ticket::new("TKT-00000001", ValidDay::Day3, now);
        ticket.apply(TicketAction::Redeem, now);
        let row = ticket_to_row(&ticket);

        assert_eq!(row.len(), TICKET_COLUMNS as usize);
        assert_eq!(row[1], "redeemed");
        assert_eq!(row[2], "2025-03-01T09:00:00.000Z");
        assert_eq!(row[4], "");
        assert_eq!(row[6], "day3");
        assert_eq!(ticket_from_row(&row, 2).unwrap(), ticket);
    }

    #[test]
    fn test_legacy_ticket_row_defaults_to_day1() {
        let row = strings(&["TKT-LEGACY01", "unredeemed", "2024-05-01T10:00:00.000Z"]);
        let migrated = migrate_ticket_row(row);
        assert_eq!(migrated.len(), 7);
        assert_eq!(migrated[6], "day1");

        let ticket = ticket_from_row(&migrated, 3).unwrap();
        assert_eq!(ticket.valid_day, ValidDay::Day1);
        assert_eq!(ticket.status, TicketStatus::Unredeemed);
        assert!(ticket.history.is_empty());
    }

    #[test]
    fn test_bad_timestamp_reports_row() {
        let row = strings(&["TKT-BROKEN01", "redeemed", "yesterday"]);
        match ticket_from_row(&row, 7) {
            Err(StoreError::Malformed { row, .. }) => assert_eq!(row, 7),
            other => panic!("expected malformed row error, got {other:?}"),
        }
    }

    #[test]
    fn test_legacy_badge_row() {
        let row = strings(&[
            "BDG-123456",
            "Grace",
            "Security",
            r#"["2024-05-01T10:00:00.000Z"]"#,
        ]);
        let badge = badge_from_row(&row, 2).unwrap();

        assert_eq!(badge.badge_type, BadgeType::Badge);
        assert_eq!(badge.days, vec![1, 2, 3, 4]);
        assert_eq!(badge.email, None);
        assert_eq!(badge.check_in_history.len(), 1);
        assert_eq!(badge.check_in_history[0].day, None);
    }

    #[test]
    fn test_badge_row_round_trip_keeps_optional_fields() {
        let badge = Badge {
            badge_id: "BDG-654321".to_string(),
            name: "Lin".to_string(),
            department: "Catering".to_string(),
            email: Some("lin@example.com".to_string()),
            badge_type: BadgeType::MultidayBadge,
            days: vec![2, 3],
            companion: Some("Sam".to_string()),
            check_in_history: vec![CheckIn {
                timestamp: Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap(),
                day: Some(2),
            }],
        };
        let row = badge_to_row(&badge);
        assert_eq!(row[5], "[2,3]");
        assert_eq!(badge_from_row(&row, 4).unwrap(), badge);
    }
}
