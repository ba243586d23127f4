use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Unredeemed,
    Redeemed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Unredeemed => "unredeemed",
            TicketStatus::Redeemed => "redeemed",
        }
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unredeemed" => Ok(TicketStatus::Unredeemed),
            "redeemed" => Ok(TicketStatus::Redeemed),
            other => Err(format!("unknown ticket status '{other}'")),
        }
    }
}

/// Event day a ticket admits on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidDay {
    #[default]
    Day1,
    Day2,
    Day3,
    Day4,
}

impl ValidDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidDay::Day1 => "day1",
            ValidDay::Day2 => "day2",
            ValidDay::Day3 => "day3",
            ValidDay::Day4 => "day4",
        }
    }
}

impl FromStr for ValidDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day1" => Ok(ValidDay::Day1),
            "day2" => Ok(ValidDay::Day2),
            "day3" => Ok(ValidDay::Day3),
            "day4" => Ok(ValidDay::Day4),
            other => Err(format!("unknown valid day '{other}', expected day1..day4")),
        }
    }
}

impl fmt::Display for ValidDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested mutation on a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketAction {
    Redeem,
    Reset,
    View,
}

/// Audit log entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Created,
    Redeemed,
    Reset,
    Viewed,
}

impl From<TicketAction> for HistoryAction {
    fn from(action: TicketAction) -> Self {
        match action {
            TicketAction::Redeem => HistoryAction::Redeemed,
            TicketAction::Reset => HistoryAction::Reset,
            TicketAction::View => HistoryAction::Viewed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: HistoryAction,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub reset_at: Option<DateTime<Utc>>,
    pub valid_day: ValidDay,
    pub history: Vec<HistoryEntry>,
}

impl Ticket {
    pub fn new(id: impl Into<String>, valid_day: ValidDay, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            status: TicketStatus::Unredeemed,
            created_at: now,
            redeemed_at: None,
            reset_at: None,
            valid_day,
            history: vec![HistoryEntry {
                action: HistoryAction::Created,
                timestamp: now,
            }],
        }
    }

    /// Applies `action` at `now` and records it in the history.
    pub fn apply(&mut self, action: TicketAction, now: DateTime<Utc>) {
        match action {
            TicketAction::Redeem => {
                self.status = TicketStatus::Redeemed;
                self.redeemed_at = Some(now);
            }
            TicketAction::Reset => {
                self.status = TicketStatus::Unredeemed;
                self.reset_at = Some(now);
            }
            TicketAction::View => {}
        }
        self.history.push(HistoryEntry {
            action: action.into(),
            timestamp: now,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_serializes_camel_case_with_lowercase_enums() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let ticket = Ticket::new("TKT-ABCD1234", ValidDay::Day2, now);
        let json = serde_json::to_value(&ticket).unwrap();

        assert_eq!(json["status"], "unredeemed");
        assert_eq!(json["validDay"], "day2");
        assert_eq!(json["history"][0]["action"], "created");
        assert!(json["redeemedAt"].is_null());
    }

    #[test]
    fn test_reset_keeps_redeemed_at() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 3, 1, 9, 5, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 3, 1, 9, 10, 0).unwrap();

        let mut ticket = Ticket::new("TKT-ABCD1234", ValidDay::Day1, t0);
        ticket.apply(TicketAction::Redeem, t1);
        ticket.apply(TicketAction::Reset, t2);

        assert_eq!(ticket.status, TicketStatus::Unredeemed);
        assert_eq!(ticket.redeemed_at, Some(t1));
        assert_eq!(ticket.reset_at, Some(t2));
        let actions: Vec<_> = ticket.history.iter().map(|h| h.action).collect();
        assert_eq!(
            actions,
            vec![HistoryAction::Created, HistoryAction::Redeemed, HistoryAction::Reset]
        );
    }

    #[test]
    fn test_valid_day_parsing() {
        assert_eq!("Day3".parse::<ValidDay>(), Ok(ValidDay::Day3));
        assert!("day5".parse::<ValidDay>().is_err());
    }
}
