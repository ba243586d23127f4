use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Event days a badge can cover.
pub const EVENT_DAYS: [u8; 4] = [1, 2, 3, 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BadgeType {
    Badge,
    MultidayBadge,
}

impl BadgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeType::Badge => "Badge",
            BadgeType::MultidayBadge => "MultidayBadge",
        }
    }
}

impl FromStr for BadgeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Badge" => Ok(BadgeType::Badge),
            "MultidayBadge" => Ok(BadgeType::MultidayBadge),
            other => Err(format!(
                "invalid badge type '{other}', expected Badge or MultidayBadge"
            )),
        }
    }
}

impl fmt::Display for BadgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub badge_id: String,
    pub name: String,
    pub department: String,
    pub email: Option<String>,
    #[serde(rename = "type")]
    pub badge_type: BadgeType,
    pub days: Vec<u8>,
    pub companion: Option<String>,
    pub check_in_history: Vec<CheckIn>,
}

impl Badge {
    pub fn is_multiday(&self) -> bool {
        self.badge_type == BadgeType::MultidayBadge
    }

    pub fn covers_day(&self, day: u8) -> bool {
        self.days.contains(&day)
    }

    /// First recorded check-in for `day`, if any.
    pub fn scan_for_day(&self, day: u8) -> Option<&CheckIn> {
        self.check_in_history.iter().find(|c| c.day == Some(day))
    }

    /// Check-in timestamps grouped by day. Check-ins without a day are left out.
    pub fn scan_history(&self) -> BTreeMap<u8, Vec<DateTime<Utc>>> {
        let mut by_day: BTreeMap<u8, Vec<DateTime<Utc>>> = BTreeMap::new();
        for check_in in &self.check_in_history {
            if let Some(day) = check_in.day {
                by_day.entry(day).or_default().push(check_in.timestamp);
            }
        }
        by_day
    }
}

/// Badge as returned over the API, with the derived per-day scan history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeView {
    #[serde(flatten)]
    pub badge: Badge,
    pub scan_history: BTreeMap<u8, Vec<DateTime<Utc>>>,
}

impl From<Badge> for BadgeView {
    fn from(badge: Badge) -> Self {
        let scan_history = badge.scan_history();
        Self {
            badge,
            scan_history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn badge_with(history: Vec<CheckIn>) -> Badge {
        Badge {
            badge_id: "BDG-000042".to_string(),
            name: "Ada".to_string(),
            department: "Ops".to_string(),
            email: None,
            badge_type: BadgeType::MultidayBadge,
            days: vec![2, 3],
            companion: None,
            check_in_history: history,
        }
    }

    #[test]
    fn test_scan_history_groups_by_day() {
        let t1 = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 6, 3, 8, 0, 0).unwrap();
        let t3 = Utc.with_ymd_and_hms(2025, 6, 3, 9, 0, 0).unwrap();
        let badge = badge_with(vec![
            CheckIn { timestamp: t1, day: Some(2) },
            CheckIn { timestamp: t2, day: Some(3) },
            CheckIn { timestamp: t3, day: None },
        ]);

        let history = badge.scan_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[&2], vec![t1]);
        assert_eq!(history[&3], vec![t2]);
    }

    #[test]
    fn test_view_serializes_type_and_scan_history() {
        let t1 = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        let view = BadgeView::from(badge_with(vec![CheckIn { timestamp: t1, day: Some(2) }]));
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["badgeId"], "BDG-000042");
        assert_eq!(json["type"], "MultidayBadge");
        assert_eq!(json["days"], serde_json::json!([2, 3]));
        assert_eq!(json["scanHistory"]["2"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_badge_type_rejects_unknown() {
        assert!("VIP".parse::<BadgeType>().is_err());
        assert_eq!("MultidayBadge".parse::<BadgeType>(), Ok(BadgeType::MultidayBadge));
    }
}
