use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::{timestamp_now, Badge, BadgeType, CheckIn, EVENT_DAYS};
use crate::store::codec::{self, BADGE_COLUMNS, BADGE_HEADER};
use crate::store::{ensure_table, CellRange, Row, RowStore};
use crate::utils::error::AppError;
use crate::utils::ids;

/// Candidate ids tried before badge creation gives up.
pub const MAX_ID_ATTEMPTS: usize = 10;

pub type IdSource = Box<dyn Fn() -> String + Send + Sync>;

/// Badge fields as submitted for creation or a full edit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(rename = "type")]
    pub badge_type: String,
    pub days: Option<Vec<u8>>,
    pub email: Option<String>,
    pub companion: Option<String>,
}

/// Validated badge fields.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeDetails {
    pub name: String,
    pub department: String,
    pub badge_type: BadgeType,
    pub days: Vec<u8>,
    pub email: Option<String>,
    pub companion: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl BadgeInput {
    pub fn validate(self) -> Result<BadgeDetails, AppError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::ValidationError("Name is required".to_string()));
        }
        let department = self.department.trim().to_string();
        if department.is_empty() {
            return Err(AppError::ValidationError("Department is required".to_string()));
        }

        let badge_type: BadgeType = self.badge_type.parse().map_err(AppError::ValidationError)?;

        let mut days = match (self.days, badge_type) {
            (Some(days), _) => days,
            (None, BadgeType::Badge) => EVENT_DAYS.to_vec(),
            (None, BadgeType::MultidayBadge) => Vec::new(),
        };
        if days.is_empty() {
            return Err(AppError::ValidationError(
                "At least one event day is required".to_string(),
            ));
        }
        if let Some(day) = days.iter().find(|d| !EVENT_DAYS.contains(*d)) {
            return Err(AppError::ValidationError(format!(
                "Day {day} is out of range, days must be between 1 and 4"
            )));
        }
        days.sort_unstable();
        days.dedup();

        let email = non_empty(self.email);
        if let Some(email) = &email {
            if !email.contains('@') {
                return Err(AppError::ValidationError(format!(
                    "'{email}' is not a valid email address"
                )));
            }
        }

        Ok(BadgeDetails {
            name,
            department,
            badge_type,
            days,
            email,
            companion: non_empty(self.companion),
        })
    }
}

/// Badge lifecycle on top of the badge sheet.
pub struct BadgeService {
    store: Arc<dyn RowStore>,
    sheet: String,
    write_lock: Mutex<()>,
    id_source: IdSource,
}

impl BadgeService {
    pub fn new(store: Arc<dyn RowStore>, sheet: impl Into<String>) -> Self {
        Self {
            store,
            sheet: sheet.into(),
            write_lock: Mutex::new(()),
            id_source: Box::new(|| ids::badge_id(&mut rand::thread_rng())),
        }
    }

    /// Replaces the random id generator.
    pub fn with_id_source(mut self, id_source: IdSource) -> Self {
        self.id_source = id_source;
        self
    }

    fn band(&self) -> CellRange {
        CellRange::columns(&self.sheet, 0, BADGE_COLUMNS - 1)
    }

    fn row_range(&self, row_number: u32) -> CellRange {
        CellRange::row(&self.sheet, 0, BADGE_COLUMNS - 1, row_number)
    }

    pub async fn ensure_layout(&self) -> Result<usize, AppError> {
        let _guard = self.write_lock.lock().await;
        Ok(ensure_table(
            self.store.as_ref(),
            &self.sheet,
            &BADGE_HEADER,
            codec::migrate_badge_row,
        )
        .await?)
    }

    async fn read_rows(&self) -> Result<Vec<Row>, AppError> {
        Ok(self.store.read_all(&self.band()).await?)
    }

    fn find(rows: &[Row], id: &str) -> Result<Option<(u32, Badge)>, AppError> {
        match codec::records(rows, &BADGE_HEADER).find(|(_, row)| row[0].trim() == id) {
            Some((row_number, row)) => Ok(Some((row_number, codec::badge_from_row(row, row_number)?))),
            None => Ok(None),
        }
    }

    fn not_found(id: &str) -> AppError {
        AppError::NotFound(format!("Badge '{id}' was not found"))
    }

    async fn write_badge(&self, row_number: u32, badge: &Badge) -> Result<(), AppError> {
        self.store
            .write_range(&self.row_range(row_number), vec![codec::badge_to_row(badge)])
            .await?;
        Ok(())
    }

    /// Reads, mutates and writes back one badge while holding the write lock.
    async fn modify<F>(&self, id: &str, mutate: F) -> Result<Badge, AppError>
    where
        F: FnOnce(&mut Badge) -> Result<(), AppError>,
    {
        let _guard = self.write_lock.lock().await;
        let rows = self.read_rows().await?;
        let (row_number, mut badge) = Self::find(&rows, id)?.ok_or_else(|| Self::not_found(id))?;
        mutate(&mut badge)?;
        self.write_badge(row_number, &badge).await?;
        Ok(badge)
    }

    pub async fn create_badge(&self, input: BadgeInput) -> Result<Badge, AppError> {
        let details = input.validate()?;

        let _guard = self.write_lock.lock().await;
        let rows = self.read_rows().await?;

        let badge_id = (0..MAX_ID_ATTEMPTS)
            .map(|_| (self.id_source)())
            .find(|candidate| {
                let taken = codec::records(&rows, &BADGE_HEADER)
                    .any(|(_, row)| row[0].trim() == candidate.as_str());
                if taken {
                    tracing::debug!(candidate = %candidate, "Badge id collision");
                }
                !taken
            })
            .ok_or(AppError::GenerationExhausted {
                kind: "badge",
                attempts: MAX_ID_ATTEMPTS,
            })?;

        let badge = Badge {
            badge_id,
            name: details.name,
            department: details.department,
            email: details.email,
            badge_type: details.badge_type,
            days: details.days,
            companion: details.companion,
            check_in_history: Vec::new(),
        };

        let row_number = rows.len().max(1) as u32 + 1;
        self.write_badge(row_number, &badge).await?;

        tracing::info!(
            badge_id = %badge.badge_id,
            badge_type = %badge.badge_type,
            days = ?badge.days,
            "Badge created"
        );
        Ok(badge)
    }

    pub async fn get_badge(&self, id: &str) -> Result<Option<Badge>, AppError> {
        let rows = self.read_rows().await?;
        Ok(Self::find(&rows, id)?.map(|(_, badge)| badge))
    }

    /// Looks up each id with a single read, preserving the order of `ids`.
    pub async fn get_badges(&self, ids: &[String]) -> Result<Vec<(String, Option<Badge>)>, AppError> {
        let rows = self.read_rows().await?;
        ids.iter()
            .map(|id| Ok((id.clone(), Self::find(&rows, id)?.map(|(_, badge)| badge))))
            .collect()
    }

    /// Every decodable badge, optionally narrowed to one type.
    pub async fn get_all_badges(
        &self,
        badge_type: Option<BadgeType>,
    ) -> Result<Vec<Badge>, AppError> {
        let rows = self.read_rows().await?;
        let badges = codec::records(&rows, &BADGE_HEADER)
            .filter_map(|(row_number, row)| match codec::badge_from_row(row, row_number) {
                Ok(badge) => Some(badge),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable badge row");
                    None
                }
            })
            .filter(|badge| badge_type.map_or(true, |t| badge.badge_type == t))
            .collect();
        Ok(badges)
    }

    /// Replaces name, department, type, days, email and companion.
    /// Check-in history is kept, so a multiday edit must still account for
    /// every recorded scan.
    pub async fn update_badge_details(&self, id: &str, input: BadgeInput) -> Result<Badge, AppError> {
        let details = input.validate()?;
        let badge = self
            .modify(id, |badge| {
                if details.badge_type == BadgeType::MultidayBadge {
                    check_history_fits(badge, &details.days)?;
                }
                badge.name = details.name;
                badge.department = details.department;
                badge.badge_type = details.badge_type;
                badge.days = details.days;
                badge.email = details.email;
                badge.companion = details.companion;
                Ok(())
            })
            .await?;

        tracing::info!(badge_id = %badge.badge_id, "Badge details updated");
        Ok(badge)
    }

    /// Records a check-in.
    ///
    /// Multiday badges need a `selected_day` they cover, and each day can be
    /// checked in once. Regular badges accept any covered day or none.
    pub async fn update_badge_check_in(
        &self,
        id: &str,
        selected_day: Option<u8>,
    ) -> Result<Badge, AppError> {
        let badge = self
            .modify(id, |badge| {
                let day = check_in_day(badge, selected_day)?;
                badge.check_in_history.push(CheckIn {
                    timestamp: timestamp_now(),
                    day,
                });
                Ok(())
            })
            .await?;

        tracing::info!(
            badge_id = %badge.badge_id,
            day = ?selected_day,
            check_ins = badge.check_in_history.len(),
            "Badge checked in"
        );
        Ok(badge)
    }

    /// Clears the check-in history.
    pub async fn reset_badge(&self, id: &str) -> Result<Badge, AppError> {
        let badge = self
            .modify(id, |badge| {
                badge.check_in_history.clear();
                Ok(())
            })
            .await?;

        tracing::info!(badge_id = %badge.badge_id, "Badge reset");
        Ok(badge)
    }
}

fn invalid_day(badge: &Badge, selected_day: Option<u8>) -> AppError {
    let valid = badge
        .days
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let message = match selected_day {
        Some(day) => format!("Badge is not valid for day {day}, valid days: {valid}"),
        None => format!("Select the day to check in, valid days: {valid}"),
    };
    AppError::InvalidDay {
        message,
        valid_days: badge.days.clone(),
    }
}

fn check_in_day(badge: &Badge, selected_day: Option<u8>) -> Result<Option<u8>, AppError> {
    match selected_day {
        Some(day) if !badge.covers_day(day) => Err(invalid_day(badge, selected_day)),
        None if badge.is_multiday() => Err(invalid_day(badge, None)),
        Some(day) if badge.is_multiday() => match badge.scan_for_day(day) {
            Some(previous) => Err(AppError::AlreadyScanned {
                badge_id: badge.badge_id.clone(),
                day,
                scanned_at: previous.timestamp,
            }),
            None => Ok(Some(day)),
        },
        other => Ok(other),
    }
}

/// Recorded check-ins must each name a day in `days`, at most once per day.
fn check_history_fits(badge: &Badge, days: &[u8]) -> Result<(), AppError> {
    let mut seen = Vec::with_capacity(badge.check_in_history.len());
    for check_in in &badge.check_in_history {
        match check_in.day {
            Some(day) if !days.contains(&day) => {
                return Err(AppError::ValidationError(format!(
                    "Badge {} was checked in on day {day}, which the new days do not include",
                    badge.badge_id
                )));
            }
            Some(day) if seen.contains(&day) => {
                return Err(AppError::ValidationError(format!(
                    "Badge {} has more than one check-in on day {day}, reset it before making it multiday",
                    badge.badge_id
                )));
            }
            Some(day) => seen.push(day),
            None => {
                return Err(AppError::ValidationError(format!(
                    "Badge {} has check-ins without a day, reset it before making it multiday",
                    badge.badge_id
                )));
            }
        }
    }
    Ok(())
}
