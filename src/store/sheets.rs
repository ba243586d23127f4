use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use super::{CellRange, Row, RowStore, StoreError};

pub const DEFAULT_SHEETS_API: &str = "https://sheets.googleapis.com";

/// Google Sheets values API (v4) client.
///
/// Authenticates with a bearer token. Obtaining and refreshing that token is
/// left to the deployment.
#[derive(Clone)]
pub struct SheetsStore {
    client: Client,
    base_url: Url,
    spreadsheet_id: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Row>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    updated_range: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeBody<'a> {
    range: String,
    major_dimension: &'static str,
    values: &'a [Row],
}

impl SheetsStore {
    pub fn new(
        base_url: &str,
        spreadsheet_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let base_url =
            Url::parse(base_url).map_err(|e| StoreError::InvalidRange(format!("{base_url}: {e}")))?;
        Ok(Self {
            client: Client::new(),
            base_url,
            spreadsheet_id: spreadsheet_id.into(),
            access_token: access_token.into(),
        })
    }

    fn values_url(&self, range: &CellRange) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidRange(self.base_url.to_string()))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                &range.to_string(),
            ]);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), body = %body, "Sheets API request rejected");
        Err(StoreError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RowStore for SheetsStore {
    async fn read_all(&self, range: &CellRange) -> Result<Vec<Row>, StoreError> {
        let url = self.values_url(range)?;
        tracing::debug!(%range, "Reading rows");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(&[("majorDimension", "ROWS")])
            .send()
            .await?;
        let payload: ValueRange = Self::check(response).await?.json().await?;

        Ok(payload.values)
    }

    async fn write_range(&self, range: &CellRange, rows: Vec<Row>) -> Result<(), StoreError> {
        let url = self.values_url(range)?;
        tracing::debug!(%range, rows = rows.len(), "Writing rows");

        let body = ValueRangeBody {
            range: range.to_string(),
            major_dimension: "ROWS",
            values: &rows,
        };
        let response = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .query(&[("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .await?;
        let updated: UpdateValuesResponse = Self::check(response).await?.json().await?;

        if let Some(updated_range) = updated.updated_range.as_deref() {
            if !lands_on(range, updated_range) {
                tracing::warn!(%range, updated_range, "Sheets API wrote outside the requested range");
            }
        }
        Ok(())
    }
}

/// Whether the range reported by the API starts where the write was aimed.
///
/// The API omits trailing empty cells, so only the sheet and top-left
/// corner are compared.
fn lands_on(requested: &CellRange, reported: &str) -> bool {
    match reported.parse::<CellRange>() {
        Ok(actual) => {
            actual.sheet == requested.sheet
                && actual.start_col == requested.start_col
                && actual.start_row == requested.start_row
        }
        Err(e) => {
            tracing::debug!(error = %e, reported, "Unparseable range in Sheets response");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_url_encodes_range() {
        let store = SheetsStore::new(DEFAULT_SHEETS_API, "sheet-123", "token").unwrap();
        let url = store
            .values_url(&CellRange::rows("Door List", 0, 6, 2, 9))
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-123/values/'Door%20List'!A2:G9"
        );
    }

    #[test]
    fn test_value_range_without_values_is_empty() {
        let payload: ValueRange =
            serde_json::from_str(r#"{"range":"Tickets!A1:G1","majorDimension":"ROWS"}"#).unwrap();
        assert!(payload.values.is_empty());
    }

    #[test]
    fn test_update_response_range_is_checked() {
        let requested = CellRange::rows("Door List", 0, 6, 5, 5);
        let payload: UpdateValuesResponse = serde_json::from_str(
            r#"{"spreadsheetId":"sheet-123","updatedRange":"'Door List'!A5:G5","updatedRows":1}"#,
        )
        .unwrap();

        assert!(lands_on(&requested, payload.updated_range.as_deref().unwrap()));
        assert!(lands_on(&requested, "'Door List'!A5:C5"));
        assert!(!lands_on(&requested, "'Door List'!A6:G6"));
        assert!(!lands_on(&requested, "Tickets!A5:G5"));
        assert!(!lands_on(&requested, "garbage"));
    }
}
