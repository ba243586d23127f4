use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{CellRange, Row, RowStore, StoreError};

/// In-process table used for local development and tests.
///
/// Reads behave like the Sheets values API: trailing empty cells are dropped
/// from each row and trailing empty rows from the result.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sheets: RwLock<HashMap<String, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `rows` on `sheet`, starting at row 1.
    pub fn with_rows(sheet: &str, rows: Vec<Row>) -> Self {
        let mut sheets = HashMap::new();
        sheets.insert(sheet.to_string(), rows);
        Self {
            sheets: RwLock::new(sheets),
        }
    }

    /// Raw grid of `sheet` as currently stored.
    pub async fn snapshot(&self, sheet: &str) -> Vec<Row> {
        self.sheets
            .read()
            .await
            .get(sheet)
            .cloned()
            .unwrap_or_default()
    }
}

fn trim_trailing_empty(mut row: Row) -> Row {
    while row.last().is_some_and(|c| c.is_empty()) {
        row.pop();
    }
    row
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn read_all(&self, range: &CellRange) -> Result<Vec<Row>, StoreError> {
        let sheets = self.sheets.read().await;
        let Some(grid) = sheets.get(&range.sheet) else {
            return Ok(Vec::new());
        };

        let first = range.start_row.unwrap_or(1) as usize - 1;
        let last = range
            .end_row
            .map(|r| r as usize)
            .unwrap_or(grid.len())
            .min(grid.len());
        let start_col = range.start_col as usize;

        let mut rows: Vec<Row> = grid
            .get(first..last)
            .unwrap_or_default()
            .iter()
            .map(|row| {
                let band: Row = row
                    .iter()
                    .skip(start_col)
                    .take(range.width())
                    .cloned()
                    .collect();
                trim_trailing_empty(band)
            })
            .collect();

        while rows.last().is_some_and(|r| r.is_empty()) {
            rows.pop();
        }
        Ok(rows)
    }

    async fn write_range(&self, range: &CellRange, rows: Vec<Row>) -> Result<(), StoreError> {
        if rows.iter().any(|r| r.len() > range.width()) {
            return Err(StoreError::InvalidRange(format!(
                "{range}: row wider than {} columns",
                range.width()
            )));
        }
        if let (Some(start), Some(end)) = (range.start_row, range.end_row) {
            if rows.len() > (end - start + 1) as usize {
                return Err(StoreError::InvalidRange(format!(
                    "{range}: {} rows do not fit",
                    rows.len()
                )));
            }
        }

        let mut sheets = self.sheets.write().await;
        let grid = sheets.entry(range.sheet.clone()).or_default();
        let first = range.start_row.unwrap_or(1) as usize - 1;
        let start_col = range.start_col as usize;

        for (offset, values) in rows.into_iter().enumerate() {
            let idx = first + offset;
            if grid.len() <= idx {
                grid.resize(idx + 1, Vec::new());
            }
            let target = &mut grid[idx];
            if target.len() < start_col + values.len() {
                target.resize(start_col + values.len(), String::new());
            }
            for (col, value) in values.into_iter().enumerate() {
                target[start_col + col] = value;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_write_then_read_band() {
        let store = MemoryStore::new();
        store
            .write_range(
                &CellRange::rows("Tickets", 0, 2, 1, 2),
                vec![row(&["ID", "Status", "CreatedAt"]), row(&["TKT-1", "redeemed", ""])],
            )
            .await
            .unwrap();

        let rows = store.read_all(&CellRange::columns("Tickets", 0, 2)).await.unwrap();
        assert_eq!(rows, vec![row(&["ID", "Status", "CreatedAt"]), row(&["TKT-1", "redeemed"])]);
    }

    #[tokio::test]
    async fn test_write_past_end_pads_gap_rows() {
        let store = MemoryStore::new();
        store
            .write_range(&CellRange::row("Badges", 1, 2, 3), vec![row(&["Ada", "Ops"])])
            .await
            .unwrap();

        let grid = store.snapshot("Badges").await;
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[2], row(&["", "Ada", "Ops"]));

        let rows = store.read_all(&CellRange::columns("Badges", 1, 2)).await.unwrap();
        assert_eq!(rows, vec![Row::new(), Row::new(), row(&["Ada", "Ops"])]);
    }

    #[tokio::test]
    async fn test_read_unknown_sheet_is_empty() {
        let store = MemoryStore::new();
        let rows = store.read_all(&CellRange::columns("Nope", 0, 3)).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_block_overflow() {
        let store = MemoryStore::new();
        let result = store
            .write_range(&CellRange::row("Tickets", 0, 1, 2), vec![row(&["a", "b", "c"])])
            .await;
        assert!(matches!(result, Err(StoreError::InvalidRange(_))));
    }
}
