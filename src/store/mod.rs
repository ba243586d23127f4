//! Row-oriented storage for tickets and badges.
//!
//! The backing table is a spreadsheet: every read fetches a whole column band
//! and every write replaces a rectangular block. Nothing here is transactional.

use async_trait::async_trait;
use thiserror::Error;

pub mod codec;
pub mod memory;
pub mod range;
pub mod sheets;

pub use memory::MemoryStore;
pub use range::CellRange;
pub use sheets::SheetsStore;

pub type Row = Vec<String>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("row store returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid range '{0}'")]
    InvalidRange(String),

    #[error("malformed row {row}: {reason}")]
    Malformed { row: u32, reason: String },
}

#[async_trait]
pub trait RowStore: Send + Sync {
    /// Every row in `range`, top to bottom. Trailing empty cells and rows are
    /// omitted, so rows may be shorter than the range is wide.
    async fn read_all(&self, range: &CellRange) -> Result<Vec<Row>, StoreError>;

    /// Overwrites the block starting at the top-left corner of `range`.
    async fn write_range(&self, range: &CellRange, rows: Vec<Row>) -> Result<(), StoreError>;
}

/// Makes sure `sheet` starts with `header` and that every data row has been
/// through `migrate`. Rewrites the whole band only when something changed.
/// Returns the number of data rows that were rewritten.
pub async fn ensure_table(
    store: &dyn RowStore,
    sheet: &str,
    header: &[&str],
    migrate: fn(Row) -> Row,
) -> Result<usize, StoreError> {
    let width = header.len() as u32;
    let rows = store.read_all(&CellRange::columns(sheet, 0, width - 1)).await?;

    let has_header = rows
        .first()
        .is_some_and(|row| codec::is_header(row, header));
    let body = if has_header { &rows[1..] } else { &rows[..] };

    let mut changed = 0;
    let mut table = Vec::with_capacity(body.len() + 1);
    table.push(codec::header_row(header));
    for row in body {
        if codec::is_blank(row) {
            table.push(row.clone());
            continue;
        }
        let migrated = migrate(row.clone());
        if &migrated != row {
            changed += 1;
        }
        table.push(migrated);
    }

    if table == rows {
        return Ok(0);
    }
    if !has_header && !body.is_empty() {
        tracing::warn!(sheet, "Header row missing, shifting existing rows down");
    }

    let last_row = table.len() as u32;
    store
        .write_range(&CellRange::rows(sheet, 0, width - 1, 1, last_row), table)
        .await?;
    tracing::info!(sheet, migrated_rows = changed, "Sheet layout updated");
    Ok(changed)
}
