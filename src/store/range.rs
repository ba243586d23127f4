use std::fmt;
use std::str::FromStr;

use super::StoreError;

/// An A1-notation range such as `Tickets!A2:G9` or `Badges!A:H`.
///
/// Columns are zero-based, rows are one-based like the spreadsheet itself.
/// A range without rows spans the whole column band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub sheet: String,
    pub start_col: u32,
    pub end_col: u32,
    pub start_row: Option<u32>,
    pub end_row: Option<u32>,
}

impl CellRange {
    /// Whole-column band, e.g. `Sheet!A:G`.
    pub fn columns(sheet: &str, start_col: u32, end_col: u32) -> Self {
        Self {
            sheet: sheet.to_string(),
            start_col,
            end_col,
            start_row: None,
            end_row: None,
        }
    }

    /// Rectangular block, e.g. `Sheet!A2:G5`.
    pub fn rows(sheet: &str, start_col: u32, end_col: u32, start_row: u32, end_row: u32) -> Self {
        Self {
            sheet: sheet.to_string(),
            start_col,
            end_col,
            start_row: Some(start_row),
            end_row: Some(end_row),
        }
    }

    /// A single row across the column band.
    pub fn row(sheet: &str, start_col: u32, end_col: u32, row: u32) -> Self {
        Self::rows(sheet, start_col, end_col, row, row)
    }

    pub fn width(&self) -> usize {
        (self.end_col - self.start_col + 1) as usize
    }
}

/// Zero-based column index to letters: 0 -> A, 25 -> Z, 26 -> AA.
fn column_letters(index: u32) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        if c.is_ascii_uppercase() {
            Some(acc * 26 + (c as u32 - 'A' as u32 + 1))
        } else {
            None
        }
    })
    .map(|n| n - 1)
}

fn parse_cell(cell: &str) -> Option<(u32, Option<u32>)> {
    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);
    let col = column_index(&letters.to_ascii_uppercase())?;
    let row = if digits.is_empty() {
        None
    } else {
        match digits.parse::<u32>() {
            Ok(0) | Err(_) => return None,
            Ok(n) => Some(n),
        }
    };
    Some((col, row))
}

impl FromStr for CellRange {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StoreError::InvalidRange(s.to_string());

        let (sheet, cells) = s.rsplit_once('!').ok_or_else(invalid)?;
        let sheet = sheet
            .strip_prefix('\'')
            .and_then(|rest| rest.strip_suffix('\''))
            .unwrap_or(sheet);
        if sheet.is_empty() {
            return Err(invalid());
        }

        let (start, end) = cells.split_once(':').unwrap_or((cells, cells));
        let (start_col, start_row) = parse_cell(start).ok_or_else(invalid)?;
        let (end_col, end_row) = parse_cell(end).ok_or_else(invalid)?;

        if end_col < start_col || start_row.is_some() != end_row.is_some() {
            return Err(invalid());
        }
        if let (Some(a), Some(b)) = (start_row, end_row) {
            if b < a {
                return Err(invalid());
            }
        }

        Ok(Self {
            sheet: sheet.to_string(),
            start_col,
            end_col,
            start_row,
            end_row,
        })
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            write!(f, "{}!", self.sheet)?;
        } else {
            write!(f, "'{}'!", self.sheet)?;
        }
        let start = column_letters(self.start_col);
        let end = column_letters(self.end_col);
        match (self.start_row, self.end_row) {
            (Some(a), Some(b)) => write!(f, "{start}{a}:{end}{b}"),
            _ => write!(f, "{start}:{end}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(6), "G");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(27), "AB");
    }

    #[test]
    fn test_parse_column_band() {
        let range: CellRange = "Badges!A:D".parse().unwrap();
        assert_eq!(range, CellRange::columns("Badges", 0, 3));
        assert_eq!(range.width(), 4);
    }

    #[test]
    fn test_parse_block_and_display() {
        let range: CellRange = "Tickets!A2:G9".parse().unwrap();
        assert_eq!(range, CellRange::rows("Tickets", 0, 6, 2, 9));
        assert_eq!(range.to_string(), "Tickets!A2:G9");
    }

    #[test]
    fn test_quoted_sheet_name() {
        let range: CellRange = "'Door List'!A1:B1".parse().unwrap();
        assert_eq!(range.sheet, "Door List");
        assert_eq!(range.to_string(), "'Door List'!A1:B1");
    }

    #[test]
    fn test_single_cell() {
        let range: CellRange = "Tickets!C5".parse().unwrap();
        assert_eq!(range, CellRange::row("Tickets", 2, 2, 5));
    }

    #[test]
    fn test_rejects_malformed_ranges() {
        for bad in ["A1:B2", "!A1", "Sheet!", "Sheet!1:2", "Sheet!B1:A1", "Sheet!A0", "Sheet!A1:B"] {
            assert!(bad.parse::<CellRange>().is_err(), "{bad} should be rejected");
        }
    }
}
