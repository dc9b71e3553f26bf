//! Write-back range math and row formatting.

use std::collections::HashMap;

/// Cell value for destinations with no attempt; never left blank.
pub(crate) const SENTINEL: &str = "Pass";

/// Column blocks (0-based start columns) the dispatcher writes results to.
/// Each block is as wide as the ordered destination id list.
#[derive(Debug, Clone)]
pub struct WritebackColumns {
    pub status_start: u32,
    pub link_start: u32,
    pub log_start: u32,
}

impl WritebackColumns {
    /// Directory-mode defaults: statuses from F, links from M, log from T.
    pub fn directory_default() -> Self {
        Self {
            status_start: 5,
            link_start: 12,
            log_start: 19,
        }
    }

    /// Fixed-columns defaults: statuses from I, links from L, log from O.
    pub fn fixed_default() -> Self {
        Self {
            status_start: 8,
            link_start: 11,
            log_start: 14,
        }
    }
}

/// Convert a 0-based column index to its A1 letters (0 → A, 25 → Z, 26 → AA).
pub(crate) fn column_letters(index: u32) -> String {
    let mut letters = String::new();
    let mut remaining = index;
    loop {
        letters.insert(0, (b'A' + (remaining % 26) as u8) as char);
        if remaining < 26 {
            break;
        }
        remaining = remaining / 26 - 1;
    }
    letters
}

/// Parse A1 column letters into a 0-based index (A → 0, AA → 26).
pub(crate) fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut index: u32 = 0;
    for c in letters.chars() {
        let digit = (c.to_ascii_uppercase() as u32).checked_sub('A' as u32)?;
        if digit >= 26 {
            return None;
        }
        index = index.checked_mul(26)?.checked_add(digit + 1)?;
    }
    Some(index - 1)
}

/// Build a single-row A1 range, e.g. `'requests log'!F5:L5`.
pub(crate) fn row_range(sheet: &str, start_column: u32, width: u32, row: u32) -> String {
    let start = column_letters(start_column);
    let end = column_letters(start_column + width.saturating_sub(1));
    if sheet.is_empty() {
        format!("{}{}:{}{}", start, row, end, row)
    } else {
        format!("'{}'!{}{}:{}{}", sheet, start, row, end, row)
    }
}

/// Build an open-ended column range, e.g. `'requests log'!A3:E`.
pub(crate) fn column_range(sheet: &str, start_column: u32, width: u32, first_row: u32) -> String {
    let start = column_letters(start_column);
    let end = column_letters(start_column + width.saturating_sub(1));
    if sheet.is_empty() {
        format!("{}{}:{}", start, first_row, end)
    } else {
        format!("'{}'!{}{}:{}", sheet, start, first_row, end)
    }
}

/// Order cell values by the write-back ids, defaulting missing entries to
/// the sentinel.
pub(crate) fn row_values(ids: &[String], cells: &HashMap<String, String>) -> Vec<String> {
    ids.iter()
        .map(|id| cells.get(id).cloned().unwrap_or_else(|| SENTINEL.to_string()))
        .collect()
}
