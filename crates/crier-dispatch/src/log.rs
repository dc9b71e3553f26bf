//! Delivery-log reconstruction and cell formatting.
//!
//! One log row per schedule row, same row alignment. Each cell records one
//! attempt as `<destination id>, <True|False>`; anything that does not
//! split into exactly those two fields (including the `Pass` placeholder)
//! is ignored.

use std::collections::HashMap;

/// Separator between destination id and success flag inside a log cell.
const SEPARATOR: &str = ", ";

/// Per-row record of destinations already attempted.
///
/// Both flags count as attempted: a recorded failure is not retried unless
/// the log entry is externally cleared.
#[derive(Debug, Default)]
pub struct DeliveryLog {
    rows: Vec<HashMap<String, bool>>,
}

impl DeliveryLog {
    /// Reconstruct the log from raw ledger rows.
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let rows = rows
            .iter()
            .map(|cells| {
                let mut entries = HashMap::new();
                for cell in cells {
                    if let Some((id, success)) = parse_cell(cell) {
                        entries.insert(id, success);
                    }
                }
                entries
            })
            .collect();

        Self { rows }
    }

    /// Whether `(row, destination)` was already attempted.
    ///
    /// A missing row, or a missing log entirely, counts as never attempted.
    pub fn attempted(&self, row_offset: usize, destination_id: &str) -> bool {
        self.rows
            .get(row_offset)
            .is_some_and(|entries| entries.contains_key(destination_id))
    }

    /// Prior entries for a row: destination id → success flag.
    pub fn entries(&self, row_offset: usize) -> Option<&HashMap<String, bool>> {
        self.rows.get(row_offset)
    }
}

/// Parse one log cell into `(destination id, success)`.
///
/// Cells with more or fewer than two fields are malformed and skipped.
fn parse_cell(cell: &str) -> Option<(String, bool)> {
    let mut fields = cell.split(SEPARATOR);
    let id = fields.next()?;
    let flag = fields.next()?;
    if fields.next().is_some() {
        return None;
    }
    Some((id.to_string(), flag == "True"))
}

/// Format one attempt as a log cell.
pub(crate) fn format_cell(destination_id: &str, success: bool) -> String {
    format!(
        "{}{}{}",
        destination_id,
        SEPARATOR,
        if success { "True" } else { "False" }
    )
}
