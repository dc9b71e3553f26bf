//! Row parsing and destination resolution.
//!
//! The two historical shapes of the loop collapse into one dispatcher: the
//! destination source is a configuration choice, either a directory sheet
//! mapping names to destinations or fixed per-kind id columns on the
//! schedule row itself. Both produce the same resolved destination list per
//! row and the same ordered id list for write-back.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::types::{Destination, DestinationKind, SCHEDULE_FORMAT, ScheduledPost};

/// Separator between destination names in a schedule cell.
const NAME_SEPARATOR: &str = ", ";

/// Fixed-mode id columns: one per kind, dispatch order Telegram, VK, OK.
const FIXED_IDS: [(DestinationKind, &str, usize); 3] = [
    (DestinationKind::Telegram, "Telegram", 5),
    (DestinationKind::Vk, "ВКонтакте", 6),
    (DestinationKind::Ok, "Одноклассники", 7),
];

/// Where destinations come from.
#[derive(Debug, Clone)]
pub enum DestinationSource {
    /// A separate directory range lists `name, kind tag, external id` rows.
    Directory {
        /// A1 range of the directory, e.g. `Networks!A3:C`.
        range: String,
    },
    /// The schedule row itself carries one id column per kind.
    FixedColumns,
}

/// Schedule column layout, which differs between the two sources.
struct ScheduleColumns {
    date: usize,
    time: usize,
    doc: usize,
    media: usize,
    names: usize,
}

impl DestinationSource {
    fn columns(&self) -> ScheduleColumns {
        match self {
            Self::Directory { .. } => ScheduleColumns {
                date: 0,
                time: 1,
                doc: 2,
                media: 3,
                names: 4,
            },
            Self::FixedColumns => ScheduleColumns {
                date: 0,
                time: 1,
                names: 2,
                doc: 3,
                media: 4,
            },
        }
    }

    /// Number of schedule columns read per row.
    pub(crate) fn schedule_width(&self) -> u32 {
        match self {
            Self::Directory { .. } => 5,
            Self::FixedColumns => 8,
        }
    }
}

/// Destination directory: name → destination, plus the ordered external ids
/// the write-back columns are keyed by.
#[derive(Debug, Default)]
pub struct Directory {
    by_name: HashMap<String, Destination>,
    ordered_ids: Vec<String>,
}

impl Directory {
    /// Build a directory from raw ledger rows.
    ///
    /// Rows missing a cell or carrying an unknown kind tag are skipped with
    /// a warning; a later duplicate of a name is ignored.
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let mut directory = Self::default();

        for cells in rows {
            let (Some(name), Some(tag), Some(id)) =
                (cell(cells, 0), cell(cells, 1), cell(cells, 2))
            else {
                warn!(?cells, "skipping malformed directory row");
                continue;
            };
            let Some(kind) = DestinationKind::parse(&tag) else {
                warn!(name = %name, tag = %tag, "unknown destination kind tag");
                continue;
            };
            if directory.by_name.contains_key(&name) {
                warn!(name = %name, "duplicate destination name, keeping the first");
                continue;
            }

            directory.ordered_ids.push(id.clone());
            directory.by_name.insert(
                name.clone(),
                Destination {
                    name,
                    kind,
                    external_id: id,
                },
            );
        }

        directory
    }

    pub fn get(&self, name: &str) -> Option<&Destination> {
        self.by_name.get(name.trim())
    }

    /// External ids in directory order; write-back columns are keyed by this.
    pub fn ordered_ids(&self) -> &[String] {
        &self.ordered_ids
    }

    pub fn len(&self) -> usize {
        self.ordered_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered_ids.is_empty()
    }
}

/// Destinations resolved for one row: resolution results in dispatch order,
/// plus the ordered ids the write-back columns are keyed by. An `Err`
/// carries the name that failed to resolve.
#[derive(Debug)]
pub struct RowDestinations {
    pub resolved: Vec<Result<Destination, String>>,
    pub writeback_ids: Vec<String>,
}

/// Read one schedule row into a candidate post.
///
/// Returns `None` when the row is ineligible: blank date or time, neither
/// document nor media (checked before the timestamp is parsed), an
/// unparsable timestamp, or no destination names. Skips are logged and
/// never fail the pass.
pub(crate) fn parse_schedule_row(
    cells: &[String],
    row_index: u32,
    source: &DestinationSource,
) -> Option<ScheduledPost> {
    let columns = source.columns();

    let (Some(date), Some(time)) = (cell(cells, columns.date), cell(cells, columns.time)) else {
        debug!(row = row_index, "blank schedule timestamp, skipping");
        return None;
    };

    let document_ref = cell(cells, columns.doc);
    let media_url = cell(cells, columns.media);
    if document_ref.is_none() && media_url.is_none() {
        debug!(row = row_index, "row has neither document nor media, skipping");
        return None;
    }

    let scheduled_at =
        match NaiveDateTime::parse_from_str(&format!("{} {}", date, time), SCHEDULE_FORMAT) {
            Ok(scheduled_at) => scheduled_at,
            Err(error) => {
                warn!(row = row_index, date = %date, time = %time, %error, "unparsable schedule timestamp, skipping");
                return None;
            }
        };

    let destination_names: Vec<String> = cell(cells, columns.names)
        .map(|names| {
            names
                .split(NAME_SEPARATOR)
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if destination_names.is_empty() {
        debug!(row = row_index, "row has no destinations, skipping");
        return None;
    }

    Some(ScheduledPost {
        row_index,
        scheduled_at,
        document_ref,
        media_url,
        destination_names,
    })
}

/// Resolve a row's destinations against the configured source.
pub(crate) fn resolve_row(
    post: &ScheduledPost,
    cells: &[String],
    source: &DestinationSource,
    directory: &Directory,
) -> RowDestinations {
    match source {
        DestinationSource::Directory { .. } => RowDestinations {
            resolved: post
                .destination_names
                .iter()
                .map(|name| directory.get(name).cloned().ok_or_else(|| name.clone()))
                .collect(),
            writeback_ids: directory.ordered_ids().to_vec(),
        },
        DestinationSource::FixedColumns => {
            let mut resolved = Vec::new();
            let mut writeback_ids = Vec::new();

            for (kind, name, column) in FIXED_IDS {
                let id = cell(cells, column);
                // The write-back block stays three columns wide even when an
                // id cell is blank
                writeback_ids.push(id.clone().unwrap_or_default());

                if !post.destination_names.iter().any(|n| n == name) {
                    continue;
                }
                match id {
                    Some(id) => resolved.push(Ok(Destination {
                        name: name.to_string(),
                        kind,
                        external_id: id,
                    })),
                    None => resolved.push(Err(name.to_string())),
                }
            }

            RowDestinations {
                resolved,
                writeback_ids,
            }
        }
    }
}

/// Trimmed, non-empty cell value. Trailing cells the ledger omitted read as
/// absent, same as blank ones.
fn cell(cells: &[String], index: usize) -> Option<String> {
    let value = cells.get(index)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn directory_source() -> DestinationSource {
        DestinationSource::Directory {
            range: "Networks!A3:C".to_string(),
        }
    }

    #[test]
    fn test_parse_directory_mode_row() {
        let cells = row(&[
            "01.01.2025",
            "10:00",
            "https://docs.example/d/doc123",
            "",
            "A, B",
        ]);
        let post = parse_schedule_row(&cells, 3, &directory_source()).unwrap();

        assert_eq!(post.row_index, 3);
        assert_eq!(
            post.scheduled_at,
            NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        );
        assert_eq!(
            post.document_ref.as_deref(),
            Some("https://docs.example/d/doc123")
        );
        assert_eq!(post.media_url, None);
        assert_eq!(post.destination_names, vec!["A", "B"]);
    }

    #[test]
    fn test_parse_skips_blank_timestamp() {
        let source = directory_source();
        let blank_date = row(&["", "10:00", "doc", "", "A"]);
        let missing_time = row(&["01.01.2025"]);

        assert!(parse_schedule_row(&blank_date, 3, &source).is_none());
        assert!(parse_schedule_row(&missing_time, 3, &source).is_none());
    }

    #[test]
    fn test_parse_skips_row_without_content() {
        let cells = row(&["01.01.2025", "10:00", "", "", "A"]);
        assert!(parse_schedule_row(&cells, 3, &directory_source()).is_none());
    }

    #[test]
    fn test_parse_skips_unparsable_timestamp() {
        let cells = row(&["2025-01-01", "10:00", "doc", "", "A"]);
        assert!(parse_schedule_row(&cells, 3, &directory_source()).is_none());
    }

    #[test]
    fn test_parse_tolerates_missing_trailing_cells() {
        // No media and no names cells at all
        let cells = row(&["01.01.2025", "10:00", "doc"]);
        assert!(parse_schedule_row(&cells, 3, &directory_source()).is_none());
    }

    #[test]
    fn test_directory_from_rows_skips_bad_rows_and_duplicates() {
        let directory = Directory::from_rows(&[
            row(&["A", "TG", "123"]),
            row(&["B", "Facebook", "999"]),
            row(&["C"]),
            row(&["A", "VK", "456"]),
            row(&["D", "OK", "789"]),
        ]);

        assert_eq!(directory.len(), 2);
        assert_eq!(directory.ordered_ids(), &["123".to_string(), "789".to_string()]);
        assert_eq!(directory.get("A").unwrap().kind, DestinationKind::Telegram);
        assert_eq!(directory.get("A").unwrap().external_id, "123");
        assert_eq!(directory.get("D").unwrap().kind, DestinationKind::Ok);
        assert!(directory.get("B").is_none());
    }

    #[test]
    fn test_resolve_directory_mode_reports_unknown_names() {
        let directory = Directory::from_rows(&[row(&["A", "TG", "123"])]);
        let cells = row(&["01.01.2025", "10:00", "doc", "", "A, Z"]);
        let post = parse_schedule_row(&cells, 3, &directory_source()).unwrap();

        let destinations = resolve_row(&post, &cells, &directory_source(), &directory);

        assert_eq!(destinations.writeback_ids, vec!["123".to_string()]);
        assert_eq!(destinations.resolved.len(), 2);
        assert_eq!(
            destinations.resolved[0].as_ref().unwrap().external_id,
            "123"
        );
        assert_eq!(destinations.resolved[1], Err("Z".to_string()));
    }

    #[test]
    fn test_resolve_fixed_columns() {
        let source = DestinationSource::FixedColumns;
        let cells = row(&[
            "01.01.2025",
            "10:00",
            "Telegram, Одноклассники",
            "doc",
            "",
            "111",
            "222",
            "333",
        ]);
        let post = parse_schedule_row(&cells, 2, &source).unwrap();

        let destinations = resolve_row(&post, &cells, &source, &Directory::default());

        // Write-back block always covers all three kinds
        assert_eq!(
            destinations.writeback_ids,
            vec!["111".to_string(), "222".to_string(), "333".to_string()]
        );
        // Only the requested kinds are dispatched
        assert_eq!(destinations.resolved.len(), 2);
        assert_eq!(
            destinations.resolved[0].as_ref().unwrap().kind,
            DestinationKind::Telegram
        );
        assert_eq!(
            destinations.resolved[1].as_ref().unwrap().kind,
            DestinationKind::Ok
        );
    }

    #[test]
    fn test_resolve_fixed_columns_missing_id_is_error() {
        let source = DestinationSource::FixedColumns;
        let cells = row(&["01.01.2025", "10:00", "ВКонтакте", "doc", "", "111"]);
        let post = parse_schedule_row(&cells, 2, &source).unwrap();

        let destinations = resolve_row(&post, &cells, &source, &Directory::default());

        assert_eq!(destinations.resolved, vec![Err("ВКонтакте".to_string())]);
        assert_eq!(
            destinations.writeback_ids,
            vec!["111".to_string(), String::new(), String::new()]
        );
    }
}
