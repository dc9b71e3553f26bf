//! Dispatcher pass: due-row selection, per-destination fan-out, write-back.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use crier_ledger::document_id;

use crate::DispatchError;
use crate::log::{DeliveryLog, format_cell};
use crate::resolve::{
    Directory, DestinationSource, RowDestinations, parse_schedule_row, resolve_row,
};
use crate::traits::{ContentFetcher, Ledger, Publishers};
use crate::types::{DeliveryOutcome, DeliveryStatus, ScheduledPost};
use crate::writeback::{WritebackColumns, column_range, row_range, row_values};

/// Width of the fixed-columns write-back block: one column per kind.
const FIXED_WIDTH: usize = 3;

/// Configuration for one dispatcher instance.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Sheet holding the schedule rows.
    pub schedule_sheet: String,
    /// First schedule row (1-based; rows above are headers).
    pub first_row: u32,
    pub source: DestinationSource,
    pub columns: WritebackColumns,
}

/// Result of one dispatcher pass.
#[derive(Debug)]
pub struct PassSummary {
    /// Watermark for the next pass: the wall-clock instant this pass
    /// started.
    pub watermark: NaiveDateTime,
    /// Rows that had at least one destination processed.
    pub rows_dispatched: usize,
    /// All outcomes recorded during the pass.
    pub outcomes: Vec<DeliveryOutcome>,
}

/// The dispatcher. Collaborators are injected at construction and reused
/// across passes.
pub struct Dispatcher {
    ledger: Arc<dyn Ledger>,
    content: Arc<dyn ContentFetcher>,
    publishers: Publishers,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Create a new dispatcher.
    pub fn new(
        ledger: Arc<dyn Ledger>,
        content: Arc<dyn ContentFetcher>,
        publishers: Publishers,
        config: DispatchConfig,
    ) -> Self {
        Self {
            ledger,
            content,
            publishers,
            config,
        }
    }

    /// Run one pass over all currently due rows.
    ///
    /// Rows are processed newest-first: `row_index` strictly decreases
    /// within a pass. Only ledger failures abort the pass; everything else
    /// is recorded per destination and the pass continues.
    #[tracing::instrument(skip(self))]
    pub async fn run_pass(&self, watermark: NaiveDateTime) -> Result<PassSummary, DispatchError> {
        let pass_started = Local::now().naive_local();

        let directory = match &self.config.source {
            DestinationSource::Directory { range } => {
                Directory::from_rows(&self.ledger.read_range(range).await?)
            }
            DestinationSource::FixedColumns => Directory::default(),
        };

        let schedule = self.ledger.read_range(&self.schedule_range()).await?;
        let log = self.read_log(&directory).await?;

        let mut summary = PassSummary {
            watermark: pass_started,
            rows_dispatched: 0,
            outcomes: Vec::new(),
        };

        for (offset, cells) in schedule.iter().enumerate().rev() {
            let row_index = self.config.first_row + offset as u32;
            let Some(post) = parse_schedule_row(cells, row_index, &self.config.source) else {
                continue;
            };

            if post.scheduled_at <= watermark {
                debug!(row = row_index, scheduled_at = %post.scheduled_at, "already handled, skipping");
                continue;
            }
            if post.scheduled_at > pass_started {
                debug!(row = row_index, scheduled_at = %post.scheduled_at, "not yet due");
                continue;
            }

            let destinations = resolve_row(&post, cells, &self.config.source, &directory);
            let outcomes = self.dispatch_row(&post, offset, &destinations, &log).await?;

            if !outcomes.is_empty() {
                summary.rows_dispatched += 1;
                summary.outcomes.extend(outcomes);
            }
        }

        Ok(summary)
    }

    /// Deliver one due row to each of its destinations and write the
    /// results back.
    async fn dispatch_row(
        &self,
        post: &ScheduledPost,
        offset: usize,
        destinations: &RowDestinations,
        log: &DeliveryLog,
    ) -> Result<Vec<DeliveryOutcome>, DispatchError> {
        // Fetch text once per row. A fetch failure leaves the row untouched
        // for a future pass instead of burning its delivery-log entries.
        let text = match &post.document_ref {
            Some(reference) => {
                match self.content.fetch_text(document_id(reference)).await {
                    Ok(text) => text,
                    Err(error) => {
                        warn!(row = post.row_index, %error, "content fetch failed, leaving row for a future pass");
                        return Ok(Vec::new());
                    }
                }
            }
            None => String::new(),
        };

        let mut outcomes = Vec::new();

        for resolution in &destinations.resolved {
            let destination = match resolution {
                Ok(destination) => destination,
                Err(name) => {
                    warn!(row = post.row_index, name = %name, "destination name not in directory");
                    outcomes.push(DeliveryOutcome {
                        destination_id: name.clone(),
                        status: DeliveryStatus::Error(format!("unknown destination: {}", name)),
                        link: None,
                    });
                    continue;
                }
            };

            if log.attempted(offset, &destination.external_id) {
                debug!(
                    row = post.row_index,
                    destination = %destination.external_id,
                    "already attempted, skipping"
                );
                continue;
            }

            let adapter = self.publishers.for_kind(destination.kind);
            let outcome = match adapter
                .publish(&destination.external_id, &text, post.media_url.as_deref())
                .await
            {
                Ok(link) => {
                    info!(
                        row = post.row_index,
                        destination = %destination.external_id,
                        link = %link,
                        "published"
                    );
                    DeliveryOutcome {
                        destination_id: destination.external_id.clone(),
                        status: DeliveryStatus::Success,
                        link: Some(link),
                    }
                }
                Err(error) => {
                    warn!(
                        row = post.row_index,
                        destination = %destination.external_id,
                        %error,
                        "publish failed"
                    );
                    DeliveryOutcome {
                        destination_id: destination.external_id.clone(),
                        status: DeliveryStatus::Error(error.to_string()),
                        link: None,
                    }
                }
            };
            outcomes.push(outcome);
        }

        if !outcomes.is_empty() && !destinations.writeback_ids.is_empty() {
            self.write_back(post, offset, &destinations.writeback_ids, &outcomes, log)
                .await?;
        }

        Ok(outcomes)
    }

    /// Write the status, link and log rows for one dispatched row, one
    /// ranged update per mapping. Unattempted destinations get the `Pass`
    /// sentinel.
    async fn write_back(
        &self,
        post: &ScheduledPost,
        offset: usize,
        ids: &[String],
        outcomes: &[DeliveryOutcome],
        log: &DeliveryLog,
    ) -> Result<(), DispatchError> {
        let mut status = HashMap::new();
        let mut links = HashMap::new();
        let mut log_cells: HashMap<String, String> = HashMap::new();

        // Prior log entries survive the rewrite so the at-most-once
        // guarantee holds across resumed passes
        if let Some(entries) = log.entries(offset) {
            for (id, success) in entries {
                log_cells.insert(id.clone(), format_cell(id, *success));
            }
        }

        for outcome in outcomes {
            status.insert(outcome.destination_id.clone(), outcome.status.as_cell());
            if let Some(link) = &outcome.link {
                links.insert(outcome.destination_id.clone(), link.clone());
            }
            log_cells.insert(
                outcome.destination_id.clone(),
                format_cell(&outcome.destination_id, outcome.status.is_success()),
            );
        }

        let sheet = &self.config.schedule_sheet;
        let columns = &self.config.columns;
        let width = ids.len() as u32;
        let row = post.row_index;

        self.ledger
            .write_row(
                &row_range(sheet, columns.status_start, width, row),
                row_values(ids, &status),
            )
            .await?;
        self.ledger
            .write_row(
                &row_range(sheet, columns.link_start, width, row),
                row_values(ids, &links),
            )
            .await?;
        self.ledger
            .write_row(
                &row_range(sheet, columns.log_start, width, row),
                row_values(ids, &log_cells),
            )
            .await?;

        Ok(())
    }

    fn schedule_range(&self) -> String {
        column_range(
            &self.config.schedule_sheet,
            0,
            self.config.source.schedule_width(),
            self.config.first_row,
        )
    }

    /// Read and reconstruct the delivery log, aligned with the schedule
    /// rows. A missing or empty log reads as "nothing attempted yet".
    async fn read_log(&self, directory: &Directory) -> Result<DeliveryLog, DispatchError> {
        let width = match &self.config.source {
            DestinationSource::Directory { .. } => directory.len(),
            DestinationSource::FixedColumns => FIXED_WIDTH,
        };
        if width == 0 {
            return Ok(DeliveryLog::default());
        }

        let range = column_range(
            &self.config.schedule_sheet,
            self.config.columns.log_start,
            width as u32,
            self.config.first_row,
        );
        Ok(DeliveryLog::from_rows(&self.ledger.read_range(&range).await?))
    }
}
