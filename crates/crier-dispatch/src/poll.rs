//! Poll loop driving repeated dispatcher passes.

use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::info;

use crate::{DispatchError, Dispatcher};

/// Two-state loop, idle ⇄ dispatching: a pass runs immediately on startup
/// and again after each fixed inter-pass delay, carrying the watermark
/// forward. Row-level errors never halt the loop; only a ledger failure
/// propagates and terminates the process, to be restarted externally.
pub struct PollLoop {
    dispatcher: Dispatcher,
    interval: Duration,
}

impl PollLoop {
    pub fn new(dispatcher: Dispatcher, interval: Duration) -> Self {
        Self {
            dispatcher,
            interval,
        }
    }

    /// Run until the shutdown channel flips or the ledger becomes
    /// unreachable.
    pub async fn run(
        &self,
        initial_watermark: NaiveDateTime,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), DispatchError> {
        info!(
            interval_secs = self.interval.as_secs(),
            "poll loop starting"
        );
        let mut watermark = initial_watermark;

        loop {
            if *shutdown_rx.borrow() {
                info!("poll loop shutting down");
                return Ok(());
            }

            let summary = self.dispatcher.run_pass(watermark).await?;
            if summary.rows_dispatched > 0 {
                info!(
                    rows = summary.rows_dispatched,
                    outcomes = summary.outcomes.len(),
                    "pass complete"
                );
            }
            watermark = summary.watermark;

            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("poll loop received shutdown signal");
                    }
                }
                _ = sleep(self.interval) => {}
            }
        }
    }
}
