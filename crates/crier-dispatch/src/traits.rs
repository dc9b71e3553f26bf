//! Capability seams between the dispatcher and its collaborators.
//!
//! Clients are constructed once at startup and injected; the traits keep
//! the core testable with in-memory fakes.

use std::sync::Arc;

use async_trait::async_trait;

use crier_ledger::{DocsClient, LedgerError, SheetsClient};
use crier_publish::Publisher;

use crate::types::DestinationKind;

/// Range-addressed tabular store of schedule, directory and log rows.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Read a range of cells; rows may omit trailing empty cells.
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, LedgerError>;

    /// Write a single row of values to a range.
    async fn write_row(&self, range: &str, values: Vec<String>) -> Result<(), LedgerError>;
}

#[async_trait]
impl Ledger for SheetsClient {
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, LedgerError> {
        SheetsClient::read_range(self, range).await
    }

    async fn write_row(&self, range: &str, values: Vec<String>) -> Result<(), LedgerError> {
        SheetsClient::write_row(self, range, values).await
    }
}

/// Produces the plain text of a referenced document.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_text(&self, document_id: &str) -> Result<String, LedgerError>;
}

#[async_trait]
impl ContentFetcher for DocsClient {
    async fn fetch_text(&self, document_id: &str) -> Result<String, LedgerError> {
        DocsClient::fetch_text(self, document_id).await
    }
}

/// One publish adapter per destination kind.
pub struct Publishers {
    pub telegram: Arc<dyn Publisher>,
    pub vk: Arc<dyn Publisher>,
    pub ok: Arc<dyn Publisher>,
}

impl Publishers {
    /// Adapter for a destination kind.
    pub fn for_kind(&self, kind: DestinationKind) -> &dyn Publisher {
        match kind {
            DestinationKind::Telegram => self.telegram.as_ref(),
            DestinationKind::Vk => self.vk.as_ref(),
            DestinationKind::Ok => self.ok.as_ref(),
        }
    }
}
