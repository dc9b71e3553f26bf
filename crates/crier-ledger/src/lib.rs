//! Spreadsheet ("ledger") and document clients for Crier.
//!
//! The ledger is the tabular store the dispatcher reads scheduled posts and
//! the destination directory from, and writes per-destination delivery
//! results back to. The document client fetches the rich document a row
//! links to and assembles its plain text.

mod client;
mod docs;
mod error;
mod http;

pub use client::SheetsClient;
pub use docs::{DocsClient, document_id};
pub use error::LedgerError;
