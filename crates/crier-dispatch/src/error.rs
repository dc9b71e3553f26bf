//! Error types for the dispatcher.

use thiserror::Error;

/// Errors that abort a dispatcher pass.
///
/// Row- and destination-level failures never surface here; they are
/// recorded as [`crate::DeliveryStatus::Error`] outcomes and the pass
/// continues. Only a ledger failure is fatal.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Ledger unreachable or rejected a read/write.
    #[error("ledger error: {0}")]
    Ledger(#[from] crier_ledger::LedgerError),
}
