//! Scheduling-and-dispatch core for Crier.
//!
//! One dispatcher pass reads due rows from the ledger, fans delivery out to
//! each row's destinations with per-destination failure isolation, and
//! writes status, link and delivery-log cells back so repeated passes never
//! deliver the same (row, destination) pair twice.

mod dispatcher;
mod error;
mod log;
mod poll;
mod resolve;
mod traits;
mod types;
mod writeback;

pub use dispatcher::{DispatchConfig, Dispatcher, PassSummary};
pub use error::DispatchError;
pub use log::DeliveryLog;
pub use poll::PollLoop;
pub use resolve::{DestinationSource, Directory, RowDestinations};
pub use traits::{ContentFetcher, Ledger, Publishers};
pub use types::{
    DeliveryOutcome, DeliveryStatus, Destination, DestinationKind, SCHEDULE_FORMAT, ScheduledPost,
};
pub use writeback::WritebackColumns;
