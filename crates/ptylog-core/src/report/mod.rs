//! Report delivery
//!
//! Finalized lines leave the event loop through a [`Reporter`], which either
//! hands each line to the sink or collects them into a [`PendingBatch`]. The
//! actual sink calls run on a bounded [`Dispatcher`] worker pool so a slow
//! collector never stalls keystroke forwarding.

mod batch;
mod dispatcher;
mod reporter;

pub use batch::PendingBatch;
pub use dispatcher::{DeliveryJob, Dispatcher, DispatcherConfig};
pub use reporter::{Delivery, Reporter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DeliveryError;

/// One finalized line with its session metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Sanitized line text
    pub line: String,
    /// When the line was finalized
    pub timestamp: DateTime<Utc>,
    /// User/session identifier
    pub identifier: String,
    /// Name of the wrapped program
    pub program: String,
}

/// Destination for finalized lines
///
/// Implementations perform blocking I/O; they are only ever called from
/// dispatcher worker threads.
pub trait ReportSink: Send + Sync {
    /// Short name used in log messages
    fn name(&self) -> &str;

    /// Deliver a single line
    fn report(&self, report: &Report) -> Result<(), DeliveryError>;

    /// Deliver a batch of lines in one round-trip
    fn report_batch(&self, lines: &[String], identifier: &str) -> Result<(), DeliveryError>;
}
