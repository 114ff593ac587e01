use chrono::Utc;

use super::batch::PendingBatch;
use super::dispatcher::{DeliveryJob, Dispatcher};
use super::Report;

/// How finalized lines reach the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// One delivery per line
    Immediate,
    /// Collect lines and deliver them together once `threshold` is reached
    Batched { threshold: usize },
    /// Deliver every line at once and also collect it into batches
    ImmediateAndBatched { threshold: usize },
}

/// Session-side entry point for finalized lines
pub struct Reporter {
    dispatcher: Dispatcher,
    /// Send each line as its own delivery
    immediate: bool,
    batch: Option<PendingBatch>,
    identifier: String,
    program: String,
}

impl Reporter {
    pub fn new(dispatcher: Dispatcher, delivery: Delivery, identifier: String, program: String) -> Self {
        let (immediate, batch) = match delivery {
            Delivery::Immediate => (true, None),
            Delivery::Batched { threshold } => (false, Some(PendingBatch::new(threshold))),
            Delivery::ImmediateAndBatched { threshold } => {
                (true, Some(PendingBatch::new(threshold)))
            }
        };
        Self {
            dispatcher,
            immediate,
            batch,
            identifier,
            program,
        }
    }

    /// Hand a finalized line off for delivery; never blocks
    pub fn submit(&mut self, line: String) {
        tracing::debug!("Finalized line ({} chars)", line.chars().count());

        if self.batch.is_none() {
            self.send_line(line);
            return;
        }
        if self.immediate {
            self.send_line(line.clone());
        }
        if let Some(lines) = self.batch.as_mut().and_then(|batch| batch.push(line)) {
            self.dispatcher.submit(DeliveryJob::Batch {
                lines,
                identifier: self.identifier.clone(),
            });
        }
    }

    fn send_line(&self, line: String) {
        self.dispatcher.submit(DeliveryJob::Line(Report {
            line,
            timestamp: Utc::now(),
            identifier: self.identifier.clone(),
            program: self.program.clone(),
        }));
    }

    /// Number of lines waiting in the pending batch
    pub fn pending(&self) -> usize {
        self.batch.as_ref().map_or(0, PendingBatch::len)
    }

    /// Hand off any pending batch and drain the delivery queue
    ///
    /// Waits at most the dispatcher's drain timeout.
    pub fn flush(mut self) {
        if let Some(batch) = self.batch.as_mut() {
            if !batch.is_empty() {
                let lines = batch.take();
                tracing::info!("Sending {} remaining line(s) before exit", lines.len());
                self.dispatcher.submit_blocking(DeliveryJob::Batch {
                    lines,
                    identifier: self.identifier.clone(),
                });
            }
        }
        self.dispatcher.shutdown();
    }
}
