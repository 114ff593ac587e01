//! Bounded delivery worker pool

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use parking_lot::Mutex;

use super::{Report, ReportSink};

/// Unit of work for a delivery worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryJob {
    Line(Report),
    Batch {
        lines: Vec<String>,
        identifier: String,
    },
}

impl DeliveryJob {
    fn line_count(&self) -> usize {
        match self {
            DeliveryJob::Line(_) => 1,
            DeliveryJob::Batch { lines, .. } => lines.len(),
        }
    }
}

/// Worker pool sizing
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of worker threads
    pub workers: usize,
    /// Jobs that may wait in the queue before new ones are dropped
    pub queue_capacity: usize,
    /// How long shutdown waits for queued jobs to finish
    pub drain_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 64,
            drain_timeout: Duration::from_secs(6),
        }
    }
}

/// Runs sink calls off the event loop thread
pub struct Dispatcher {
    sender: Option<SyncSender<DeliveryJob>>,
    workers: Vec<JoinHandle<()>>,
    drain_timeout: Duration,
    sink_name: String,
}

impl Dispatcher {
    /// Start the worker threads for `sink`
    pub fn start(sink: Arc<dyn ReportSink>, config: DispatcherConfig) -> Result<Self> {
        let (sender, receiver) = mpsc::sync_channel(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let sink_name = sink.name().to_string();

        let mut workers = Vec::with_capacity(config.workers.max(1));
        for i in 0..config.workers.max(1) {
            let sink = sink.clone();
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("ptylog-delivery-{}", i))
                .spawn(move || worker_loop(sink, receiver))
                .context("Failed to spawn delivery worker")?;
            workers.push(handle);
        }

        tracing::debug!(
            "Started {} delivery workers for sink {}",
            workers.len(),
            sink_name
        );

        Ok(Self {
            sender: Some(sender),
            workers,
            drain_timeout: config.drain_timeout,
            sink_name,
        })
    }

    /// Queue a job without blocking
    ///
    /// Returns false when the job was dropped because the queue is full or
    /// the workers are gone.
    pub fn submit(&self, job: DeliveryJob) -> bool {
        let Some(sender) = self.sender.as_ref() else {
            return false;
        };
        match sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                tracing::warn!(
                    "Delivery queue full, dropping {} line(s) for {}",
                    job.line_count(),
                    self.sink_name
                );
                false
            }
            Err(TrySendError::Disconnected(job)) => {
                tracing::warn!(
                    "Delivery workers stopped, dropping {} line(s)",
                    job.line_count()
                );
                false
            }
        }
    }

    /// Queue a job, waiting for room in the queue
    ///
    /// Only used during shutdown, once keystrokes no longer need forwarding.
    pub fn submit_blocking(&self, job: DeliveryJob) -> bool {
        let Some(sender) = self.sender.as_ref() else {
            return false;
        };
        match sender.send(job) {
            Ok(()) => true,
            Err(mpsc::SendError(job)) => {
                tracing::warn!(
                    "Delivery workers stopped, dropping {} line(s)",
                    job.line_count()
                );
                false
            }
        }
    }

    /// Close the queue and wait for workers to finish what is queued
    ///
    /// Workers still busy after the drain timeout are abandoned.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        // Dropping the sender lets workers exit once the queue is empty
        if self.sender.take().is_none() {
            return;
        }

        let deadline = Instant::now() + self.drain_timeout;
        for handle in self.workers.drain(..) {
            join_thread_with_deadline(handle, deadline);
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

fn worker_loop(sink: Arc<dyn ReportSink>, receiver: Arc<Mutex<Receiver<DeliveryJob>>>) {
    loop {
        let job = {
            let receiver = receiver.lock();
            receiver.recv()
        };
        match job {
            Ok(job) => deliver(sink.as_ref(), job),
            Err(_) => break,
        }
    }
}

fn deliver(sink: &dyn ReportSink, job: DeliveryJob) {
    let result = match &job {
        DeliveryJob::Line(report) => sink.report(report),
        DeliveryJob::Batch { lines, identifier } => sink.report_batch(lines, identifier),
    };
    match result {
        Ok(()) => tracing::debug!("Delivered {} line(s) to {}", job.line_count(), sink.name()),
        Err(e) => tracing::warn!(
            "Failed to deliver {} line(s) to {}: {}",
            job.line_count(),
            sink.name(),
            e
        ),
    }
}

/// Join a thread before `deadline`, abandoning it if it doesn't finish in time
fn join_thread_with_deadline<T>(handle: JoinHandle<T>, deadline: Instant) {
    loop {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        if Instant::now() >= deadline {
            tracing::debug!("Delivery worker join timed out, abandoning thread");
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
}
