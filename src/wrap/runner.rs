//! Wrap runner
//!
//! Builds the sink, delivery pool and session from settings, then proxies the
//! wrapped program on the process's own terminal.

use std::time::Duration;

use anyhow::Result;
use ptylog_core::pty::CommandSpec;
use ptylog_core::report::{Delivery, Dispatcher, DispatcherConfig, Reporter};
use ptylog_core::{Session, SessionConfig};

use crate::config::Settings;
use crate::sinks;

/// Extra time shutdown waits for queued deliveries beyond one request timeout
const DRAIN_MARGIN: Duration = Duration::from_secs(1);

/// Runs one wrapped program
pub struct WrapRunner {
    settings: Settings,
    command: CommandSpec,
}

impl WrapRunner {
    /// Create a new runner
    pub fn new(settings: Settings, command: CommandSpec) -> Self {
        Self { settings, command }
    }

    /// Session parameters derived from settings
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            paste_threshold: Duration::from_millis(self.settings.input.paste_threshold_ms),
            carriage_returns: self.settings.input.carriage_returns,
            rows: self.settings.pty.rows,
            cols: self.settings.pty.cols,
            child_grace: Duration::from_millis(self.settings.pty.child_grace_ms),
            ..SessionConfig::new(self.command.clone())
        }
    }

    /// How finalized lines are delivered
    pub fn delivery(&self) -> Delivery {
        let report = &self.settings.report;
        match (report.batch, report.each_line) {
            (false, _) => Delivery::Immediate,
            (true, false) => Delivery::Batched {
                threshold: report.batch_size,
            },
            (true, true) => Delivery::ImmediateAndBatched {
                threshold: report.batch_size,
            },
        }
    }

    /// Run the wrapped command
    ///
    /// Returns the process exit code. The child's own status is logged but
    /// not propagated.
    pub fn run(self) -> Result<i32> {
        let sink = sinks::build_sink(&self.settings)?;
        let report = &self.settings.report;
        let dispatcher = Dispatcher::start(
            sink,
            DispatcherConfig {
                workers: report.workers,
                queue_capacity: report.queue_capacity,
                drain_timeout: Duration::from_secs(report.timeout_secs) + DRAIN_MARGIN,
            },
        )?;

        let identifier = resolve_identifier(report.identifier.as_deref());
        let reporter = Reporter::new(
            dispatcher,
            self.delivery(),
            identifier.clone(),
            self.command.program_name().to_string(),
        );

        tracing::info!(
            "Wrapping {} {:?} as {} ({:?})",
            self.command.program,
            self.command.args,
            identifier,
            self.settings.sink_kind()
        );

        let session = Session::start_on_stdin(self.session_config(), reporter)?;
        let outcome = session.run_on_stdout()?;

        if let Some(status) = outcome.child_status {
            tracing::debug!("{} exited with {}", self.command.program, status.exit_code());
        }
        Ok(0)
    }
}

/// Identifier attached to reports: configured value, else $USER, else a UUID
pub fn resolve_identifier(configured: Option<&str>) -> String {
    if let Some(id) = configured.filter(|id| !id.is_empty()) {
        return id.to_string();
    }

    if let Ok(user) = std::env::var("USER") {
        if !user.is_empty() {
            return user;
        }
    }

    uuid::Uuid::new_v4().to_string()
}
