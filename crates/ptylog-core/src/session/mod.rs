//! PTY proxy session
//!
//! A [`Session`] owns everything one invocation needs: the child and its PTY,
//! the raw-mode guard for the real terminal, the input pipeline and the
//! reporter. [`Session::run`] drives the event loop and then performs the
//! shutdown sequence on every exit path: flush reports, restore the terminal,
//! reap the child.

mod multiplexer;
pub mod signals;

use std::fs::File;
use std::io::{self, Write};
use std::os::fd::AsFd;
use std::time::Duration;

use anyhow::{Context, Result};
use nix::sys::signal::Signal;
use portable_pty::ExitStatus;

use crate::input::{CarriageReturns, InputPipeline, DEFAULT_PASTE_THRESHOLD};
use crate::pty::{self, CommandSpec, PtyChild, PtyMaster};
use crate::report::Reporter;
use crate::terminal::{self, TerminalMode};
use signals::SessionSignals;

/// Session parameters
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Program to wrap
    pub command: CommandSpec,
    /// Inter-byte gap below which input is treated as pasted
    pub paste_threshold: Duration,
    /// Carriage-return handling for finalized lines
    pub carriage_returns: CarriageReturns,
    /// PTY size when the input is not a terminal
    pub rows: u16,
    /// PTY columns when the input is not a terminal
    pub cols: u16,
    /// How long to wait for the child after its PTY is closed
    pub child_grace: Duration,
}

impl SessionConfig {
    pub fn new(command: CommandSpec) -> Self {
        Self {
            command,
            paste_threshold: DEFAULT_PASTE_THRESHOLD,
            carriage_returns: CarriageReturns::default(),
            rows: 24,
            cols: 80,
            child_grace: Duration::from_secs(2),
        }
    }
}

/// Why the event loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The terminal input reached end-of-file
    InputClosed,
    /// The child closed its side of the PTY
    ChildExited,
    /// A termination signal was received
    Signal(i32),
}

/// Result of a completed session
#[derive(Debug)]
pub struct SessionOutcome {
    pub exit: LoopExit,
    /// Exit status of the child, when it could be collected
    pub child_status: Option<ExitStatus>,
}

/// One wrapped-program invocation
pub struct Session {
    config: SessionConfig,
    input: File,
    terminal: TerminalMode,
    child: PtyChild,
    master: PtyMaster,
    pipeline: InputPipeline,
    reporter: Reporter,
}

impl Session {
    /// Spawn the child and put `input` into raw mode
    ///
    /// Spawn failure is returned before the terminal is touched.
    pub fn start(config: SessionConfig, reporter: Reporter, input: File) -> Result<Self> {
        let (rows, cols) = terminal::window_size(&input).unwrap_or((config.rows, config.cols));
        let (child, master) = pty::spawn(&config.command, rows, cols)?;
        let terminal = TerminalMode::enter_raw(input.as_fd());
        let pipeline = InputPipeline::new(config.paste_threshold, config.carriage_returns);

        tracing::info!(
            "Session started: {} (pid {}, {}x{}, raw mode: {})",
            config.command.program,
            child.pid(),
            cols,
            rows,
            terminal.is_raw()
        );

        Ok(Self {
            config,
            input,
            terminal,
            child,
            master,
            pipeline,
            reporter,
        })
    }

    /// Start a session on the process's own standard input
    pub fn start_on_stdin(config: SessionConfig, reporter: Reporter) -> Result<Self> {
        let input = io::stdin()
            .as_fd()
            .try_clone_to_owned()
            .context("Failed to duplicate stdin")?;
        Self::start(config, reporter, File::from(input))
    }

    /// Run the proxy until either side closes or a termination signal arrives
    pub fn run<W: Write>(mut self, mut output: W) -> Result<SessionOutcome> {
        let result = match SessionSignals::register() {
            Ok(signals) => self.event_loop(&mut output, &signals),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            tracing::warn!("Event loop failed: {:#}", e);
        }

        let child_status = self.shutdown(result.as_ref().ok().copied());
        let exit = result?;

        tracing::info!("Session ended: {:?}", exit);
        Ok(SessionOutcome { exit, child_status })
    }

    /// Run on the process's own standard output
    pub fn run_on_stdout(self) -> Result<SessionOutcome> {
        let output = io::stdout()
            .as_fd()
            .try_clone_to_owned()
            .context("Failed to duplicate stdout")?;
        self.run(File::from(output))
    }

    fn shutdown(self, exit: Option<LoopExit>) -> Option<ExitStatus> {
        let Session {
            config,
            input,
            terminal,
            mut child,
            master,
            pipeline,
            reporter,
        } = self;

        if let Some(LoopExit::Signal(sig)) = exit {
            if let Ok(sig) = Signal::try_from(sig) {
                if let Err(e) = child.signal(sig) {
                    tracing::debug!("{:#}", e);
                }
            }
        }
        // Closing the master hangs up the child's terminal
        drop(master);

        if !pipeline.pending_line().is_empty() {
            tracing::debug!("Dropping unterminated line at shutdown");
        }

        reporter.flush();
        terminal.restore();
        drop(input);

        let status = child.reap(config.child_grace);
        match &status {
            Some(status) => tracing::info!("Child exited with code {}", status.exit_code()),
            None => tracing::debug!("Child status unavailable"),
        }
        status
    }
}
