//! Child process on a pseudo-terminal
//!
//! Spawns the wrapped program on the slave side of a fresh PTY. The master
//! side is returned separately so it can be closed before the child is reaped.

use std::io::{self, Read, Write};
use std::os::fd::{BorrowedFd, RawFd};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use portable_pty::{native_pty_system, Child, CommandBuilder, ExitStatus, MasterPty, PtySize};

/// Program and arguments to run inside the PTY
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Build from an argv-style vector, stripping a leading `--`
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let argv = match argv.first() {
            Some(first) if first == "--" => &argv[1..],
            _ => argv,
        };
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// File name of the program, used as the reported program name
    pub fn program_name(&self) -> &str {
        std::path::Path::new(&self.program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.program)
    }
}

/// Master side of the PTY: the child's terminal as seen from the proxy
pub struct PtyMaster {
    master: Box<dyn MasterPty + Send>,
    reader: Box<dyn Read + Send>,
    writer: Box<dyn Write + Send>,
    fd: RawFd,
}

impl PtyMaster {
    /// Descriptor to poll for child output
    pub fn as_fd(&self) -> BorrowedFd<'_> {
        // SAFETY: `fd` belongs to `self.master`, which lives as long as `self`
        unsafe { BorrowedFd::borrow_raw(self.fd) }
    }

    /// Read child output; `Ok(0)` means the child side is gone
    ///
    /// Linux reports a closed slave as `EIO` rather than end-of-file.
    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.reader.read(buf) {
            Err(e) if e.raw_os_error() == Some(libc::EIO) => Ok(0),
            other => other,
        }
    }

    /// Forward input bytes to the child verbatim
    pub fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data)?;
        self.writer.flush()
    }

    /// Propagate a terminal size change to the child
    pub fn resize(&self, rows: u16, cols: u16) -> Result<()> {
        self.master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .context("Failed to resize PTY")
    }
}

/// Handle to the spawned child process
pub struct PtyChild {
    child: Box<dyn Child + Send + Sync>,
    pid: u32,
}

impl PtyChild {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Forward a signal to the child process
    pub fn signal(&self, sig: Signal) -> Result<()> {
        if self.pid > 0 {
            signal::kill(Pid::from_raw(self.pid as i32), sig)
                .context("Failed to forward signal")?;
        }
        Ok(())
    }

    /// Wait for the child to exit, killing it if it outlives `grace`
    ///
    /// Returns `None` when the status could not be collected (already reaped
    /// or never observable); callers treat that as a finished child.
    pub fn reap(&mut self, grace: Duration) -> Option<ExitStatus> {
        let deadline = Instant::now() + grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => return Some(status),
                Ok(None) if Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(10));
                }
                Ok(None) => {
                    tracing::debug!("Child {} still running after {:?}, killing", self.pid, grace);
                    if let Err(e) = self.child.kill() {
                        tracing::debug!("Failed to kill child: {}", e);
                    }
                    return match self.child.wait() {
                        Ok(status) => Some(status),
                        Err(e) => {
                            tracing::debug!("Failed to wait for child: {}", e);
                            None
                        }
                    };
                }
                Err(e) => {
                    tracing::debug!("Failed to poll child status: {}", e);
                    return None;
                }
            }
        }
    }
}

/// Open a PTY of the given size and spawn `spec` on it
pub fn spawn(spec: &CommandSpec, rows: u16, cols: u16) -> Result<(PtyChild, PtyMaster)> {
    let pty_system = native_pty_system();
    let pair = pty_system
        .openpty(PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        })
        .context("Failed to open PTY")?;

    let mut cmd = CommandBuilder::new(&spec.program);
    cmd.args(&spec.args);
    if let Ok(cwd) = std::env::current_dir() {
        cmd.cwd(cwd);
    }

    let child = pair
        .slave
        .spawn_command(cmd)
        .with_context(|| format!("Failed to spawn {}", spec.program))?;
    // Only the child keeps the slave open, so its exit closes the master
    drop(pair.slave);

    let pid = child.process_id().unwrap_or(0);
    tracing::debug!("Spawned {} with PID {}", spec.program, pid);

    let reader = pair
        .master
        .try_clone_reader()
        .context("Failed to clone PTY reader")?;
    let writer = pair
        .master
        .take_writer()
        .context("Failed to take PTY writer")?;
    let fd = pair
        .master
        .as_raw_fd()
        .context("PTY master has no file descriptor")?;

    Ok((
        PtyChild { child, pid },
        PtyMaster {
            master: pair.master,
            reader,
            writer,
            fd,
        },
    ))
}
