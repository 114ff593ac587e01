//! Event loop multiplexing terminal input and child output

use std::io::{self, Read, Write};
use std::os::fd::AsFd;
use std::time::Instant;

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use super::signals::SessionSignals;
use super::{LoopExit, Session};
use crate::terminal;

/// Bytes read from the terminal per wake
const INPUT_CHUNK: usize = 1024;
/// Bytes read from the child per wake
const OUTPUT_CHUNK: usize = 4096;

fn is_readable(fd: &PollFd<'_>) -> bool {
    fd.revents().is_some_and(|r| {
        r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR)
    })
}

impl Session {
    pub(super) fn event_loop<W: Write>(
        &mut self,
        output: &mut W,
        signals: &SessionSignals,
    ) -> Result<LoopExit> {
        let mut input_buf = [0u8; INPUT_CHUNK];
        let mut output_buf = [0u8; OUTPUT_CHUNK];

        loop {
            let (input_ready, output_ready, woken) = {
                let mut fds = [
                    PollFd::new(self.input.as_fd(), PollFlags::POLLIN),
                    PollFd::new(self.master.as_fd(), PollFlags::POLLIN),
                    PollFd::new(signals.wake_fd(), PollFlags::POLLIN),
                ];
                match poll(&mut fds, PollTimeout::NONE) {
                    Ok(_) => {}
                    // The wake pipe stays readable, the next poll returns at once
                    Err(Errno::EINTR) => continue,
                    Err(e) => return Err(e).context("poll failed"),
                }
                (is_readable(&fds[0]), is_readable(&fds[1]), is_readable(&fds[2]))
            };

            if woken {
                signals.drain();
            }
            // Checked on every wake, before any I/O is handled
            if let Some(sig) = signals.termination() {
                tracing::info!("Received signal {}, shutting down", sig);
                return Ok(LoopExit::Signal(sig));
            }
            if signals.take_resize() {
                self.sync_window_size();
            }

            if input_ready {
                let n = match (&self.input).read(&mut input_buf) {
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e).context("Failed to read terminal input"),
                };
                if n == 0 {
                    tracing::debug!("Terminal input closed");
                    return Ok(LoopExit::InputClosed);
                }
                let chunk = &input_buf[..n];

                // The child always gets the raw bytes, whatever they classify as
                if let Err(e) = self.master.write_all(chunk) {
                    tracing::debug!("PTY write error: {}", e);
                    return Ok(LoopExit::ChildExited);
                }
                for line in self.pipeline.feed(chunk, Instant::now()) {
                    self.reporter.submit(line);
                }
            }

            if output_ready {
                let n = match self.master.read(&mut output_buf) {
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        tracing::debug!("PTY read error: {}", e);
                        return Ok(LoopExit::ChildExited);
                    }
                };
                if n == 0 {
                    tracing::debug!("Child closed its terminal");
                    return Ok(LoopExit::ChildExited);
                }
                output
                    .write_all(&output_buf[..n])
                    .and_then(|_| output.flush())
                    .context("Failed to write child output")?;
            }
        }
    }

    fn sync_window_size(&self) {
        let Some((rows, cols)) = terminal::window_size(&self.input) else {
            return;
        };
        match self.master.resize(rows, cols) {
            Ok(()) => tracing::debug!("Resized PTY to {}x{}", cols, rows),
            Err(e) => tracing::debug!("{:#}", e),
        }
    }
}
