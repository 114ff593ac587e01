//! Shutdown and resize intent
//!
//! Handlers registered here store into atomics and then write a byte to a
//! self-pipe. The event loop polls the pipe's read end next to its other
//! descriptors, so a signal wakes it whichever thread the kernel delivered it
//! to, and all cleanup still happens on the loop thread.

use std::io::{self, Read};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM, SIGWINCH};
use signal_hook::SigId;

/// Signals that end the session
pub const TERMINATION_SIGNALS: [i32; 3] = [SIGINT, SIGTERM, SIGHUP];

/// Flags set by signal handlers for the lifetime of a session
pub struct SessionSignals {
    /// Number of the termination signal received, 0 if none
    terminate: Arc<AtomicUsize>,
    resize: Arc<AtomicBool>,
    /// Read end of the self-pipe; readable after any handled signal
    wake: UnixStream,
    ids: Vec<SigId>,
}

impl SessionSignals {
    /// Install handlers for termination and window-size signals
    pub fn register() -> Result<Self> {
        let terminate = Arc::new(AtomicUsize::new(0));
        let resize = Arc::new(AtomicBool::new(false));
        let (wake, notify) = UnixStream::pair().context("Failed to create signal wake pipe")?;
        wake.set_nonblocking(true)
            .context("Failed to configure signal wake pipe")?;

        let mut ids = Vec::with_capacity(2 * (TERMINATION_SIGNALS.len() + 1));

        // Actions for one signal run in registration order: the flag is set
        // before the pipe wakes the loop
        for sig in TERMINATION_SIGNALS {
            let id = signal_hook::flag::register_usize(sig, terminate.clone(), sig as usize)
                .with_context(|| format!("Failed to register handler for signal {}", sig))?;
            ids.push(id);
            ids.push(register_wake(sig, &notify)?);
        }
        ids.push(
            signal_hook::flag::register(SIGWINCH, resize.clone())
                .context("Failed to register SIGWINCH handler")?,
        );
        ids.push(register_wake(SIGWINCH, &notify)?);

        Ok(Self {
            terminate,
            resize,
            wake,
            ids,
        })
    }

    /// Descriptor that becomes readable when a signal was handled
    pub fn wake_fd(&self) -> BorrowedFd<'_> {
        self.wake.as_fd()
    }

    /// Consume pending wake-up bytes
    pub fn drain(&self) {
        let mut buf = [0u8; 64];
        loop {
            match (&self.wake).read(&mut buf) {
                Ok(0) => return,
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    if e.kind() != io::ErrorKind::WouldBlock {
                        tracing::debug!("Signal wake pipe read failed: {}", e);
                    }
                    return;
                }
            }
        }
    }

    /// Termination signal received so far, if any
    pub fn termination(&self) -> Option<i32> {
        match self.terminate.load(Ordering::Acquire) {
            0 => None,
            sig => Some(sig as i32),
        }
    }

    /// Whether the window size changed since the last call
    pub fn take_resize(&self) -> bool {
        self.resize.swap(false, Ordering::AcqRel)
    }
}

fn register_wake(sig: i32, notify: &UnixStream) -> Result<SigId> {
    let notify = notify
        .try_clone()
        .context("Failed to clone signal wake pipe")?;
    signal_hook::low_level::pipe::register(sig, notify)
        .with_context(|| format!("Failed to register wake-up for signal {}", sig))
}

impl Drop for SessionSignals {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            signal_hook::low_level::unregister(id);
        }
    }
}
