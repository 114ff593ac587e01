//! Terminal mode controller
//!
//! Puts the controlling terminal into raw mode for the session and restores
//! the saved attributes exactly once, whichever way the session ends.

use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use nix::sys::termios::{self, SetArg, Termios};

/// Raw-mode guard for one terminal descriptor
///
/// Holds the attributes captured before raw mode was applied. When capture
/// failed (input is not a tty) the guard is inert and restoring is a no-op.
#[derive(Debug)]
pub struct TerminalMode {
    fd: RawFd,
    saved: Option<Termios>,
}

impl TerminalMode {
    /// Capture the current attributes of `fd` and switch it to raw mode
    ///
    /// Never fails: if the attributes cannot be read or set, the session
    /// continues without raw mode.
    pub fn enter_raw(fd: BorrowedFd<'_>) -> Self {
        let saved = match termios::tcgetattr(fd) {
            Ok(attrs) => attrs,
            Err(e) => {
                tracing::debug!("Terminal attributes unavailable, skipping raw mode: {}", e);
                return Self {
                    fd: fd.as_raw_fd(),
                    saved: None,
                };
            }
        };

        let mut raw = saved.clone();
        termios::cfmakeraw(&mut raw);
        if let Err(e) = termios::tcsetattr(fd, SetArg::TCSANOW, &raw) {
            tracing::warn!("Failed to enter raw mode: {}", e);
            return Self {
                fd: fd.as_raw_fd(),
                saved: None,
            };
        }

        Self {
            fd: fd.as_raw_fd(),
            saved: Some(saved),
        }
    }

    /// Whether raw mode was actually applied
    pub fn is_raw(&self) -> bool {
        self.saved.is_some()
    }

    /// Restore the saved attributes
    pub fn restore(mut self) {
        self.restore_inner();
    }

    fn restore_inner(&mut self) {
        let Some(saved) = self.saved.take() else {
            return;
        };
        // SAFETY: the descriptor outlives the session that owns this guard
        let fd = unsafe { BorrowedFd::borrow_raw(self.fd) };
        if let Err(e) = termios::tcsetattr(fd, SetArg::TCSADRAIN, &saved) {
            tracing::warn!("Failed to restore terminal attributes: {}", e);
        }
    }
}

impl Drop for TerminalMode {
    fn drop(&mut self) {
        self.restore_inner();
    }
}

/// Get the size of the terminal behind `fd` as (rows, cols)
pub fn window_size(fd: impl AsFd) -> Option<(u16, u16)> {
    let mut size: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(fd.as_fd().as_raw_fd(), libc::TIOCGWINSZ, &mut size) };

    if result == 0 && size.ws_row > 0 && size.ws_col > 0 {
        Some((size.ws_row, size.ws_col))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_non_tty_skips_raw_mode() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"not a terminal").unwrap();

        let mode = TerminalMode::enter_raw(file.as_fd());
        assert!(!mode.is_raw());
        // No-op, must not panic
        mode.restore();
    }

    #[test]
    fn test_window_size_of_regular_file() {
        let file = tempfile::tempfile().unwrap();
        assert_eq!(window_size(&file), None);
    }
}
