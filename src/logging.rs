//! Log file setup
//!
//! The wrapped program owns the terminal, so logs never go to stdout/stderr.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE: &str = "ptylog.log";

/// Get the base state directory, preferring XDG_RUNTIME_DIR for security
pub fn state_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_RUNTIME_DIR") {
        PathBuf::from(xdg).join("ptylog")
    } else {
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/tmp/ptylog-{}", uid))
    }
}

/// Default log file location
pub fn default_log_path() -> PathBuf {
    state_dir().join(LOG_FILE)
}

pub fn setup_logging(debug: bool, log_file: Option<&Path>) {
    let filter = if debug {
        EnvFilter::new("ptylog=debug,ptylog_core=debug")
    } else {
        EnvFilter::new("ptylog=info,ptylog_core=info")
    };

    let path = log_file
        .map(Path::to_path_buf)
        .unwrap_or_else(default_log_path);
    let writer = match open_log(&path) {
        Some(file) => BoxMakeWriter::new(Mutex::new(file)),
        // Logging is best-effort; a session must not fail over it
        None => BoxMakeWriter::new(std::io::sink),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();
}

fn open_log(path: &Path) -> Option<fs::File> {
    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("Failed to create log directory: {}", e);
            return None;
        }
    }

    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Failed to open log file {:?}: {}", path, e);
            None
        }
    }
}
