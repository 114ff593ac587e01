//! Core library for ptylog
//!
//! Runs an interactive program inside a PTY, forwards its I/O untouched and
//! turns the user's keystrokes into finalized lines that are handed off to a
//! [`report::ReportSink`].

pub mod error;
pub mod input;
pub mod pty;
pub mod report;
pub mod session;
pub mod terminal;

pub use error::DeliveryError;
pub use session::{Session, SessionConfig, SessionOutcome};
