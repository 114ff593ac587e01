//! PTY wrapping module
//!
//! Turns settings into a core session and runs the wrapped program.

pub mod runner;

pub use runner::{resolve_identifier, WrapRunner};
