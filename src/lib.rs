pub mod config;
pub mod logging;
pub mod sinks;
pub mod wrap;
