//! Input line tracking
//!
//! Bytes typed on the real terminal pass through three stages before a line
//! is reported: the [`Classifier`] tags each byte using inter-byte timing, the
//! [`LineAssembler`] edits the in-progress line, and the [`Sanitizer`] cleans
//! the finalized text.

pub mod assembler;
pub mod classifier;
pub mod pipeline;
pub mod sanitize;

pub use assembler::LineAssembler;
pub use classifier::{ByteClass, Classification, Classifier, DEFAULT_PASTE_THRESHOLD};
pub use pipeline::InputPipeline;
pub use sanitize::{sanitize, CarriageReturns, Sanitizer};
