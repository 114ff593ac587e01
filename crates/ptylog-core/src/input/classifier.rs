//! Byte classifier with paste detection
//!
//! A human cannot press keys less than a few milliseconds apart, so bytes
//! arriving faster than [`DEFAULT_PASTE_THRESHOLD`] are treated as pasted and
//! any Enter byte among them is kept as content.

use std::time::{Duration, Instant};

/// Default inter-byte gap below which input counts as a paste burst
pub const DEFAULT_PASTE_THRESHOLD: Duration = Duration::from_millis(5);

const LF: u8 = b'\n';
const CR: u8 = b'\r';
const BS: u8 = 0x08;
const DEL: u8 = 0x7f;

/// What a single input byte means for the line being assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteClass {
    /// A real Enter keypress that submits the line
    PhysicalEnter,
    /// Backspace or delete
    Erase,
    /// Anything else, including pasted newlines
    Content,
}

/// Result of classifying one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub class: ByteClass,
    pub is_paste_burst: bool,
}

/// Stateful classifier holding the byte timing state
#[derive(Debug)]
pub struct Classifier {
    threshold: Duration,
    last_byte: Option<Instant>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_PASTE_THRESHOLD)
    }
}

impl Classifier {
    /// Create a classifier with a custom paste threshold
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_byte: None,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Classify `byte` received at `now`
    ///
    /// The elapsed time is measured against the previous call; the first byte
    /// of a session has no known gap and is never part of a paste burst.
    pub fn classify(&mut self, byte: u8, now: Instant) -> Classification {
        let dt = self.last_byte.map(|prev| now.saturating_duration_since(prev));
        self.last_byte = Some(now);
        classify_byte(byte, dt, self.threshold)
    }
}

/// Classify a byte given the gap since the previous byte
pub fn classify_byte(byte: u8, dt: Option<Duration>, threshold: Duration) -> Classification {
    let is_paste_burst = matches!(dt, Some(gap) if gap < threshold);

    let class = match byte {
        LF | CR if !is_paste_burst => ByteClass::PhysicalEnter,
        BS | DEL => ByteClass::Erase,
        _ => ByteClass::Content,
    };

    Classification {
        class,
        is_paste_burst,
    }
}
