//! Line assembler
//!
//! Keeps the in-progress line for the session. Bytes are decoded as UTF-8
//! incrementally so multi-byte characters typed one byte per read still come
//! out whole, and malformed sequences become U+FFFD instead of failing.

use std::char::REPLACEMENT_CHARACTER;

use super::classifier::ByteClass;
use super::sanitize::Sanitizer;

/// Accumulates classified bytes into logical lines
#[derive(Debug, Default)]
pub struct LineAssembler {
    /// Decoded characters of the current line
    line: String,
    /// Bytes of a multi-byte character that is not complete yet
    pending: Vec<u8>,
    sanitizer: Sanitizer,
}

impl LineAssembler {
    pub fn new(sanitizer: Sanitizer) -> Self {
        Self {
            line: String::new(),
            pending: Vec::with_capacity(4),
            sanitizer,
        }
    }

    /// Apply one classified byte
    ///
    /// Returns the sanitized line when `class` is a physical Enter and the
    /// buffer held something.
    pub fn apply(&mut self, class: ByteClass, byte: u8) -> Option<String> {
        match class {
            ByteClass::Content => {
                self.push_byte(byte);
                None
            }
            ByteClass::Erase => {
                self.erase();
                None
            }
            ByteClass::PhysicalEnter => self.finalize(),
        }
    }

    /// Current (unsanitized) contents of the line buffer
    pub fn current(&self) -> &str {
        &self.line
    }

    pub fn is_empty(&self) -> bool {
        self.line.is_empty() && self.pending.is_empty()
    }

    fn push_byte(&mut self, byte: u8) {
        self.pending.push(byte);

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(s) => {
                    self.line.push_str(s);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    self.line
                        .push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            self.line.push(REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                            if self.pending.is_empty() {
                                return;
                            }
                        }
                        // Incomplete sequence, wait for more bytes
                        None => {
                            self.pending.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }

    fn erase(&mut self) {
        if !self.pending.is_empty() {
            self.pending.clear();
        } else {
            self.line.pop();
        }
    }

    fn finalize(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            self.line.push(REPLACEMENT_CHARACTER);
            self.pending.clear();
        }
        if self.line.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.line);
        Some(self.sanitizer.sanitize(&raw))
    }
}
