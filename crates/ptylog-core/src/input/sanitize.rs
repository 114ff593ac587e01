//! Text sanitizer for finalized lines
//!
//! Removes bracketed-paste markers and CSI escape sequences so the reported
//! text is what the user meant, not the raw control bytes the terminal sent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Emitted by the terminal before pasted text when bracketed paste is on
pub const PASTE_START: &str = "\x1b[200~";
/// Emitted by the terminal after pasted text
pub const PASTE_END: &str = "\x1b[201~";

/// ESC `[`, parameter bytes 0x30-0x3F, intermediate bytes 0x20-0x2F, final byte 0x40-0x7E
static CSI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]").unwrap());

/// What to do with literal carriage returns left in a finalized line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarriageReturns {
    /// Remove every `\r`
    #[default]
    Strip,
    /// Leave `\r` in place
    Keep,
    /// Turn `\r\n` and lone `\r` into `\n`, keeping pasted line breaks
    Normalize,
}

/// Line sanitizer
#[derive(Debug, Clone, Copy, Default)]
pub struct Sanitizer {
    carriage_returns: CarriageReturns,
}

impl Sanitizer {
    pub fn new(carriage_returns: CarriageReturns) -> Self {
        Self { carriage_returns }
    }

    /// Clean a finalized line
    ///
    /// Paste markers go first, then CSI sequences, then carriage returns. The
    /// passes repeat until nothing changes: removing a sequence can splice an
    /// `ESC` and a `[` into a new one, and the result must be stable under a
    /// second call.
    pub fn sanitize(&self, raw: &str) -> String {
        let mut text = raw.to_string();
        loop {
            let next = self.pass(&text);
            if next == text {
                return next;
            }
            text = next;
        }
    }

    fn pass(&self, text: &str) -> String {
        let text = text.replace(PASTE_START, "").replace(PASTE_END, "");
        let text = CSI_RE.replace_all(&text, "");
        match self.carriage_returns {
            CarriageReturns::Strip => text.replace('\r', ""),
            CarriageReturns::Keep => text.into_owned(),
            CarriageReturns::Normalize => text.replace("\r\n", "\n").replace('\r', "\n"),
        }
    }
}

/// Sanitize with the default policy (carriage returns stripped)
pub fn sanitize(raw: &str) -> String {
    Sanitizer::default().sanitize(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(sanitize("cargo build --release"), "cargo build --release");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_strip_paste_markers() {
        assert_eq!(sanitize("\x1b[200~hello\x1b[201~"), "hello");
        assert_eq!(sanitize("a\x1b[201~b\x1b[200~c"), "abc");
    }

    #[test]
    fn test_strip_csi() {
        assert_eq!(sanitize("\x1b[31mred\x1b[0m"), "red");
        assert_eq!(sanitize("up\x1b[Adown\x1b[B"), "updown");
        assert_eq!(sanitize("\x1b[?2004h\x1b[1;5Cword"), "word");
        // Intermediate byte before the final byte
        assert_eq!(sanitize("x\x1b[1 qy"), "xy");
    }

    #[test]
    fn test_lone_escape_is_kept() {
        // Not a CSI sequence, nothing to remove
        assert_eq!(sanitize("\x1bOA"), "\x1bOA");
        assert_eq!(sanitize("tail\x1b["), "tail\x1b[");
    }

    #[test]
    fn test_carriage_returns() {
        assert_eq!(sanitize("line1\r\nline2\r"), "line1\nline2");
        let keep = Sanitizer::new(CarriageReturns::Keep);
        assert_eq!(keep.sanitize("line1\r\nline2"), "line1\r\nline2");
        let normalize = Sanitizer::new(CarriageReturns::Normalize);
        assert_eq!(normalize.sanitize("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_idempotent_on_spliced_sequences() {
        let samples = [
            "\x1b\x1b[0m[A",
            "\x1b[20\x1b[201~0~text",
            "\x1b\r[31mx",
            "plain\nmulti\nline",
            "\x1b[\x1b[Am",
        ];
        for policy in [
            CarriageReturns::Strip,
            CarriageReturns::Keep,
            CarriageReturns::Normalize,
        ] {
            let sanitizer = Sanitizer::new(policy);
            for s in samples {
                let once = sanitizer.sanitize(s);
                assert_eq!(sanitizer.sanitize(&once), once, "input {:?}", s);
            }
        }
        assert_eq!(sanitize("\x1b\x1b[0m[A"), "");
    }

    #[test]
    fn test_policy_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            cr: CarriageReturns,
        }
        let w: Wrapper = serde_json::from_str(r#"{"cr":"keep"}"#).unwrap();
        assert_eq!(w.cr, CarriageReturns::Keep);
    }
}
