use std::time::{Duration, Instant};

use super::assembler::LineAssembler;
use super::classifier::Classifier;
use super::sanitize::{CarriageReturns, Sanitizer};

/// Classifier and assembler wired together for one session
#[derive(Debug, Default)]
pub struct InputPipeline {
    classifier: Classifier,
    assembler: LineAssembler,
}

impl InputPipeline {
    pub fn new(paste_threshold: Duration, carriage_returns: CarriageReturns) -> Self {
        Self {
            classifier: Classifier::new(paste_threshold),
            assembler: LineAssembler::new(Sanitizer::new(carriage_returns)),
        }
    }

    /// Feed one chunk read from the terminal at `now`
    ///
    /// Bytes are processed in order; returns every line finalized by the chunk.
    pub fn feed(&mut self, chunk: &[u8], now: Instant) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            let classification = self.classifier.classify(byte, now);
            if let Some(line) = self.assembler.apply(classification.class, byte) {
                lines.push(line);
            }
        }
        lines
    }

    /// Text typed since the last finalized line
    pub fn pending_line(&self) -> &str {
        self.assembler.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GAP: Duration = Duration::from_millis(30);

    /// Feed each byte as its own read, `gap` apart
    fn type_slowly(pipeline: &mut InputPipeline, bytes: &[u8], start: Instant) -> (Vec<String>, Instant) {
        let mut now = start;
        let mut lines = Vec::new();
        for &b in bytes {
            now += GAP;
            lines.extend(pipeline.feed(&[b], now));
        }
        (lines, now)
    }

    #[test]
    fn test_typed_line() {
        let mut pipeline = InputPipeline::default();
        let (lines, _) = type_slowly(&mut pipeline, b"echo hi\r", Instant::now());
        assert_eq!(lines, vec!["echo hi".to_string()]);
    }

    #[test]
    fn test_one_line_per_enter() {
        let mut pipeline = InputPipeline::default();
        let (lines, _) = type_slowly(&mut pipeline, b"ls\rpwdd\x7f\r\rcd /\n", Instant::now());
        assert_eq!(lines, vec!["ls", "pwd", "cd /"]);
    }

    #[test]
    fn test_pasted_bytes_do_not_submit() {
        let mut pipeline = InputPipeline::default();
        let t0 = Instant::now();

        // Whole paste arrives in one read; only the first byte sees a gap
        let lines = pipeline.feed(b"echo hi\rline two\n", t0);
        assert!(lines.is_empty());
        assert_eq!(pipeline.pending_line(), "echo hi\rline two\n");

        // A slow Enter submits the accumulated buffer; the pasted CR is stripped
        let lines = pipeline.feed(b"\r", t0 + GAP);
        assert_eq!(lines, vec!["echo hiline two\n".to_string()]);
    }

    #[test]
    fn test_fast_bytes_across_reads_are_paste() {
        let mut pipeline = InputPipeline::default();
        let t0 = Instant::now();
        let mut now = t0;
        for &b in b"echo hi\r" {
            now += Duration::from_millis(1);
            assert!(pipeline.feed(&[b], now).is_empty());
        }
        let lines = pipeline.feed(b"\r", now + GAP);
        assert_eq!(lines, vec!["echo hi".to_string()]);
    }

    #[test]
    fn test_keep_carriage_returns() {
        let mut pipeline = InputPipeline::new(Duration::from_millis(5), CarriageReturns::Keep);
        let t0 = Instant::now();
        pipeline.feed(b"a\rb", t0);
        let lines = pipeline.feed(b"\r", t0 + GAP);
        assert_eq!(lines, vec!["a\rb".to_string()]);
    }

    #[test]
    fn test_normalized_carriage_returns_keep_paste_lines() {
        let mut pipeline =
            InputPipeline::new(Duration::from_millis(5), CarriageReturns::Normalize);
        let t0 = Instant::now();
        pipeline.feed(b"one\rtwo\r\nthree", t0);
        let lines = pipeline.feed(b"\r", t0 + GAP);
        assert_eq!(lines, vec!["one\ntwo\nthree".to_string()]);
    }

    #[test]
    fn test_bracketed_paste_then_enter() {
        let mut pipeline = InputPipeline::default();
        let t0 = Instant::now();
        pipeline.feed(b"\x1b[200~first\nsecond\x1b[201~", t0);
        let lines = pipeline.feed(b"\r", t0 + GAP);
        assert_eq!(lines, vec!["first\nsecond".to_string()]);
    }
}
