/// Finalized lines waiting for a single batched delivery
#[derive(Debug)]
pub struct PendingBatch {
    lines: Vec<String>,
    threshold: usize,
}

impl PendingBatch {
    /// Create a batch that fills after `threshold` lines (minimum 1)
    pub fn new(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            lines: Vec::with_capacity(threshold),
            threshold,
        }
    }

    /// Add a line; returns the full batch once the threshold is reached
    pub fn push(&mut self, line: String) -> Option<Vec<String>> {
        self.lines.push(line);
        if self.lines.len() >= self.threshold {
            Some(self.take())
        } else {
            None
        }
    }

    /// Drain whatever is pending, even under the threshold
    pub fn take(&mut self) -> Vec<String> {
        std::mem::replace(&mut self.lines, Vec::with_capacity(self.threshold))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}
