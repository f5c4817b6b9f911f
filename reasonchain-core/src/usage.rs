//! Per-request token accounting.

use serde::{Deserialize, Serialize};

/// Token usage reported back to the caller.
///
/// Only [`UsageAccumulator::finish`] builds one, so `total_tokens` is always
/// the sum of the two stage counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub reasoning_tokens: u64,
    pub summary_tokens: u64,
    pub total_tokens: u64,
}

/// Collects stage token counts for one request.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageAccumulator {
    reasoning: u64,
    summary: u64,
}

impl UsageAccumulator {
    pub fn record_reasoning(&mut self, tokens: u64) {
        self.reasoning = self.reasoning.saturating_add(tokens);
    }

    pub fn record_summary(&mut self, tokens: u64) {
        self.summary = self.summary.saturating_add(tokens);
    }

    pub fn finish(self) -> Usage {
        Usage {
            reasoning_tokens: self.reasoning,
            summary_tokens: self.summary,
            total_tokens: self.reasoning.saturating_add(self.summary),
        }
    }
}
