//! Anti-loop guard — stops the model from retrying the same failing call.

use std::collections::HashMap;
use tracing::warn;

/// Counts identical tool errors within one turn.
#[derive(Debug, Clone)]
pub struct AntiLoopGuard {
    threshold: u32,
    counts: HashMap<String, u32>,
}

impl AntiLoopGuard {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            counts: HashMap::new(),
        }
    }

    /// Record an error. Returns the text to surface to the model: the error
    /// itself, or an intervention once the threshold is reached.
    pub fn observe(&mut self, tool_name: &str, error: &str) -> Option<String> {
        let key = error.trim().to_string();
        let count = self.counts.entry(key).or_insert(0);
        *count += 1;
        if *count < self.threshold {
            return None;
        }

        warn!(
            tool = tool_name,
            occurrences = *count,
            error = error.trim(),
            "Anti-loop guard intervened"
        );
        Some(intervention(tool_name, error.trim(), *count))
    }
}

fn intervention(tool_name: &str, error: &str, count: u32) -> String {
    format!(
        "STOP. '{tool_name}' has failed with the same error {count} times in this turn: \
         {error}\nDo not retry this call. Tell the user what you were trying to do, \
         what went wrong, and ask how they want to proceed."
    )
}
