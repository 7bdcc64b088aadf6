//! Token usage accounting across extraction requests.

use std::fmt;

use crate::client::Usage;

/// Running totals plus per-request history.
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    total: Usage,
    history: Vec<Usage>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one request's usage. Providers that omit usage count as zero.
    pub fn record(&mut self, usage: Option<Usage>) {
        let usage = usage.unwrap_or_default();
        self.total.prompt_tokens += usage.prompt_tokens;
        self.total.completion_tokens += usage.completion_tokens;
        self.total.total_tokens += usage.total_tokens;
        self.history.push(usage);
    }

    pub fn total(&self) -> Usage {
        self.total
    }

    pub fn requests(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &[Usage] {
        &self.history
    }

    /// Human-readable usage report.
    pub fn show_usage(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for UsageTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Token Usage Summary ===")?;
        writeln!(f, "{:<12} {:>12}", "Type", "Count")?;
        writeln!(f, "{}", "-".repeat(25))?;
        writeln!(f, "{:<12} {:>12}", "Completion", self.total.completion_tokens)?;
        writeln!(f, "{:<12} {:>12}", "Prompt", self.total.prompt_tokens)?;
        writeln!(f, "{:<12} {:>12}", "Total", self.total.total_tokens)?;

        if self.history.is_empty() {
            return Ok(());
        }

        writeln!(f)?;
        writeln!(f, "=== Usage History ===")?;
        writeln!(
            f,
            "{:<10} {:>12} {:>12} {:>12}",
            "Request #", "Completion", "Prompt", "Total"
        )?;
        writeln!(f, "{}", "-".repeat(49))?;
        for (i, usage) in self.history.iter().enumerate() {
            writeln!(
                f,
                "{:<10} {:>12} {:>12} {:>12}",
                i + 1,
                usage.completion_tokens,
                usage.prompt_tokens,
                usage.total_tokens
            )?;
        }
        Ok(())
    }
}
