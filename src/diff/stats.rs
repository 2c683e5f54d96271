//! Line statistics for before/after fact diffs.

use colored::Colorize;
use std::fmt;

/// Statistics about a facts diff
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffStats {
    /// Number of lines only in `after`
    pub insertions: usize,
    /// Number of lines only in `before`
    pub deletions: usize,
    /// Number of hunks in the unified diff
    pub hunks: usize,
}

impl DiffStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_changes(&self) -> bool {
        self.insertions > 0 || self.deletions > 0
    }

    pub fn total_changes(&self) -> usize {
        self.insertions + self.deletions
    }

    /// Format as a colored short summary
    pub fn short_summary_colored(&self) -> String {
        format!(
            "{} {}",
            format!("+{}", self.insertions).green(),
            format!("-{}", self.deletions).red()
        )
    }
}

impl fmt::Display for DiffStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} insertion{}(+), {} deletion{}(-)",
            self.insertions,
            if self.insertions == 1 { "" } else { "s" },
            self.deletions,
            if self.deletions == 1 { "" } else { "s" }
        )
    }
}
