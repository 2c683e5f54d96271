//! Diff engine for network resources
//!
//! This module provides:
//! - [`ResourceModule`], the want/have comparison that emits device commands
//! - Before/after fact diffs rendered as unified text, with statistics and
//!   optional terminal colors
//!
//! # Example
//!
//! ```rust
//! use netres::diff::facts_diff;
//! use serde_json::json;
//!
//! let diff = facts_diff(&json!({"hostname": "a"}), &json!({"hostname": "b"})).unwrap();
//! assert!(diff.text.contains("-hostname: a"));
//! assert!(diff.text.contains("+hostname: b"));
//! assert_eq!(diff.stats.insertions, 1);
//! ```

mod compare;
mod stats;

pub use compare::ResourceModule;
pub use stats::DiffStats;

use colored::Colorize;
use similar::{ChangeTag, TextDiff};

use crate::error::Result;

/// Unified diff between two fact sets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactsDiff {
    /// Unified diff text, empty when the facts are equal
    pub text: String,
    pub stats: DiffStats,
}

impl FactsDiff {
    pub fn has_changes(&self) -> bool {
        self.stats.has_changes()
    }
}

/// Diff the YAML renderings of `before` and `after`
pub fn facts_diff(before: &serde_json::Value, after: &serde_json::Value) -> Result<FactsDiff> {
    let before = serde_yaml::to_string(before)?;
    let after = serde_yaml::to_string(after)?;
    Ok(text_diff(&before, &after, 3))
}

/// Unified diff of two texts labelled `before` and `after`
pub fn text_diff(before: &str, after: &str, context_lines: usize) -> FactsDiff {
    let diff = TextDiff::from_lines(before, after);

    let mut stats = DiffStats::new();
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => stats.insertions += 1,
            ChangeTag::Delete => stats.deletions += 1,
            ChangeTag::Equal => {}
        }
    }

    if !stats.has_changes() {
        return FactsDiff {
            text: String::new(),
            stats,
        };
    }

    let mut unified = diff.unified_diff();
    unified.context_radius(context_lines).header("before", "after");
    stats.hunks = unified.iter_hunks().count();

    FactsDiff {
        text: unified.to_string(),
        stats,
    }
}

/// Color a unified diff for terminal output
pub fn colorize(diff: &str) -> String {
    diff.lines()
        .map(|line| {
            if line.starts_with("---") {
                line.red().bold().to_string()
            } else if line.starts_with("+++") {
                line.green().bold().to_string()
            } else if line.starts_with("@@") {
                line.cyan().to_string()
            } else if line.starts_with('-') {
                line.red().to_string()
            } else if line.starts_with('+') {
                line.green().to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
