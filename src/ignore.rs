// src/ignore.rs

//! Ignore rules for dependency and file admission
//!
//! An ignore rule is a glob pattern matched against a candidate's file
//! name (and, for path-shaped patterns, against its full path). Rules
//! are consulted before a dependency enters a package map and before a
//! file is mirrored by the copy engine, so an ignored entry never
//! reaches the output tree or the ledger.

use glob::{MatchOptions, Pattern};
use std::path::Path;
use tracing::warn;

/// A set of glob-based ignore rules
#[derive(Debug, Default, Clone)]
pub struct IgnoreRuleSet {
    rules: Vec<Pattern>,
}

impl IgnoreRuleSet {
    /// Build a rule set from pattern strings. Invalid patterns are
    /// logged and dropped rather than failing the whole run.
    pub fn new(patterns: &[String]) -> Self {
        let mut rules = Vec::with_capacity(patterns.len());
        for raw in patterns {
            match Pattern::new(raw) {
                Ok(pattern) => rules.push(pattern),
                Err(e) => warn!("ignore pattern {:?} is invalid: {}", raw, e),
            }
        }
        Self { rules }
    }

    /// True when no rules are configured
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check whether a path is excluded by any rule.
    ///
    /// Patterns without a separator match the file name only; patterns
    /// containing a separator match the full path. Matching is
    /// case-insensitive so Windows-style names behave as expected.
    pub fn matches(&self, path: &Path) -> bool {
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        let full = path.to_string_lossy();

        self.rules.iter().any(|rule| {
            if rule.as_str().contains('/') {
                rule.matches_with(&full, options)
            } else {
                rule.matches_with(&name, options)
            }
        })
    }
}
