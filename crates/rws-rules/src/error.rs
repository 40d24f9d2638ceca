//! Error types for the rws-rules crate.
//!
//! This module provides the [`RuleError`] type reported while compiling or
//! validating rule text. Both variants are shown to the rule author as-is, so
//! their `Display` output is always a single line.

/// Errors produced while compiling rule text.
///
/// # Examples
///
/// ```
/// use rws_rules::{RuleError, RuleSet};
///
/// let err = RuleSet::compile("src/\n(unclosed").unwrap_err();
/// match err {
///     RuleError::PatternSyntax { line, .. } => assert_eq!(line, 2),
///     RuleError::EmptyRules => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// A pattern is not a valid regular expression.
    ///
    /// `message` holds only the headline of the regex engine's diagnostic.
    #[error("Regular expression syntax (line {line}): {message}")]
    PatternSyntax {
        /// One-based line of the offending rule in the rule text.
        line: usize,
        /// The pattern as written, without its `-` marker.
        pattern: String,
        /// Single-line diagnostic from the regex engine.
        message: String,
    },

    /// The rule text is empty or whitespace only.
    #[error("Regular expression must be specified")]
    EmptyRules,
}

impl RuleError {
    /// Creates a [`RuleError::PatternSyntax`] from a regex compile failure.
    pub fn pattern_syntax(line: usize, pattern: impl Into<String>, source: &regex::Error) -> Self {
        Self::PatternSyntax {
            line,
            pattern: pattern.into(),
            message: diagnostic_headline(source),
        }
    }

    /// Returns the rule line the error refers to, if any.
    #[must_use]
    pub const fn line(&self) -> Option<usize> {
        match self {
            Self::PatternSyntax { line, .. } => Some(*line),
            Self::EmptyRules => None,
        }
    }
}

/// Reduces a regex diagnostic to the line that names the problem.
///
/// Syntax errors render as a multi-line report (`regex parse error:`, the
/// pattern, a caret, then `error: <kind>`); the `error:` line is kept.
/// Anything else falls back to its first non-empty line.
fn diagnostic_headline(source: &regex::Error) -> String {
    let full = source.to_string();
    full.lines()
        .find_map(|line| line.trim_start().strip_prefix("error: "))
        .or_else(|| full.lines().map(str::trim).find(|line| !line.is_empty()))
        .unwrap_or("invalid regular expression")
        .trim()
        .to_owned()
}
