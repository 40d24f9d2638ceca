//! Line-oriented rule syntax.
//!
//! Rule text is split on newlines and each line is trimmed. A line starting
//! with `-` is an exclusion whose pattern is the rest of the line, a line
//! starting with `#` is a comment, any other non-empty line is an inclusion
//! whose pattern is the whole line. Blank lines produce nothing.
//!
//! # Examples
//!
//! ```
//! use rws_rules::{parse_rules, RuleKind};
//!
//! let rules: Vec<_> = parse_rules("# sources\nsrc/\n\n-src/tmp/").collect();
//! assert_eq!(rules.len(), 3);
//! assert_eq!(rules[0].kind, RuleKind::Comment);
//! assert_eq!(rules[1].kind, RuleKind::Include);
//! assert_eq!(rules[2].kind, RuleKind::Exclude);
//! assert_eq!(rules[2].pattern, "src/tmp/");
//! assert_eq!(rules[2].line, 4);
//! ```

/// Marker that turns a line into an exclusion.
pub const EXCLUDE_MARKER: char = '-';

/// Marker that turns a line into a comment.
pub const COMMENT_MARKER: char = '#';

/// What a rule line does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Matching files join the group.
    Include,
    /// Matching files are kept out of the group.
    Exclude,
    /// Ignored text.
    Comment,
}

/// One parsed, not yet compiled, rule line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule<'a> {
    /// Polarity of the rule.
    pub kind: RuleKind,
    /// Pattern text with the marker removed (the comment text for comments).
    pub pattern: &'a str,
    /// One-based line number in the rule text.
    pub line: usize,
}

impl<'a> Rule<'a> {
    /// Parses one line, returning `None` for blank lines.
    #[must_use]
    pub fn parse(text: &'a str, line: usize) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let (kind, pattern) = if let Some(rest) = text.strip_prefix(EXCLUDE_MARKER) {
            (RuleKind::Exclude, rest)
        } else if let Some(rest) = text.strip_prefix(COMMENT_MARKER) {
            (RuleKind::Comment, rest)
        } else {
            (RuleKind::Include, text)
        };
        Some(Self {
            kind,
            pattern,
            line,
        })
    }

    /// Returns `true` if the rule carries a pattern to compile.
    #[inline]
    #[must_use]
    pub const fn is_matcher(&self) -> bool {
        !matches!(self.kind, RuleKind::Comment)
    }
}

/// Parses rule text into rules in textual order, skipping blank lines.
pub fn parse_rules(text: &str) -> impl Iterator<Item = Rule<'_>> {
    text.lines()
        .enumerate()
        .filter_map(|(index, line)| Rule::parse(line, index + 1))
}
