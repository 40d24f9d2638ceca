//! Validation of rule text before it is committed.
//!
//! Validation is what the rule author sees while typing, so it never panics
//! and always reduces the problem to one line of text.

use crate::error::RuleError;
use crate::matcher::RuleSet;

/// Validates rule text, returning the number of compiled matchers.
///
/// Text that only contains comments is accepted; it defines a group that
/// matches nothing.
///
/// # Errors
///
/// - [`RuleError::EmptyRules`] if the text is empty or whitespace only
/// - [`RuleError::PatternSyntax`] for the first malformed pattern
///
/// # Examples
///
/// ```
/// use rws_rules::{validate, RuleError};
///
/// assert_eq!(validate("src/\n-src/tmp/"), Ok(2));
/// assert_eq!(validate("  \n"), Err(RuleError::EmptyRules));
/// assert!(validate("(").is_err());
/// ```
pub fn validate(text: &str) -> Result<usize, RuleError> {
    if text.trim().is_empty() {
        return Err(RuleError::EmptyRules);
    }
    RuleSet::compile(text).map(|rules| rules.len())
}

/// Returns the message to show the rule author, or `None` when the text is valid.
#[must_use]
pub fn validation_message(text: &str) -> Option<String> {
    validate(text).err().map(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_rules() {
        assert_eq!(validate("src/.*\\.txt\n-src/tmp/.*"), Ok(2));
        assert_eq!(validation_message("src/"), None);
    }

    #[test]
    fn test_comment_only_rules_are_valid() {
        assert_eq!(validate("# nothing yet"), Ok(0));
    }

    #[test]
    fn test_empty_rules_rejected() {
        assert_eq!(validate(""), Err(RuleError::EmptyRules));
        assert_eq!(validate(" \n\t\n"), Err(RuleError::EmptyRules));
    }

    #[test]
    fn test_unbalanced_paren_message_is_one_line() {
        let message = validation_message("src/\n-tmp/(").unwrap();
        assert!(!message.contains('\n'));
        insta::assert_snapshot!(message, @"Regular expression syntax (line 2): unclosed group");
    }

    #[test]
    fn test_first_failure_is_reported() {
        let err = validate("[\n(").unwrap_err();
        assert_eq!(err.line(), Some(1));
    }
}
