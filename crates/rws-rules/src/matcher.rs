//! Compiled rule sets and the include/exclude decision.
//!
//! A [`RuleSet`] stores its matchers in the reverse of the order they were
//! written. Evaluation walks that list front to back and stops at the first
//! pattern found anywhere in the path, so the most recently written rule that
//! applies decides:
//!
//! - an exclusion hides every rule written before it
//! - an inclusion can never be hidden by an exclusion written before it
//! - a path no rule touches is [`Decision::NoMatch`]
//!
//! # Examples
//!
//! ```
//! use rws_rules::{Decision, RuleSet};
//!
//! let rules = RuleSet::compile("-secret\nsecret/ok\n-secret/ok/really")?;
//! assert_eq!(rules.decide("secret/ok/really"), Decision::Exclude);
//! assert_eq!(rules.decide("secret/ok/x"), Decision::Include);
//! assert_eq!(rules.decide("secret/x"), Decision::Exclude);
//! assert_eq!(rules.decide("public/x"), Decision::NoMatch);
//! # Ok::<(), rws_rules::RuleError>(())
//! ```

use regex::Regex;
use rws_core::ResourceHandle;
use smallvec::SmallVec;

use crate::error::RuleError;
use crate::rule::{RuleKind, parse_rules};

/// A compiled pattern paired with its polarity.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Files whose path contains a match join the group.
    Include(Regex),
    /// Files whose path contains a match are kept out.
    Exclude(Regex),
}

impl Matcher {
    /// Returns `true` if the pattern is found anywhere in `path`.
    #[inline]
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.pattern().is_match(path)
    }

    /// Returns the compiled pattern.
    #[inline]
    #[must_use]
    pub const fn pattern(&self) -> &Regex {
        match self {
            Self::Include(regex) | Self::Exclude(regex) => regex,
        }
    }

    /// Returns `true` for exclusions.
    #[inline]
    #[must_use]
    pub const fn is_exclusion(&self) -> bool {
        matches!(self, Self::Exclude(_))
    }

    /// The decision this matcher produces when it fires.
    #[inline]
    #[must_use]
    pub const fn decision(&self) -> Decision {
        match self {
            Self::Include(_) => Decision::Include,
            Self::Exclude(_) => Decision::Exclude,
        }
    }
}

/// Outcome of evaluating one path against a rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// The path belongs to the group.
    Include,
    /// A rule explicitly keeps the path out.
    Exclude,
    /// No rule applies (containers always land here).
    NoMatch,
}

impl Decision {
    /// Returns `true` for [`Decision::Include`].
    #[inline]
    #[must_use]
    pub const fn is_include(self) -> bool {
        matches!(self, Self::Include)
    }
}

/// An ordered list of compiled matchers, last-written first.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    matchers: SmallVec<[Matcher; 4]>,
}

impl RuleSet {
    /// Compiles rule text.
    ///
    /// Each rule is compiled on its own so a failure names the exact line.
    /// Comments and blank lines are dropped. Empty text compiles to an empty
    /// set that matches nothing; use [`validate`](crate::validate) to reject it.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::PatternSyntax`] for the first malformed pattern.
    pub fn compile(text: &str) -> Result<Self, RuleError> {
        let mut matchers = parse_rules(text)
            .filter(|rule| rule.is_matcher())
            .map(|rule| {
                let regex = Regex::new(rule.pattern)
                    .map_err(|err| RuleError::pattern_syntax(rule.line, rule.pattern, &err))?;
                Ok(match rule.kind {
                    RuleKind::Exclude => Matcher::Exclude(regex),
                    RuleKind::Include | RuleKind::Comment => Matcher::Include(regex),
                })
            })
            .collect::<Result<SmallVec<[Matcher; 4]>, RuleError>>()?;
        matchers.reverse();
        tracing::trace!(matchers = matchers.len(), "Compiled rule set");
        Ok(Self { matchers })
    }

    /// Returns the number of compiled matchers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    /// Returns `true` if no matcher was compiled.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Returns the matchers in evaluation order (last-written first).
    #[inline]
    #[must_use]
    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// Decides a path string.
    #[must_use]
    pub fn decide(&self, path: &str) -> Decision {
        self.matchers
            .iter()
            .find(|matcher| matcher.is_match(path))
            .map_or(Decision::NoMatch, Matcher::decision)
    }

    /// Decides a resource. Containers are never classified.
    #[must_use]
    pub fn classify(&self, resource: &ResourceHandle) -> Decision {
        if !resource.is_file() {
            return Decision::NoMatch;
        }
        self.decide(resource.path.as_str())
    }
}
