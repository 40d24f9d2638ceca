//! Include/exclude regular-expression rules for working-set membership.
//!
//! This crate turns the rule text a user writes for a group into a compiled
//! [`RuleSet`] and decides, for one resource path at a time, whether the
//! path is included, excluded, or untouched by the rules.
//!
//! # Rule Syntax
//!
//! ```text
//! # comment lines and blank lines are ignored
//! src/.*\.txt        include: pattern found anywhere in the path
//! -src/tmp/          exclude: the rest of the line is the pattern
//! ```
//!
//! Patterns are unanchored regular expressions evaluated against the full
//! workspace-relative path. The last rule written that applies wins.
//!
//! # Usage
//!
//! ```
//! use rws_rules::{Decision, RuleSet};
//!
//! let rules = RuleSet::compile("src/.*\\.txt\n-src/tmp/.*")?;
//! assert_eq!(rules.decide("src/a.txt"), Decision::Include);
//! assert_eq!(rules.decide("src/tmp/b.txt"), Decision::Exclude);
//! assert_eq!(rules.decide("docs/c.txt"), Decision::NoMatch);
//! # Ok::<(), rws_rules::RuleError>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod matcher;
pub mod rule;
pub mod validate;

pub use error::RuleError;
pub use matcher::{Decision, Matcher, RuleSet};
pub use rule::{Rule, RuleKind, parse_rules};
pub use validate::{validate, validation_message};
