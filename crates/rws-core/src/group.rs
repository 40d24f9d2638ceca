//! Group names that carry their rule text.
//!
//! A regex working set is named `"RegEx: "` followed by its rule text. The
//! name is the only place the rules are stored, so the engine recovers them
//! from the name each time it needs a fresh matcher.
//!
//! # Examples
//!
//! ```
//! use rws_core::{group_name, rules_from_group_name};
//!
//! let name = group_name("src/.*\\.txt\n-src/tmp/.*");
//! assert_eq!(name, "RegEx: src/.*\\.txt\n-src/tmp/.*");
//! assert_eq!(rules_from_group_name(&name), "src/.*\\.txt\n-src/tmp/.*");
//! ```

/// Prefix of every regex working-set name.
pub const GROUP_NAME_PREFIX: &str = "RegEx: ";

/// Builds the group name for the given rule text.
#[must_use]
pub fn group_name(rules: &str) -> String {
    format!("{GROUP_NAME_PREFIX}{rules}")
}

/// Extracts the rule text from a group name.
///
/// Names without the prefix are treated as bare rule text.
#[must_use]
pub fn rules_from_group_name(name: &str) -> &str {
    name.strip_prefix(GROUP_NAME_PREFIX).unwrap_or(name)
}
