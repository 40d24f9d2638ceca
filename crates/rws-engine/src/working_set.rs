//! The external object a group publishes its membership to.

use std::sync::Arc;

use parking_lot::RwLock;
use rws_core::{ResourcePath, group_name, rules_from_group_name};

/// A named group whose element list the engine maintains.
///
/// The name encodes the rule text after the `"RegEx: "` prefix, so editing
/// the rules renames the group. Implementations must tolerate `set_elements`
/// being called from the change-feed thread while other threads read.
pub trait WorkingSet: Send + Sync {
    /// Returns the group name.
    fn name(&self) -> String;

    /// Returns the group's current rule text.
    fn rules(&self) -> String {
        rules_from_group_name(&self.name()).to_owned()
    }

    /// Returns the last published elements.
    fn elements(&self) -> Vec<ResourcePath>;

    /// Replaces the published elements.
    fn set_elements(&self, elements: Vec<ResourcePath>);
}

#[derive(Debug, Default)]
struct WorkingSetState {
    name: String,
    label: String,
    elements: Vec<ResourcePath>,
    publish_count: usize,
}

/// A thread-safe [`WorkingSet`] handle.
///
/// Clones share state, so one clone can sit in a
/// [`GroupRegistry`](crate::GroupRegistry) while another is edited.
///
/// # Examples
///
/// ```
/// use rws_engine::{SharedWorkingSet, WorkingSet};
///
/// let working_set = SharedWorkingSet::new("src/").with_label("Sources");
/// assert_eq!(working_set.name(), "RegEx: src/");
/// assert_eq!(working_set.rules(), "src/");
///
/// let editor = working_set.clone();
/// editor.set_rules("docs/");
/// assert_eq!(working_set.rules(), "docs/");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SharedWorkingSet {
    state: Arc<RwLock<WorkingSetState>>,
}

impl SharedWorkingSet {
    /// Creates a working set for the given rule text.
    #[must_use]
    pub fn new(rules: &str) -> Self {
        Self {
            state: Arc::new(RwLock::new(WorkingSetState {
                name: group_name(rules),
                ..WorkingSetState::default()
            })),
        }
    }

    /// Sets the display label.
    #[must_use]
    pub fn with_label(self, label: impl Into<String>) -> Self {
        self.state.write().label = label.into();
        self
    }

    /// Replaces the rule text, renaming the group.
    pub fn set_rules(&self, rules: &str) {
        self.state.write().name = group_name(rules);
    }

    /// Returns the display label, falling back to the name when unset.
    #[must_use]
    pub fn label(&self) -> String {
        let state = self.state.read();
        if state.label.is_empty() {
            state.name.clone()
        } else {
            state.label.clone()
        }
    }

    /// Returns how many times elements were published.
    #[must_use]
    pub fn publish_count(&self) -> usize {
        self.state.read().publish_count
    }
}

impl WorkingSet for SharedWorkingSet {
    fn name(&self) -> String {
        self.state.read().name.clone()
    }

    fn elements(&self) -> Vec<ResourcePath> {
        self.state.read().elements.clone()
    }

    fn set_elements(&self, elements: Vec<ResourcePath>) {
        let mut state = self.state.write();
        state.elements = elements;
        state.publish_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_encodes_rules() {
        let working_set = SharedWorkingSet::new("src/\n-tmp/");
        assert_eq!(working_set.name(), "RegEx: src/\n-tmp/");
        assert_eq!(working_set.rules(), "src/\n-tmp/");
    }

    #[test]
    fn test_label_falls_back_to_name() {
        let working_set = SharedWorkingSet::new("a");
        assert_eq!(working_set.label(), "RegEx: a");
        let working_set = working_set.with_label("Alpha");
        assert_eq!(working_set.label(), "Alpha");
    }

    #[test]
    fn test_clones_share_elements() {
        let working_set = SharedWorkingSet::new("a");
        let other = working_set.clone();
        other.set_elements(vec![ResourcePath::new("a.txt")]);
        assert_eq!(working_set.elements().len(), 1);
        assert_eq!(working_set.publish_count(), 1);
    }
}
