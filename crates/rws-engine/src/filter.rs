//! A group's rules applied to its membership store.
//!
//! Both the change feed and the full rescan route resources through
//! [`GroupFilter::add_resource`], so one matcher algorithm decides membership
//! everywhere.

use rws_core::{ResourceHandle, rules_from_group_name};
use rws_rules::{Decision, RuleError, RuleSet};

use crate::membership::MembershipStore;
use crate::working_set::WorkingSet;

/// Compiled rules of one group, valid for one batch or one rescan.
#[derive(Debug, Clone)]
pub struct GroupFilter {
    name: String,
    rules: RuleSet,
}

impl GroupFilter {
    /// Compiles the rules encoded in a group name.
    pub fn compile(name: &str) -> Result<Self, RuleError> {
        Ok(Self::new(name, RuleSet::compile(rules_from_group_name(name))?))
    }

    /// Compiles the current rules of a working set.
    pub fn for_working_set(working_set: &dyn WorkingSet) -> Result<Self, RuleError> {
        let rules = working_set.rules();
        Ok(Self::new(working_set.name(), RuleSet::compile(&rules)?))
    }

    /// Pairs a group name with already compiled rules.
    #[must_use]
    pub fn new(name: impl Into<String>, rules: RuleSet) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the compiled rules.
    #[must_use]
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Classifies a resource without touching any store.
    #[must_use]
    pub fn decide(&self, resource: &ResourceHandle) -> Decision {
        self.rules.classify(resource)
    }

    /// Classifies a resource and adds it to `store` on [`Decision::Include`].
    pub fn add_resource(&self, resource: &ResourceHandle, store: &mut MembershipStore) -> Decision {
        let decision = self.decide(resource);
        if decision.is_include() {
            store.add(resource.path.clone());
        }
        tracing::trace!(group = %self.name, path = %resource.path, ?decision, "Classified resource");
        decision
    }

    /// Removes a resource (and, for containers, everything below it).
    pub fn remove_resource(resource: &ResourceHandle, store: &mut MembershipStore) -> bool {
        let mut changed = store.remove(&resource.path);
        if !resource.is_file() {
            changed |= store.remove_descendants(&resource.path) > 0;
        }
        changed
    }

    /// Re-derives one file: remove, then re-add through the matcher.
    pub fn update_resource(&self, resource: &ResourceHandle, store: &mut MembershipStore) -> Decision {
        store.remove(&resource.path);
        self.add_resource(resource, store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rws_core::{ResourcePath, group_name};

    fn filter(rules: &str) -> GroupFilter {
        GroupFilter::compile(&group_name(rules)).unwrap()
    }

    #[test]
    fn test_compile_from_group_name() {
        let filter = filter("src/");
        assert_eq!(filter.name(), "RegEx: src/");
        assert_eq!(filter.rules().len(), 1);
    }

    #[test]
    fn test_bad_rules_fail_to_compile() {
        assert!(GroupFilter::compile(&group_name("(")).is_err());
    }

    #[test]
    fn test_include_adds_exclude_does_not() {
        let filter = filter("src/\n-src/tmp/");
        let mut store = MembershipStore::new();
        assert_eq!(
            filter.add_resource(&ResourceHandle::file("src/a.txt"), &mut store),
            Decision::Include
        );
        assert_eq!(
            filter.add_resource(&ResourceHandle::file("src/tmp/b.txt"), &mut store),
            Decision::Exclude
        );
        assert_eq!(store.to_vec(), vec![ResourcePath::new("src/a.txt")]);
    }

    #[test]
    fn test_containers_are_never_added() {
        let filter = filter("src");
        let mut store = MembershipStore::new();
        assert_eq!(
            filter.add_resource(&ResourceHandle::container("src"), &mut store),
            Decision::NoMatch
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_drops_file_that_no_longer_matches() {
        let mut store = MembershipStore::from_members([ResourcePath::new("docs/c.txt")]);
        let filter = filter("src/");
        filter.update_resource(&ResourceHandle::file("docs/c.txt"), &mut store);
        assert!(store.is_empty());
        assert!(store.is_dirty());
    }

    #[test]
    fn test_remove_container_drops_descendants() {
        let mut store = MembershipStore::from_members([
            ResourcePath::new("p/a.txt"),
            ResourcePath::new("q/b.txt"),
        ]);
        assert!(GroupFilter::remove_resource(&ResourceHandle::container("p"), &mut store));
        assert_eq!(store.to_vec(), vec![ResourcePath::new("q/b.txt")]);
    }
}
