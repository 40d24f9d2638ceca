//! Group registry and the per-batch update cycle.
//!
//! [`GroupRegistry`] owns one [`MembershipStore`] per registered working set
//! for as long as the group is registered. Compiled rules do not live here:
//! [`GroupRegistry::begin`] compiles a fresh [`GroupFilter`] for every group
//! from the rule text its working set carries right now, and the returned
//! [`Batch`] discards them when it ends.
//!
//! # Batch Lifecycle
//!
//! ```text
//! begin()  ── compile one filter per group (bad rules skip the group)
//!    │
//!    ▼
//! add / remove / rederive_*  ── any number of times
//!    │
//!    ▼
//! finish() or drop  ── flush every dirty store exactly once
//! ```

use std::sync::Arc;

use rws_core::{FxIndexMap, ResourceHandle, ResourcePath, fx_index_map};
use rws_rules::validate;

use crate::error::EngineError;
use crate::filter::GroupFilter;
use crate::membership::MembershipStore;
use crate::scan::collect_matches;
use crate::working_set::WorkingSet;
use crate::workspace::Workspace;

/// Stable registration id; survives edits that rename the working set.
type GroupId = u64;

struct Group {
    working_set: Arc<dyn WorkingSet>,
    store: MembershipStore,
}

/// Maps working sets to their membership stores.
///
/// A group is looked up by the name its working set carries now, so editing
/// the rules (and with them the name) keeps the group and its store.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rws_engine::{GroupRegistry, SharedWorkingSet};
/// use rws_core::ResourceHandle;
///
/// let working_set = SharedWorkingSet::new("src/");
/// let mut registry = GroupRegistry::new();
/// let name = registry.register(Arc::new(working_set.clone()));
///
/// let mut batch = registry.begin();
/// batch.add(&ResourceHandle::file("src/a.txt"));
/// batch.add(&ResourceHandle::file("src/b.txt"));
/// assert_eq!(batch.finish(), 1);
///
/// assert_eq!(registry.members(&name).map(|m| m.len()), Some(2));
/// assert_eq!(working_set.publish_count(), 1);
/// ```
#[derive(Default)]
pub struct GroupRegistry {
    groups: FxIndexMap<GroupId, Group>,
    next_id: GroupId,
}

impl std::fmt::Debug for GroupRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupRegistry")
            .field("groups", &self.names())
            .finish()
    }
}

impl GroupRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            groups: fx_index_map(),
            next_id: 0,
        }
    }

    /// Finds the group whose working set is currently named `name`.
    fn find(&self, name: &str) -> Option<GroupId> {
        self.groups
            .iter()
            .find(|(_, group)| group.working_set.name() == name)
            .map(|(id, _)| *id)
    }

    /// Registers a working set, seeding its store with the elements it
    /// already publishes. Returns the name it is registered under.
    ///
    /// Registering the same working set again, or another one with the same
    /// current name, replaces the earlier registration in place.
    pub fn register(&mut self, working_set: Arc<dyn WorkingSet>) -> String {
        let name = working_set.name();
        let existing = self
            .groups
            .iter()
            .find(|(_, group)| {
                Arc::ptr_eq(&group.working_set, &working_set) || group.working_set.name() == name
            })
            .map(|(id, _)| *id);
        let id = existing.unwrap_or_else(|| {
            self.next_id += 1;
            self.next_id
        });

        let store = MembershipStore::from_members(working_set.elements());
        tracing::debug!(group = %name, members = store.len(), "Registered group");
        self.groups.insert(id, Group { working_set, store });
        name
    }

    /// Unregisters a group by its current name. Returns `true` if it was
    /// registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        let removed = self
            .find(name)
            .and_then(|id| self.groups.shift_remove(&id))
            .is_some();
        if removed {
            tracing::debug!(group = %name, "Unregistered group");
        }
        removed
    }

    /// Returns `true` if a registered working set is currently named `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Returns `true` if this exact working set is registered.
    #[must_use]
    pub fn contains_working_set(&self, working_set: &Arc<dyn WorkingSet>) -> bool {
        self.groups
            .values()
            .any(|group| Arc::ptr_eq(&group.working_set, working_set))
    }

    /// Returns the number of registered groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if no group is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns the current group names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.groups
            .values()
            .map(|group| group.working_set.name())
            .collect()
    }

    /// Returns the working set currently named `name`.
    #[must_use]
    pub fn working_set(&self, name: &str) -> Option<Arc<dyn WorkingSet>> {
        self.get(name).map(|group| Arc::clone(&group.working_set))
    }

    /// Returns the current members of a group in insertion order.
    #[must_use]
    pub fn members(&self, name: &str) -> Option<Vec<ResourcePath>> {
        self.get(name).map(|group| group.store.to_vec())
    }

    /// Returns a group's store.
    #[must_use]
    pub fn store(&self, name: &str) -> Option<&MembershipStore> {
        self.get(name).map(|group| &group.store)
    }

    fn get(&self, name: &str) -> Option<&Group> {
        self.find(name).and_then(|id| self.groups.get(&id))
    }

    /// Flushes every dirty store. Returns the number of groups published.
    pub fn flush_all(&mut self) -> usize {
        self.groups
            .values_mut()
            .map(|group| group.store.flush(group.working_set.as_ref()))
            .filter(|published| *published)
            .count()
    }

    /// Recomputes a group from scratch and publishes it if it changed.
    ///
    /// Called when a group is created or its rules are edited. Returns `true`
    /// if a publish happened.
    ///
    /// # Errors
    ///
    /// - [`EngineError::UnknownGroup`] if no registered working set is
    ///   currently named `name`
    /// - [`EngineError::Rules`] if the current rule text is empty or malformed
    /// - any error from enumerating `workspace`
    pub fn commit<W: Workspace + ?Sized>(
        &mut self,
        name: &str,
        workspace: &W,
    ) -> Result<bool, EngineError> {
        let group = self
            .find(name)
            .and_then(|id| self.groups.get_mut(&id))
            .ok_or_else(|| EngineError::UnknownGroup(name.to_owned()))?;
        let rules = group.working_set.rules();
        validate(&rules)?;
        let matches = collect_matches(workspace, &rules)?;
        group.store.replace(matches);
        let published = group.store.flush(group.working_set.as_ref());
        tracing::info!(group = %name, members = group.store.len(), published, "Committed group");
        Ok(published)
    }

    /// Starts a batch, compiling one filter per group from its current rules.
    ///
    /// Groups whose rules fail to compile sit the batch out; their stores are
    /// left untouched.
    pub fn begin(&mut self) -> Batch<'_> {
        let mut filters = Vec::with_capacity(self.groups.len());
        for (id, group) in &self.groups {
            match GroupFilter::for_working_set(group.working_set.as_ref()) {
                Ok(filter) => filters.push((*id, filter)),
                Err(err) => {
                    tracing::warn!(
                        group = %group.working_set.name(),
                        error = %err,
                        "Skipping group with invalid rules"
                    );
                }
            }
        }
        tracing::debug!(groups = filters.len(), "Began batch");
        Batch {
            registry: self,
            filters,
            finished: false,
        }
    }
}

/// One open update cycle over a [`GroupRegistry`].
///
/// Dropping a batch without calling [`finish`](Self::finish) still flushes
/// it, so an aborted apply phase never loses the changes made before the
/// abort.
pub struct Batch<'r> {
    registry: &'r mut GroupRegistry,
    filters: Vec<(GroupId, GroupFilter)>,
    finished: bool,
}

impl Batch<'_> {
    /// Returns the number of groups taking part in this batch.
    #[must_use]
    pub fn active_groups(&self) -> usize {
        self.filters.len()
    }

    /// Runs `apply` for every participating group's filter and store.
    fn for_each_group(&mut self, mut apply: impl FnMut(&GroupFilter, &mut MembershipStore)) {
        for (id, filter) in &self.filters {
            if let Some(group) = self.registry.groups.get_mut(id) {
                apply(filter, &mut group.store);
            }
        }
    }

    /// Routes an added resource through every group's matcher.
    pub fn add(&mut self, resource: &ResourceHandle) {
        self.for_each_group(|filter, store| {
            filter.add_resource(resource, store);
        });
    }

    /// Removes a resource from every group, without matching.
    pub fn remove(&mut self, resource: &ResourceHandle) {
        self.for_each_group(|_, store| {
            GroupFilter::remove_resource(resource, store);
        });
    }

    /// Re-derives a single file: remove, then re-add through the matcher.
    pub fn rederive_file(&mut self, resource: &ResourceHandle) {
        self.for_each_group(|filter, store| {
            filter.update_resource(resource, store);
        });
    }

    /// Re-derives a container's subtree from its current contents.
    ///
    /// Every member at or below `container` is dropped, then each resource in
    /// `contents` is re-added through the matcher.
    pub fn rederive_container(&mut self, container: &ResourceHandle, contents: &[ResourceHandle]) {
        self.for_each_group(|filter, store| {
            GroupFilter::remove_resource(container, store);
            for resource in contents {
                filter.add_resource(resource, store);
            }
        });
    }

    /// Ends the batch, flushing every dirty store once.
    ///
    /// Returns the number of groups published.
    pub fn finish(mut self) -> usize {
        self.finished = true;
        self.end()
    }

    fn end(&mut self) -> usize {
        let published = self.registry.flush_all();
        self.filters.clear();
        tracing::debug!(published, "Ended batch");
        published
    }
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.end();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::working_set::SharedWorkingSet;
    use crate::workspace::MemoryWorkspace;

    fn registry_with(rules: &[&str]) -> (GroupRegistry, Vec<SharedWorkingSet>) {
        let mut registry = GroupRegistry::new();
        let sets: Vec<_> = rules.iter().map(|r| SharedWorkingSet::new(r)).collect();
        for set in &sets {
            registry.register(Arc::new(set.clone()));
        }
        (registry, sets)
    }

    #[test]
    fn test_register_seeds_from_published_elements() {
        let set = SharedWorkingSet::new("src/");
        set.set_elements(vec![ResourcePath::new("src/old.txt")]);
        let mut registry = GroupRegistry::new();
        let name = registry.register(Arc::new(set));
        let store = registry.store(&name).unwrap();
        assert_eq!(store.len(), 1);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_register_unregister_contains() {
        let (mut registry, _sets) = registry_with(&["a", "b"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("RegEx: a"));
        assert!(registry.unregister("RegEx: a"));
        assert!(!registry.unregister("RegEx: a"));
        assert_eq!(registry.names(), vec!["RegEx: b"]);
    }

    #[test]
    fn test_contains_working_set_by_identity() {
        let mut registry = GroupRegistry::new();
        let set: Arc<dyn WorkingSet> = Arc::new(SharedWorkingSet::new("a"));
        let other: Arc<dyn WorkingSet> = Arc::new(SharedWorkingSet::new("a"));
        registry.register(Arc::clone(&set));
        assert!(registry.contains_working_set(&set));
        assert!(!registry.contains_working_set(&other));
    }

    #[test]
    fn test_many_adds_publish_once() {
        let (mut registry, sets) = registry_with(&["\\.txt$"]);
        let mut batch = registry.begin();
        for i in 0..1000 {
            batch.add(&ResourceHandle::file(&format!("p/file{i}.txt")));
        }
        assert_eq!(batch.finish(), 1);
        assert_eq!(sets[0].publish_count(), 1);
        assert_eq!(sets[0].elements().len(), 1000);
    }

    #[test]
    fn test_untouched_groups_are_not_published() {
        let (mut registry, sets) = registry_with(&["src/", "docs/"]);
        let mut batch = registry.begin();
        batch.add(&ResourceHandle::file("src/a.txt"));
        assert_eq!(batch.finish(), 1);
        assert_eq!(sets[0].publish_count(), 1);
        assert_eq!(sets[1].publish_count(), 0);
    }

    #[test]
    fn test_drop_flushes() {
        let (mut registry, sets) = registry_with(&["src/"]);
        {
            let mut batch = registry.begin();
            batch.add(&ResourceHandle::file("src/a.txt"));
        }
        assert_eq!(sets[0].publish_count(), 1);
    }

    #[test]
    fn test_invalid_rules_skip_group() {
        let (mut registry, sets) = registry_with(&["src/", "("]);
        let mut batch = registry.begin();
        assert_eq!(batch.active_groups(), 1);
        batch.add(&ResourceHandle::file("src/(a).txt"));
        batch.finish();
        assert_eq!(sets[1].publish_count(), 0);
    }

    #[test]
    fn test_batch_reads_current_rules() {
        let (mut registry, sets) = registry_with(&["src/"]);
        sets[0].set_rules("docs/");
        let mut batch = registry.begin();
        batch.add(&ResourceHandle::file("src/a.txt"));
        batch.add(&ResourceHandle::file("docs/b.txt"));
        batch.finish();
        assert_eq!(sets[0].elements(), vec![ResourcePath::new("docs/b.txt")]);
    }

    #[test]
    fn test_rederive_container() {
        let (mut registry, sets) = registry_with(&["\\.txt$"]);
        let mut batch = registry.begin();
        batch.add(&ResourceHandle::file("p/a.txt"));
        batch.add(&ResourceHandle::file("p/b.txt"));
        batch.finish();

        let mut batch = registry.begin();
        batch.rederive_container(
            &ResourceHandle::container("p"),
            &[ResourceHandle::container("p/sub"), ResourceHandle::file("p/sub/c.txt")],
        );
        batch.finish();
        assert_eq!(sets[0].elements(), vec![ResourcePath::new("p/sub/c.txt")]);
    }

    #[test]
    fn test_commit_replaces_members() {
        let workspace = MemoryWorkspace::with_files(&["src/a.txt", "src/tmp/b.txt", "docs/c.txt"]);
        let (mut registry, sets) = registry_with(&["src/.*\\.txt\n-src/tmp/.*"]);
        let name = registry.names()[0].clone();
        assert!(registry.commit(&name, &workspace).unwrap());
        assert_eq!(sets[0].elements(), vec![ResourcePath::new("src/a.txt")]);
        // Nothing changed, nothing published
        assert!(!registry.commit(&name, &workspace).unwrap());
        assert_eq!(sets[0].publish_count(), 1);
    }

    #[test]
    fn test_edited_group_is_found_by_current_name() {
        let workspace = MemoryWorkspace::with_files(&["src/a.txt", "docs/b.txt"]);
        let (mut registry, sets) = registry_with(&["src/"]);
        assert!(registry.commit("RegEx: src/", &workspace).unwrap());

        sets[0].set_rules("docs/");
        assert!(registry.contains("RegEx: docs/"));
        assert!(!registry.contains("RegEx: src/"));
        assert!(registry.commit("RegEx: docs/", &workspace).unwrap());
        assert_eq!(sets[0].elements(), vec![ResourcePath::new("docs/b.txt")]);
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister("RegEx: docs/"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reregistering_replaces_in_place() {
        let (mut registry, sets) = registry_with(&["a", "b"]);
        sets[0].set_rules("c");
        registry.register(Arc::new(sets[0].clone()));
        registry.register(Arc::new(SharedWorkingSet::new("b")));
        assert_eq!(registry.names(), vec!["RegEx: c", "RegEx: b"]);
    }

    #[test]
    fn test_batch_compiles_from_rules() {
        struct Renamed(SharedWorkingSet);

        impl WorkingSet for Renamed {
            fn name(&self) -> String {
                "Sources".to_owned()
            }

            fn rules(&self) -> String {
                "src/".to_owned()
            }

            fn elements(&self) -> Vec<ResourcePath> {
                self.0.elements()
            }

            fn set_elements(&self, elements: Vec<ResourcePath>) {
                self.0.set_elements(elements);
            }
        }

        let inner = SharedWorkingSet::new("unused");
        let mut registry = GroupRegistry::new();
        registry.register(Arc::new(Renamed(inner.clone())));

        let mut batch = registry.begin();
        batch.add(&ResourceHandle::file("src/a.txt"));
        batch.add(&ResourceHandle::file("docs/b.txt"));
        batch.finish();
        assert_eq!(inner.elements(), vec![ResourcePath::new("src/a.txt")]);

        let workspace = MemoryWorkspace::with_files(&["src/a.txt", "docs/b.txt"]);
        assert!(!registry.commit("Sources", &workspace).unwrap());
    }

    #[test]
    fn test_commit_rejects_empty_rules() {
        let workspace = MemoryWorkspace::new();
        let (mut registry, sets) = registry_with(&["src/"]);
        sets[0].set_rules("  ");
        let err = registry.commit(&sets[0].name(), &workspace).unwrap_err();
        assert_eq!(err.to_string(), "Regular expression must be specified");
    }

    #[test]
    fn test_commit_unknown_group() {
        let mut registry = GroupRegistry::new();
        let err = registry.commit("RegEx: x", &MemoryWorkspace::new()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownGroup(_)));
    }
}
