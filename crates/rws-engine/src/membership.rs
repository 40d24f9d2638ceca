//! The authoritative member set of one group.

use rws_core::{FxHashSet, FxIndexSet, ResourcePath, fx_index_set};

use crate::working_set::WorkingSet;

/// Insertion-ordered members plus a dirty flag.
///
/// `add` and `remove` set the flag only when they change the set. A
/// [`flush`](Self::flush) publishes the members to the backing working set if
/// and only if the flag is set, then clears it, so any number of mutations
/// between two flushes costs one publish.
///
/// Removals are recorded as tombstones and compacted in one pass before the
/// ordered set is read or re-added to, so a batch of `m` removals against `n`
/// members costs `O(n + m)` rather than `O(n * m)`.
///
/// # Examples
///
/// ```
/// use rws_engine::{MembershipStore, SharedWorkingSet};
/// use rws_core::ResourcePath;
///
/// let working_set = SharedWorkingSet::new("src/");
/// let mut store = MembershipStore::new();
/// store.add(ResourcePath::new("src/a.txt"));
/// store.add(ResourcePath::new("src/a.txt"));
/// assert_eq!(store.len(), 1);
/// assert!(store.flush(&working_set));
/// assert!(!store.flush(&working_set));
/// assert_eq!(working_set.publish_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MembershipStore {
    members: FxIndexSet<ResourcePath>,
    // Always a subset of `members`
    removed: FxHashSet<ResourcePath>,
    dirty: bool,
}

impl MembershipStore {
    /// Creates an empty, clean store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            members: fx_index_set(),
            removed: FxHashSet::default(),
            dirty: false,
        }
    }

    /// Creates a clean store seeded with already-published members.
    pub fn from_members(members: impl IntoIterator<Item = ResourcePath>) -> Self {
        let mut set = fx_index_set();
        set.extend(members);
        Self {
            members: set,
            removed: FxHashSet::default(),
            dirty: false,
        }
    }

    /// Inserts a member. Returns `true` if it was absent.
    ///
    /// A member removed earlier goes to the end, as a fresh insertion would.
    pub fn add(&mut self, path: ResourcePath) -> bool {
        if self.removed.contains(&path) {
            self.compact();
        }
        let inserted = self.members.insert(path);
        self.dirty |= inserted;
        inserted
    }

    /// Removes a member. Returns `true` if it was present.
    pub fn remove(&mut self, path: &ResourcePath) -> bool {
        let removed = self.members.contains(path) && self.removed.insert(path.clone());
        self.dirty |= removed;
        removed
    }

    /// Removes every member below `container`. Returns the number removed.
    pub fn remove_descendants(&mut self, container: &ResourcePath) -> usize {
        self.compact();
        let before = self.members.len();
        self.members.retain(|path| !path.is_descendant_of(container));
        let removed = before - self.members.len();
        self.dirty |= removed > 0;
        removed
    }

    /// Applies pending removals to the ordered set in one pass.
    fn compact(&mut self) {
        if self.removed.is_empty() {
            return;
        }
        let removed = std::mem::take(&mut self.removed);
        self.members.retain(|path| !removed.contains(path));
    }

    /// Replaces the whole member set, marking the store dirty only if the
    /// set's content changed.
    pub fn replace(&mut self, members: impl IntoIterator<Item = ResourcePath>) {
        self.compact();
        let mut next = fx_index_set();
        next.extend(members);
        let changed = next.len() != self.members.len()
            || next.iter().any(|path| !self.members.contains(path));
        if changed {
            self.members = next;
            self.dirty = true;
        }
    }

    /// Returns `true` if `path` is a member.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.members.contains(path) && !self.removed.contains(path)
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len() - self.removed.len()
    }

    /// Returns `true` if there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the set changed since the last flush.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Iterates members in insertion order.
    pub fn members(&self) -> impl Iterator<Item = &ResourcePath> {
        self.members
            .iter()
            .filter(|path| !self.removed.contains(*path))
    }

    /// Copies the members out in insertion order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<ResourcePath> {
        self.members().cloned().collect()
    }

    /// Publishes the members if dirty. Returns `true` if a publish happened.
    pub fn flush(&mut self, working_set: &dyn WorkingSet) -> bool {
        if !self.dirty {
            return false;
        }
        self.compact();
        working_set.set_elements(self.to_vec());
        self.dirty = false;
        tracing::debug!(
            group = %working_set.name(),
            members = self.members.len(),
            "Published membership"
        );
        true
    }
}
