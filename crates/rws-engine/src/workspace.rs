//! The workspace abstraction the engine traverses.
//!
//! The engine only needs three capabilities from its host: the root
//! container, the members of a container, and (derived from those) every
//! resource below a container in pre-order. [`Workspace`] exposes exactly
//! that. [`MemoryWorkspace`] is an in-memory implementation; the filesystem
//! implementation lives in [`crate::fs`].

use rws_core::{FxHashMap, ResourceHandle, ResourceKind, ResourcePath, fx_hash_map};

use crate::error::EngineError;

/// A tree of resources the engine can enumerate.
pub trait Workspace {
    /// Returns the workspace root container.
    fn root(&self) -> ResourceHandle {
        ResourceHandle::new(ResourcePath::root(), ResourceKind::Container)
    }

    /// Returns the direct members of a container, sorted by path.
    ///
    /// A closed container has no members. Files have no members.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Resolution`] if the container cannot be
    /// resolved.
    fn members(&self, container: &ResourceHandle) -> Result<Vec<ResourceHandle>, EngineError>;

    /// Returns every resource strictly below `container`, in pre-order.
    fn descendants(&self, container: &ResourceHandle) -> Result<Vec<ResourceHandle>, EngineError> {
        let mut found = Vec::new();
        push_descendants(self, container, &mut found)?;
        Ok(found)
    }
}

fn push_descendants<W: Workspace + ?Sized>(
    workspace: &W,
    container: &ResourceHandle,
    found: &mut Vec<ResourceHandle>,
) -> Result<(), EngineError> {
    for member in workspace.members(container)? {
        found.push(member.clone());
        if !member.is_file() {
            push_descendants(workspace, &member, found)?;
        }
    }
    Ok(())
}

impl<W: Workspace + ?Sized> Workspace for &W {
    fn root(&self) -> ResourceHandle {
        (**self).root()
    }

    fn members(&self, container: &ResourceHandle) -> Result<Vec<ResourceHandle>, EngineError> {
        (**self).members(container)
    }

    fn descendants(&self, container: &ResourceHandle) -> Result<Vec<ResourceHandle>, EngineError> {
        (**self).descendants(container)
    }
}

#[derive(Debug, Clone, Copy)]
struct MemoryEntry {
    kind: ResourceKind,
    open: bool,
    unresolvable: bool,
}

/// An in-memory workspace.
///
/// Adding a file creates its missing ancestor containers. Containers can be
/// closed (they then have no members) or marked unresolvable (enumerating
/// them fails), which is how hosts surface projects that vanished mid-batch.
///
/// # Examples
///
/// ```
/// use rws_engine::{MemoryWorkspace, Workspace};
/// use rws_core::ResourceHandle;
///
/// let workspace = MemoryWorkspace::with_files(&["p/src/a.txt", "p/docs/c.txt"]);
/// let members = workspace.members(&ResourceHandle::container("p"))?;
/// assert_eq!(members.len(), 2);
/// assert_eq!(workspace.descendants(&workspace.root())?.len(), 5);
/// # Ok::<(), rws_engine::EngineError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkspace {
    entries: FxHashMap<ResourcePath, MemoryEntry>,
}

impl MemoryWorkspace {
    /// Creates an empty workspace.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: fx_hash_map(),
        }
    }

    /// Creates a workspace holding the given files.
    #[must_use]
    pub fn with_files(paths: &[&str]) -> Self {
        let mut workspace = Self::new();
        for path in paths {
            workspace.add_file(path);
        }
        workspace
    }

    /// Adds a file and any missing ancestors, returning its handle.
    pub fn add_file(&mut self, path: &str) -> ResourceHandle {
        self.insert(ResourcePath::new(path), ResourceKind::File)
    }

    /// Adds a container and any missing ancestors, returning its handle.
    pub fn add_container(&mut self, path: &str) -> ResourceHandle {
        self.insert(ResourcePath::new(path), ResourceKind::Container)
    }

    fn insert(&mut self, path: ResourcePath, kind: ResourceKind) -> ResourceHandle {
        let mut ancestor = path.parent();
        while let Some(current) = ancestor {
            if current.is_root() {
                break;
            }
            ancestor = current.parent();
            self.entries.entry(current).or_insert(MemoryEntry {
                kind: ResourceKind::Container,
                open: true,
                unresolvable: false,
            });
        }
        self.entries.insert(
            path.clone(),
            MemoryEntry {
                kind,
                open: true,
                unresolvable: false,
            },
        );
        ResourceHandle::new(path, kind)
    }

    /// Removes a resource and everything below it. Returns the number removed.
    pub fn remove(&mut self, path: &str) -> usize {
        let target = ResourcePath::new(path);
        let before = self.entries.len();
        self.entries
            .retain(|candidate, _| *candidate != target && !candidate.is_descendant_of(&target));
        before - self.entries.len()
    }

    /// Opens or closes a container.
    pub fn set_open(&mut self, path: &str, open: bool) {
        if let Some(entry) = self.entries.get_mut(path) {
            entry.open = open;
        }
    }

    /// Makes enumerating a container fail with a resolution error.
    pub fn set_unresolvable(&mut self, path: &str, unresolvable: bool) {
        if let Some(entry) = self.entries.get_mut(path) {
            entry.unresolvable = unresolvable;
        }
    }

    /// Returns the handle for a path, if present.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<ResourceHandle> {
        let path = ResourcePath::new(path);
        if path.is_root() {
            return Some(self.root());
        }
        self.entries
            .get(&path)
            .map(|entry| ResourceHandle::new(path, entry.kind))
    }

    /// Returns the number of resources (excluding the root).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the workspace holds nothing but its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Workspace for MemoryWorkspace {
    fn members(&self, container: &ResourceHandle) -> Result<Vec<ResourceHandle>, EngineError> {
        if !container.path.is_root() {
            let entry = self.entries.get(&container.path).ok_or_else(|| {
                EngineError::resolution(container.path.clone(), "resource does not exist")
            })?;
            if entry.unresolvable {
                return Err(EngineError::resolution(
                    container.path.clone(),
                    "resource cannot be resolved",
                ));
            }
            if entry.kind == ResourceKind::File || !entry.open {
                return Ok(Vec::new());
            }
        }

        let mut members: Vec<ResourceHandle> = self
            .entries
            .iter()
            .filter(|(path, _)| path.parent().as_ref() == Some(&container.path))
            .map(|(path, entry)| ResourceHandle::new(path.clone(), entry.kind))
            .collect();
        members.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_file_creates_ancestors() {
        let workspace = MemoryWorkspace::with_files(&["p/src/a.txt"]);
        assert_eq!(workspace.len(), 3);
        assert_eq!(
            workspace.get("p/src").map(|h| h.kind),
            Some(ResourceKind::Container)
        );
        assert!(workspace.get("p/src/a.txt").is_some_and(|h| h.is_file()));
    }

    #[test]
    fn test_members_are_direct_and_sorted() {
        let workspace = MemoryWorkspace::with_files(&["p/b.txt", "p/a.txt", "p/sub/c.txt"]);
        let members = workspace.members(&ResourceHandle::container("p")).unwrap();
        let paths: Vec<_> = members.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, vec!["p/a.txt", "p/b.txt", "p/sub"]);
    }

    #[test]
    fn test_descendants_are_pre_order() {
        let workspace = MemoryWorkspace::with_files(&["p/sub/c.txt", "p/a.txt"]);
        let all = workspace.descendants(&workspace.root()).unwrap();
        let paths: Vec<_> = all.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, vec!["p", "p/a.txt", "p/sub", "p/sub/c.txt"]);
    }

    #[test]
    fn test_closed_container_has_no_members() {
        let mut workspace = MemoryWorkspace::with_files(&["p/a.txt"]);
        workspace.set_open("p", false);
        assert!(workspace.members(&ResourceHandle::container("p")).unwrap().is_empty());
        assert_eq!(workspace.descendants(&workspace.root()).unwrap().len(), 1);
    }

    #[test]
    fn test_unresolvable_container_fails() {
        let mut workspace = MemoryWorkspace::with_files(&["p/a.txt"]);
        workspace.set_unresolvable("p", true);
        let err = workspace.descendants(&workspace.root()).unwrap_err();
        assert!(matches!(err, EngineError::Resolution { .. }));
    }

    #[test]
    fn test_missing_container_fails() {
        let workspace = MemoryWorkspace::new();
        assert!(workspace.members(&ResourceHandle::container("nope")).is_err());
    }

    #[test]
    fn test_remove_takes_descendants() {
        let mut workspace = MemoryWorkspace::with_files(&["p/src/a.txt", "p/src/b.txt", "q/c.txt"]);
        assert_eq!(workspace.remove("p/src"), 3);
        assert!(workspace.get("p").is_some());
        assert!(workspace.get("p/src/a.txt").is_none());
    }
}
