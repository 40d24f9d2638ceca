//! Known-path snapshot that turns raw notifications into change trees.
//!
//! The debouncer only says "something happened at this path". Whether that
//! was an addition, a removal or a content change is decided here by
//! comparing the filesystem against the paths seen so far:
//!
//! | On disk | Known | Delta |
//! |---------|-------|-------|
//! | yes | no | `Added` (plus new ancestors and, for a folder, its contents) |
//! | no | yes | `Removed` (plus every known descendant) |
//! | yes, file | yes | `Changed(CONTENT)` |
//! | yes, folder | yes | nothing |

use camino::{Utf8Path, Utf8PathBuf};
use rws_core::{FxHashMap, ResourceHandle, ResourceKind, ResourcePath, fx_hash_map};
use rws_engine::{ChangeFlags, DeltaKind, DeltaTreeBuilder, EngineError, FsWorkspace, Workspace};

use crate::filter::EventFilter;

/// Every path the watcher has seen, with its kind.
#[derive(Debug)]
pub struct PathSnapshot {
    root: Utf8PathBuf,
    workspace: FsWorkspace,
    known: FxHashMap<ResourcePath, ResourceKind>,
}

impl PathSnapshot {
    /// Seeds a snapshot with every accepted path under `root`.
    pub fn scan<F: EventFilter + ?Sized>(root: &Utf8Path, filter: &F) -> Result<Self, EngineError> {
        let workspace = FsWorkspace::new(root)?;
        let mut known = fx_hash_map();
        for handle in workspace.descendants(&workspace.root())? {
            if filter.should_process(&handle.path) {
                known.insert(handle.path, handle.kind);
            }
        }
        tracing::debug!(root = %root, paths = known.len(), "Seeded path snapshot");
        Ok(Self {
            root: root.to_owned(),
            workspace,
            known,
        })
    }

    /// Returns the number of known paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Returns `true` if no path is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Returns `true` if `path` is known.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.known.contains_key(path)
    }

    /// Maps an absolute path reported by the debouncer to a resource path.
    ///
    /// Returns `None` for the root itself and for paths outside it.
    #[must_use]
    pub fn relative(&self, path: &Utf8Path) -> Option<ResourcePath> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let resource = ResourcePath::from_relative(relative);
        (!resource.is_root()).then_some(resource)
    }

    /// Reconciles the snapshot with the filesystem for the given paths.
    ///
    /// Every delta is pushed into `builder`; the snapshot is updated to match.
    pub fn reconcile<F: EventFilter + ?Sized>(
        &mut self,
        paths: &[ResourcePath],
        filter: &F,
        builder: &mut DeltaTreeBuilder,
    ) {
        for path in paths {
            if !filter.should_process(path) {
                tracing::trace!(path = %path, "Filtered out file event");
                continue;
            }
            match self.kind_on_disk(path) {
                Some(kind) => self.reconcile_present(path, kind, filter, builder),
                None => self.reconcile_absent(path, builder),
            }
        }
    }

    fn kind_on_disk(&self, path: &ResourcePath) -> Option<ResourceKind> {
        let metadata = std::fs::symlink_metadata(path.to_fs_path(&self.root)).ok()?;
        Some(if metadata.is_dir() {
            ResourceKind::Container
        } else {
            ResourceKind::File
        })
    }

    fn reconcile_present<F: EventFilter + ?Sized>(
        &mut self,
        path: &ResourcePath,
        kind: ResourceKind,
        filter: &F,
        builder: &mut DeltaTreeBuilder,
    ) {
        match self.known.get(path) {
            Some(&known) if known == kind => {
                if kind == ResourceKind::File {
                    builder.push(
                        ResourceHandle::new(path.clone(), kind),
                        DeltaKind::Changed,
                        ChangeFlags::CONTENT,
                    );
                }
            }
            Some(_) => {
                // Replaced by a resource of the other kind
                self.reconcile_absent(path, builder);
                self.add(path, kind, filter, builder);
            }
            None => self.add(path, kind, filter, builder),
        }
    }

    fn add<F: EventFilter + ?Sized>(
        &mut self,
        path: &ResourcePath,
        kind: ResourceKind,
        filter: &F,
        builder: &mut DeltaTreeBuilder,
    ) {
        let mut ancestor = path.parent();
        while let Some(parent) = ancestor {
            if parent.is_root() || self.known.contains_key(&parent) {
                break;
            }
            ancestor = parent.parent();
            self.known.insert(parent.clone(), ResourceKind::Container);
            builder.push(
                ResourceHandle::new(parent, ResourceKind::Container),
                DeltaKind::Added,
                ChangeFlags::NONE,
            );
        }

        let handle = ResourceHandle::new(path.clone(), kind);
        self.known.insert(path.clone(), kind);
        if kind == ResourceKind::Container {
            match self.workspace.descendants(&handle) {
                Ok(contents) => {
                    for member in contents {
                        if filter.should_process(&member.path)
                            && !self.known.contains_key(&member.path)
                        {
                            self.known.insert(member.path.clone(), member.kind);
                            builder.push(member, DeltaKind::Added, ChangeFlags::NONE);
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "Failed to list new folder");
                }
            }
        }
        builder.push(handle, DeltaKind::Added, ChangeFlags::NONE);
    }

    fn reconcile_absent(&mut self, path: &ResourcePath, builder: &mut DeltaTreeBuilder) {
        let Some(kind) = self.known.remove(path) else {
            return;
        };
        if kind == ResourceKind::Container {
            let descendants: Vec<(ResourcePath, ResourceKind)> = self
                .known
                .iter()
                .filter(|(known, _)| known.is_descendant_of(path))
                .map(|(known, kind)| (known.clone(), *kind))
                .collect();
            for (known, kind) in descendants {
                self.known.remove(&known);
                builder.push(
                    ResourceHandle::new(known, kind),
                    DeltaKind::Removed,
                    ChangeFlags::NONE,
                );
            }
        }
        builder.push(
            ResourceHandle::new(path.clone(), kind),
            DeltaKind::Removed,
            ChangeFlags::NONE,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AcceptAllFilter, SkipDirsFilter};
    use rws_engine::{
        ChangeBatch, DeltaVisitor, ResourceDelta, SharedWorkingSet, WorkingSet, WorkingSetUpdater,
        collect_matches,
    };
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Collect(Vec<(String, DeltaKind, ChangeFlags)>);

    impl DeltaVisitor for Collect {
        fn visit(&mut self, delta: &ResourceDelta) -> Result<bool, EngineError> {
            if delta.kind != DeltaKind::Changed || !delta.flags.is_empty() {
                self.0
                    .push((delta.resource.path.as_str().to_owned(), delta.kind, delta.flags));
            }
            Ok(true)
        }
    }

    fn setup(files: &[&str]) -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8Path::from_path(temp_dir.path())
            .expect("Invalid path")
            .to_owned();
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "x").unwrap();
        }
        (temp_dir, root)
    }

    fn reconcile(snapshot: &mut PathSnapshot, paths: &[&str]) -> Vec<(String, DeltaKind, ChangeFlags)> {
        let paths: Vec<_> = paths.iter().map(|p| ResourcePath::new(p)).collect();
        let mut builder = DeltaTreeBuilder::new();
        snapshot.reconcile(&paths, &AcceptAllFilter, &mut builder);
        let batch = ChangeBatch::from_builder(builder);
        let mut collect = Collect(Vec::new());
        if let Some(root) = &batch.root {
            root.accept(&mut collect).unwrap();
        }
        collect.0
    }

    #[test]
    fn test_scan_respects_filter() {
        let (_dir, root) = setup(&["p/a.txt", "p/.git/HEAD"]);
        let snapshot = PathSnapshot::scan(&root, &SkipDirsFilter::new(&[".git"])).unwrap();
        assert!(snapshot.contains("p/a.txt"));
        assert!(!snapshot.contains("p/.git"));
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_new_file_is_added() {
        let (_dir, root) = setup(&["p/a.txt"]);
        let mut snapshot = PathSnapshot::scan(&root, &AcceptAllFilter).unwrap();
        fs::write(root.join("p/b.txt"), "x").unwrap();
        let deltas = reconcile(&mut snapshot, &["p/b.txt"]);
        assert_eq!(deltas, vec![("p/b.txt".to_owned(), DeltaKind::Added, ChangeFlags::NONE)]);
        assert!(snapshot.contains("p/b.txt"));
    }

    #[test]
    fn test_known_file_is_changed() {
        let (_dir, root) = setup(&["p/a.txt"]);
        let mut snapshot = PathSnapshot::scan(&root, &AcceptAllFilter).unwrap();
        let deltas = reconcile(&mut snapshot, &["p/a.txt", "p"]);
        assert_eq!(
            deltas,
            vec![("p/a.txt".to_owned(), DeltaKind::Changed, ChangeFlags::CONTENT)]
        );
    }

    #[test]
    fn test_new_folder_adds_contents() {
        let (_dir, root) = setup(&["p/a.txt"]);
        let mut snapshot = PathSnapshot::scan(&root, &AcceptAllFilter).unwrap();
        fs::create_dir_all(root.join("q/sub")).unwrap();
        fs::write(root.join("q/sub/c.txt"), "x").unwrap();

        let deltas = reconcile(&mut snapshot, &["q/sub/c.txt"]);
        let added: Vec<_> = deltas.iter().map(|(p, _, _)| p.as_str()).collect();
        assert_eq!(added, vec!["q", "q/sub", "q/sub/c.txt"]);
        assert!(deltas.iter().all(|(_, kind, _)| *kind == DeltaKind::Added));
    }

    #[test]
    fn test_removed_folder_removes_known_descendants() {
        let (_dir, root) = setup(&["p/a.txt", "p/sub/b.txt", "q/c.txt"]);
        let mut snapshot = PathSnapshot::scan(&root, &AcceptAllFilter).unwrap();
        fs::remove_dir_all(root.join("p")).unwrap();

        let deltas = reconcile(&mut snapshot, &["p"]);
        let removed: Vec<_> = deltas.iter().map(|(p, _, _)| p.as_str()).collect();
        assert_eq!(removed, vec!["p", "p/a.txt", "p/sub", "p/sub/b.txt"]);
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_file_replaced_by_folder() {
        let (_dir, root) = setup(&["p/x"]);
        let mut snapshot = PathSnapshot::scan(&root, &AcceptAllFilter).unwrap();
        fs::remove_file(root.join("p/x")).unwrap();
        fs::create_dir_all(root.join("p/x")).unwrap();
        fs::write(root.join("p/x/keep.bin"), "x").unwrap();

        let deltas = reconcile(&mut snapshot, &["p/x"]);
        assert_eq!(
            deltas,
            vec![
                ("p/x".to_owned(), DeltaKind::Added, ChangeFlags::REPLACED),
                ("p/x/keep.bin".to_owned(), DeltaKind::Added, ChangeFlags::NONE),
            ]
        );
    }

    #[test]
    fn test_replaced_file_member_matches_rescan() {
        let (_dir, root) = setup(&["p/x"]);
        let mut snapshot = PathSnapshot::scan(&root, &AcceptAllFilter).unwrap();
        let updater = WorkingSetUpdater::new(FsWorkspace::new(&root).unwrap());
        let working_set = SharedWorkingSet::new("p/x");
        let name = updater.add(Arc::new(working_set.clone()));
        updater.commit(&name).unwrap();
        assert_eq!(working_set.elements(), vec![ResourcePath::new("p/x")]);

        fs::remove_file(root.join("p/x")).unwrap();
        fs::create_dir_all(root.join("p/x")).unwrap();
        fs::write(root.join("p/x/keep.bin"), "x").unwrap();
        let mut builder = DeltaTreeBuilder::new();
        snapshot.reconcile(&[ResourcePath::new("p/x")], &AcceptAllFilter, &mut builder);
        updater.process(&ChangeBatch::from_builder(builder));

        let rescan = collect_matches(updater.workspace(), "p/x").unwrap();
        assert_eq!(working_set.elements(), rescan);
        assert_eq!(rescan, vec![ResourcePath::new("p/x/keep.bin")]);
    }

    #[test]
    fn test_unknown_missing_path_is_ignored() {
        let (_dir, root) = setup(&["p/a.txt"]);
        let mut snapshot = PathSnapshot::scan(&root, &AcceptAllFilter).unwrap();
        assert!(reconcile(&mut snapshot, &["ghost.txt"]).is_empty());
    }

    #[test]
    fn test_relative_mapping() {
        let (_dir, root) = setup(&[]);
        let snapshot = PathSnapshot::scan(&root, &AcceptAllFilter).unwrap();
        assert_eq!(
            snapshot.relative(&root.join("p/a.txt")),
            Some(ResourcePath::new("p/a.txt"))
        );
        assert_eq!(snapshot.relative(&root), None);
        assert_eq!(snapshot.relative(Utf8Path::new("/elsewhere/x")), None);
    }
}
