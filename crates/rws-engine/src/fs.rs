//! A [`Workspace`] backed by a real directory tree.
//!
//! This module provides [`FsWorkspace`], which uses the `ignore` crate to
//! walk directories. Unlike a source scanner, a working set must see every
//! file the user could pick, so hidden files are included and ignore files
//! are not honoured; only the configured skip directories are pruned.
//!
//! # Examples
//!
//! ```no_run
//! use rws_engine::{FsWorkspace, Workspace};
//! use camino::Utf8Path;
//!
//! let workspace = FsWorkspace::new(Utf8Path::new("/path/to/workspace"))?
//!     .with_skip_dirs(&["target"]);
//! for resource in workspace.descendants(&workspace.root())? {
//!     println!("{}", resource.path);
//! }
//! # Ok::<(), rws_engine::EngineError>(())
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use ignore::{DirEntry, WalkBuilder};
use rws_core::{ConfigError, ResourceHandle, ResourceKind, ResourcePath, WorkspaceConfig};

use crate::error::EngineError;
use crate::workspace::Workspace;

/// A workspace rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct FsWorkspace {
    /// The workspace root directory.
    root: Utf8PathBuf,
    /// Directory names that are never traversed.
    skip_dirs: Vec<String>,
    /// Whether to follow symbolic links.
    follow_links: bool,
}

impl FsWorkspace {
    /// Creates a workspace for the given root directory.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the root doesn't exist or isn't a
    /// directory.
    pub fn new(root: &Utf8Path) -> Result<Self, EngineError> {
        if !root.is_dir() {
            return Err(ConfigError::MissingDirectory(root.to_owned()).into());
        }
        Ok(Self {
            root: root.to_owned(),
            skip_dirs: Vec::new(),
            follow_links: false,
        })
    }

    /// Creates a workspace from its configuration section.
    pub fn from_config(config: &WorkspaceConfig) -> Result<Self, EngineError> {
        let skip_dirs: Vec<&str> = config.skip_dirs.iter().map(String::as_str).collect();
        Ok(Self::new(&config.root)?
            .with_skip_dirs(&skip_dirs)
            .with_follow_links(config.follow_links))
    }

    /// Adds directory names to skip during traversal.
    #[must_use]
    pub fn with_skip_dirs(mut self, dirs: &[&str]) -> Self {
        self.skip_dirs.extend(dirs.iter().map(ToString::to_string));
        self
    }

    /// Configures whether to follow symbolic links.
    #[must_use]
    pub const fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Returns the root directory.
    #[inline]
    #[must_use]
    pub fn root_dir(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns `true` if a directory with this name is never traversed.
    #[must_use]
    pub fn is_skipped(&self, name: &str) -> bool {
        self.skip_dirs.iter().any(|dir| dir == name)
    }

    /// Maps a filesystem path below the root to its resource path.
    pub fn resource_path(&self, path: &std::path::Path) -> Result<ResourcePath, EngineError> {
        let relative = path
            .strip_prefix(self.root.as_std_path())
            .map_err(|_| EngineError::NonUtf8Path(path.to_owned()))?;
        let relative = Utf8Path::from_path(relative)
            .ok_or_else(|| EngineError::NonUtf8Path(path.to_owned()))?;
        Ok(ResourcePath::from_relative(relative))
    }

    /// Builds the walker for one subtree.
    fn build_walker(&self, start: &Utf8Path, max_depth: Option<usize>) -> ignore::Walk {
        let skip_dirs = self.skip_dirs.clone();
        WalkBuilder::new(start)
            // Working sets see everything: no hidden-file or ignore-file filtering
            .standard_filters(false)
            .follow_links(self.follow_links)
            .max_depth(max_depth)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                !(is_dir
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| skip_dirs.iter().any(|dir| dir == name)))
            })
            .build()
    }

    /// Collects the handles below `container`, up to `max_depth` levels.
    fn collect(
        &self,
        container: &ResourceHandle,
        max_depth: Option<usize>,
    ) -> Result<Vec<ResourceHandle>, EngineError> {
        let start = container.path.to_fs_path(&self.root);
        let metadata = match std::fs::metadata(&start) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(EngineError::resolution(
                    container.path.clone(),
                    format!("{start} does not exist"),
                ));
            }
            Err(err) => return Err(EngineError::io(start, err)),
        };
        if !metadata.is_dir() {
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for result in self.build_walker(&start, max_depth) {
            let entry = result?;
            if entry.depth() == 0 {
                continue;
            }
            match self.handle_for(&entry) {
                Ok(handle) => found.push(handle),
                Err(err) if err.is_recoverable() => {
                    tracing::warn!(error = %err, "Skipping workspace entry");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(found)
    }

    fn handle_for(&self, entry: &DirEntry) -> Result<ResourceHandle, EngineError> {
        let path = self.resource_path(entry.path())?;
        let kind = if entry.file_type().is_some_and(|ft| ft.is_dir()) {
            ResourceKind::Container
        } else {
            ResourceKind::File
        };
        Ok(ResourceHandle::new(path, kind))
    }
}

impl Workspace for FsWorkspace {
    fn members(&self, container: &ResourceHandle) -> Result<Vec<ResourceHandle>, EngineError> {
        self.collect(container, Some(1))
    }

    fn descendants(&self, container: &ResourceHandle) -> Result<Vec<ResourceHandle>, EngineError> {
        self.collect(container, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_workspace(files: &[&str]) -> (TempDir, FsWorkspace) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8Path::from_path(temp_dir.path()).expect("Invalid path");
        for file in files {
            let path = root.join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("Failed to create directory");
            }
            fs::write(&path, "x").expect("Failed to write file");
        }
        let workspace = FsWorkspace::new(root).expect("Workspace should open");
        (temp_dir, workspace)
    }

    #[test]
    fn test_missing_root() {
        let result = FsWorkspace::new(Utf8Path::new("/nonexistent/path/that/does/not/exist"));
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_descendants_pre_order_with_hidden_files() {
        let (_dir, workspace) = create_workspace(&["p/.project", "p/src/a.txt", "p/b.txt"]);
        let all = workspace.descendants(&workspace.root()).unwrap();
        let paths: Vec<_> = all.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, vec!["p", "p/.project", "p/b.txt", "p/src", "p/src/a.txt"]);
        assert!(!all[0].is_file());
        assert!(all[1].is_file());
    }

    #[test]
    fn test_members_are_one_level() {
        let (_dir, workspace) = create_workspace(&["p/src/a.txt", "p/b.txt"]);
        let members = workspace.members(&ResourceHandle::container("p")).unwrap();
        let paths: Vec<_> = members.iter().map(|h| h.path.as_str()).collect();
        assert_eq!(paths, vec!["p/b.txt", "p/src"]);
    }

    #[test]
    fn test_skip_dirs_are_pruned() {
        let (_dir, workspace) = create_workspace(&["p/.git/HEAD", "p/a.txt"]);
        let workspace = workspace.with_skip_dirs(&[".git"]);
        let all = workspace.descendants(&workspace.root()).unwrap();
        assert!(all.iter().all(|h| !h.path.as_str().contains(".git")));
        assert!(workspace.is_skipped(".git"));
    }

    #[test]
    fn test_missing_container_is_resolution_error() {
        let (_dir, workspace) = create_workspace(&["p/a.txt"]);
        let err = workspace
            .members(&ResourceHandle::container("gone"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Resolution { .. }));
    }

    #[test]
    fn test_path_through_file_is_io_error() {
        let (_dir, workspace) = create_workspace(&["p/a.txt"]);
        let err = workspace
            .descendants(&ResourceHandle::container("p/a.txt/sub"))
            .unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_file_has_no_members() {
        let (_dir, workspace) = create_workspace(&["p/a.txt"]);
        assert!(workspace.members(&ResourceHandle::file("p/a.txt")).unwrap().is_empty());
    }
}
