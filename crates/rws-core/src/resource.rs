//! The flat resource model.
//!
//! Every filesystem entry the engine sees is reduced to a [`ResourceHandle`]:
//! a workspace-relative [`ResourcePath`] plus a [`ResourceKind`]. Resource
//! identity is the path alone, so two handles for the same path collapse in
//! any set.
//!
//! Paths are normalized at construction: `/` separators, no leading or
//! trailing slash, no empty or `.` segments. The workspace root is the empty
//! path.
//!
//! # Examples
//!
//! ```
//! use rws_core::ResourcePath;
//!
//! let path = ResourcePath::new("/src//tmp/./b.txt");
//! assert_eq!(path.as_str(), "src/tmp/b.txt");
//! assert_eq!(path.name(), Some("b.txt"));
//! assert!(path.is_descendant_of(&ResourcePath::new("src")));
//! ```

use std::borrow::Borrow;
use std::fmt;

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// A normalized, workspace-relative resource path.
///
/// The string form is what include/exclude patterns are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourcePath(String);

impl ResourcePath {
    /// Creates a normalized path from `/`-separated text.
    #[must_use]
    pub fn new(path: &str) -> Self {
        let normalized = path
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect::<Vec<_>>()
            .join("/");
        Self(normalized)
    }

    /// Returns the workspace root path (the empty path).
    #[inline]
    #[must_use]
    pub const fn root() -> Self {
        Self(String::new())
    }

    /// Converts a filesystem path relative to the workspace root.
    ///
    /// Only normal components are kept; `.`, prefixes and root markers are
    /// dropped so the result never depends on the host separator.
    #[must_use]
    pub fn from_relative(path: &Utf8Path) -> Self {
        let normalized = path
            .components()
            .filter_map(|component| match component {
                Utf8Component::Normal(segment) => Some(segment),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");
        Self(normalized)
    }

    /// Returns the path as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this is the workspace root.
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the last segment, or `None` for the root.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit('/').next()
    }

    /// Returns the parent path, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(match self.0.rfind('/') {
            Some(index) => Self(self.0[..index].to_owned()),
            None => Self::root(),
        })
    }

    /// Appends a relative path below this one.
    #[must_use]
    pub fn join(&self, child: &str) -> Self {
        if self.is_root() {
            Self::new(child)
        } else {
            Self::new(&format!("{}/{child}", self.0))
        }
    }

    /// Returns `true` if `self` lies strictly below `ancestor`.
    ///
    /// The test is segment-aware: `src/tmp` is not below `src/t`.
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        if ancestor.is_root() {
            return !self.is_root();
        }
        self.0
            .strip_prefix(ancestor.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Returns the number of segments (zero for the root).
    #[must_use]
    pub fn depth(&self) -> usize {
        if self.is_root() { 0 } else { self.0.split('/').count() }
    }

    /// Resolves this path below a filesystem root.
    #[must_use]
    pub fn to_fs_path(&self, root: &Utf8Path) -> Utf8PathBuf {
        let mut path = root.to_owned();
        if !self.is_root() {
            path.extend(self.0.split('/'));
        }
        path
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourcePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ResourcePath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourcePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Whether a resource is a leaf or a branch.
///
/// Only files are ever classified; containers are traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A leaf entry that participates in matching.
    File,
    /// A branch entry (workspace root, project or folder).
    Container,
}

/// A resolved filesystem entry: its path and its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle {
    /// Workspace-relative path; the identity of the resource.
    pub path: ResourcePath,
    /// Leaf or branch.
    pub kind: ResourceKind,
}

impl ResourceHandle {
    /// Creates a handle.
    #[inline]
    #[must_use]
    pub const fn new(path: ResourcePath, kind: ResourceKind) -> Self {
        Self { path, kind }
    }

    /// Creates a file handle from path text.
    #[must_use]
    pub fn file(path: &str) -> Self {
        Self::new(ResourcePath::new(path), ResourceKind::File)
    }

    /// Creates a container handle from path text.
    #[must_use]
    pub fn container(path: &str) -> Self {
        Self::new(ResourcePath::new(path), ResourceKind::Container)
    }

    /// Returns `true` for file-kind handles.
    #[inline]
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == ResourceKind::File
    }

    /// Returns the last path segment.
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.path.name()
    }
}
