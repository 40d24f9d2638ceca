//! Tree-shaped change deltas.
//!
//! A host delivers filesystem changes as a tree rooted at the workspace root:
//! every changed resource is a node, and the folders between the root and a
//! changed resource appear as flag-less [`DeltaKind::Changed`] nodes so the
//! visitor can descend to them. [`ResourceDelta::accept`] walks the tree in
//! pre-order and lets the visitor prune a subtree.
//!
//! # Event Flow
//!
//! ```text
//! flat (handle, kind, flags) leaves
//!        │
//!        ▼
//!   DeltaTreeBuilder  ── fills in ancestor containers
//!        │
//!        ▼
//!   ChangeBatch { root: ResourceDelta }
//!        │
//!        ▼
//!   ResourceDelta::accept(visitor)  ── pre-order, `false` prunes
//! ```

use std::ops::BitOr;
use std::time::Instant;

use rws_core::{FxHashMap, ResourceHandle, ResourceKind, ResourcePath, fx_hash_map};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// What happened to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaKind {
    /// The resource appeared.
    Added,
    /// The resource disappeared.
    Removed,
    /// The resource still exists; see [`ChangeFlags`] for what changed.
    Changed,
}

/// Details of a [`DeltaKind::Changed`] delta.
///
/// # Examples
///
/// ```
/// use rws_engine::ChangeFlags;
///
/// let flags = ChangeFlags::OPEN | ChangeFlags::DESCRIPTION;
/// assert!(flags.contains(ChangeFlags::OPEN));
/// assert!(!flags.contains(ChangeFlags::CONTENT));
/// assert!(ChangeFlags::NONE.is_empty());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeFlags(u8);

impl ChangeFlags {
    /// Nothing changed on this node itself.
    pub const NONE: Self = Self(0);
    /// The file content changed.
    pub const CONTENT: Self = Self(1);
    /// A container was opened or closed.
    pub const OPEN: Self = Self(1 << 1);
    /// A project description changed.
    pub const DESCRIPTION: Self = Self(1 << 2);
    /// An [`DeltaKind::Added`] resource took the place of one removed in the
    /// same batch.
    pub const REPLACED: Self = Self(1 << 3);

    /// Returns `true` if every flag in `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the flags set in either operand.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `true` if no flag is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ChangeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// One node of a change tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDelta {
    /// The resource this node describes.
    pub resource: ResourceHandle,
    /// What happened to it.
    pub kind: DeltaKind,
    /// Details for [`DeltaKind::Changed`].
    pub flags: ChangeFlags,
    /// Child deltas, sorted by path.
    pub children: Vec<ResourceDelta>,
}

impl ResourceDelta {
    /// Creates a delta without children.
    #[must_use]
    pub const fn new(resource: ResourceHandle, kind: DeltaKind, flags: ChangeFlags) -> Self {
        Self {
            resource,
            kind,
            flags,
            children: Vec::new(),
        }
    }

    /// Creates an [`DeltaKind::Added`] delta.
    #[must_use]
    pub const fn added(resource: ResourceHandle) -> Self {
        Self::new(resource, DeltaKind::Added, ChangeFlags::NONE)
    }

    /// Creates a [`DeltaKind::Removed`] delta.
    #[must_use]
    pub const fn removed(resource: ResourceHandle) -> Self {
        Self::new(resource, DeltaKind::Removed, ChangeFlags::NONE)
    }

    /// Creates a [`DeltaKind::Changed`] delta.
    #[must_use]
    pub const fn changed(resource: ResourceHandle, flags: ChangeFlags) -> Self {
        Self::new(resource, DeltaKind::Changed, flags)
    }

    /// Replaces the children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }

    /// Visits this node and its descendants in pre-order.
    ///
    /// Children of a node are skipped when the visitor returns `Ok(false)`
    /// for it. The first error stops the traversal and is returned.
    pub fn accept<V: DeltaVisitor + ?Sized>(&self, visitor: &mut V) -> Result<(), EngineError> {
        if visitor.visit(self)? {
            for child in &self.children {
                child.accept(visitor)?;
            }
        }
        Ok(())
    }

    /// Returns the number of nodes in this tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Self::node_count).sum::<usize>()
    }

    fn collect_stats(&self, stats: &mut BatchStats) {
        match self.kind {
            DeltaKind::Added => stats.added += 1,
            DeltaKind::Removed => stats.removed += 1,
            DeltaKind::Changed if !self.flags.is_empty() => stats.changed += 1,
            DeltaKind::Changed => {}
        }
        for child in &self.children {
            child.collect_stats(stats);
        }
    }

    fn sort_children(&mut self) {
        self.children
            .sort_by(|a, b| a.resource.path.cmp(&b.resource.path));
        for child in &mut self.children {
            child.sort_children();
        }
    }
}

/// Callback driven by [`ResourceDelta::accept`].
pub trait DeltaVisitor {
    /// Visits one node. Return `Ok(true)` to descend into its children.
    fn visit(&mut self, delta: &ResourceDelta) -> Result<bool, EngineError>;
}

/// Builds a delta tree from flat leaves.
///
/// Missing ancestors, including the workspace root, are filled in as
/// `Changed` container nodes with no flags. Pushing a path twice keeps the
/// last push.
///
/// # Examples
///
/// ```
/// use rws_engine::{ChangeFlags, DeltaKind, DeltaTreeBuilder};
/// use rws_core::ResourceHandle;
///
/// let mut builder = DeltaTreeBuilder::new();
/// builder.push(ResourceHandle::file("p/src/a.txt"), DeltaKind::Added, ChangeFlags::NONE);
/// let root = builder.build().unwrap();
/// assert!(root.resource.path.is_root());
/// assert_eq!(root.node_count(), 4);
/// ```
#[derive(Debug, Default)]
pub struct DeltaTreeBuilder {
    nodes: FxHashMap<ResourcePath, ResourceDelta>,
}

impl DeltaTreeBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: fx_hash_map(),
        }
    }

    /// Records a change for one resource.
    ///
    /// A later push for the same path replaces the earlier one, except that a
    /// removal followed by an addition becomes one `Added` node flagged
    /// [`ChangeFlags::REPLACED`], and two `Changed` pushes keep both flag sets.
    pub fn push(&mut self, resource: ResourceHandle, kind: DeltaKind, flags: ChangeFlags) {
        let mut ancestor = resource.path.parent();
        while let Some(path) = ancestor {
            ancestor = path.parent();
            self.nodes.entry(path.clone()).or_insert_with(|| {
                ResourceDelta::changed(
                    ResourceHandle::new(path, ResourceKind::Container),
                    ChangeFlags::NONE,
                )
            });
        }
        let path = resource.path.clone();
        let flags = match self.nodes.get(&path) {
            Some(previous) => match (previous.kind, kind) {
                (DeltaKind::Removed, DeltaKind::Added) => flags | ChangeFlags::REPLACED,
                (DeltaKind::Changed, DeltaKind::Changed) => flags | previous.flags,
                _ => flags,
            },
            None => flags,
        };
        self.nodes
            .insert(path, ResourceDelta::new(resource, kind, flags));
    }

    /// Returns `true` if nothing has been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Assembles the tree. Returns `None` if nothing was pushed.
    #[must_use]
    pub fn build(self) -> Option<ResourceDelta> {
        let mut nodes = self.nodes;
        let mut paths: Vec<ResourcePath> = nodes.keys().cloned().collect();
        // Deepest first, so every node is complete before it moves into its parent
        paths.sort_by_key(|path| std::cmp::Reverse(path.depth()));

        for path in paths {
            let Some(parent) = path.parent() else {
                continue;
            };
            if let Some(node) = nodes.remove(&path) {
                if let Some(parent_node) = nodes.get_mut(&parent) {
                    parent_node.children.push(node);
                }
            }
        }

        let mut root = nodes.remove(&ResourcePath::root())?;
        root.sort_children();
        Some(root)
    }
}

/// Counts of the changes in one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    /// Resources that appeared.
    pub added: usize,
    /// Resources that disappeared.
    pub removed: usize,
    /// Resources changed with at least one flag.
    pub changed: usize,
}

impl BatchStats {
    /// Returns the total number of changes.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.added + self.removed + self.changed
    }
}

/// One coherent set of changes delivered together.
#[derive(Debug, Clone)]
pub struct ChangeBatch {
    /// The change tree, or `None` for an empty batch.
    pub root: Option<ResourceDelta>,
    /// When the batch was assembled.
    pub received_at: Instant,
}

impl ChangeBatch {
    /// Wraps a change tree.
    #[must_use]
    pub fn new(root: Option<ResourceDelta>) -> Self {
        Self {
            root,
            received_at: Instant::now(),
        }
    }

    /// Builds a batch from a builder.
    #[must_use]
    pub fn from_builder(builder: DeltaTreeBuilder) -> Self {
        Self::new(builder.build())
    }

    /// Returns `true` if the batch carries no changes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Counts the changes in the batch.
    #[must_use]
    pub fn stats(&self) -> BatchStats {
        let mut stats = BatchStats::default();
        if let Some(root) = &self.root {
            root.collect_stats(&mut stats);
        }
        stats
    }
}
